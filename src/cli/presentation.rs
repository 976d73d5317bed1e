//! CLI presentation: text rendering of trees and reconciliation plans.

use crate::sanitize::ReconciliationPlan;
use serde_json::Value;

/// Pretty JSON for a subtree; strings print bare.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// One line per plan entry: `- path` for removals, `+ path = value` for additions.
pub fn format_plan(plan: &ReconciliationPlan) -> String {
    if plan.is_empty() {
        return "Settings match the defaults".to_string();
    }
    let removals = plan.removals.iter().map(|path| format!("- {}", path));
    let additions = plan
        .additions
        .iter()
        .map(|(path, value)| format!("+ {} = {}", path, value));
    removals.chain(additions).collect::<Vec<_>>().join("\n")
}
