//! Reconciliation Engine
//!
//! Aligns the key structure of a live settings tree with a default tree: keys
//! the defaults do not know are removed, keys the live tree lacks are added with
//! the default value. Values already present on both sides are never changed.
//!
//! Only mappings are recursed into. Sequences are leaves.

use crate::error::{Result, SettingsError};
use crate::tracking::MappingView;
use crate::tree::KeyPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// What to do with a key whose live and default values disagree on being a mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeMismatchPolicy {
    /// Leave the live value untouched.
    #[default]
    Keep,
    /// Overwrite the live value with the default value.
    ReplaceWithDefault,
}

/// Removals and additions needed to reconcile a tree. Computed, applied, dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    pub removals: Vec<KeyPath>,
    pub additions: Vec<(KeyPath, Value)>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removals.len() + self.additions.len()
    }
}

/// Compute the plan for `live` against `default`.
///
/// Non-mapping roots produce an empty plan.
pub fn plan(live: &Value, default: &Value, policy: ShapeMismatchPolicy) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    if let (Value::Object(live), Value::Object(default)) = (live, default) {
        diff(live, default, &KeyPath::root(), policy, &mut plan);
    }
    plan
}

fn diff(
    live: &Map<String, Value>,
    default: &Map<String, Value>,
    prefix: &KeyPath,
    policy: ShapeMismatchPolicy,
    plan: &mut ReconciliationPlan,
) {
    for (key, live_value) in live {
        let path = prefix.child(key.as_str());
        match (live_value, default.get(key)) {
            (_, None) => plan.removals.push(path),
            (Value::Object(live_child), Some(Value::Object(default_child))) => {
                diff(live_child, default_child, &path, policy, plan);
            }
            (live_value, Some(default_value)) => {
                let mismatched = live_value.is_object() != default_value.is_object();
                if mismatched && policy == ShapeMismatchPolicy::ReplaceWithDefault {
                    plan.additions.push((path, default_value.clone()));
                }
            }
        }
    }

    for (key, default_value) in default {
        if !live.contains_key(key) {
            plan.additions
                .push((prefix.child(key.as_str()), default_value.clone()));
        }
    }
}

/// Apply removals first, then additions, without notifying.
///
/// There is no rollback: entries applied before a failure stay applied.
pub fn apply(root: &MappingView, plan: &ReconciliationPlan) -> Result<()> {
    let _quiet = root.suspend_notifications();

    for path in &plan.removals {
        debug!(path = %path, "Removing unknown setting");
        root.remove_path(path).map_err(|e| failed(path, e))?;
    }
    for (path, value) in &plan.additions {
        debug!(path = %path, "Adding missing setting");
        root.set_path(path, value.clone()).map_err(|e| failed(path, e))?;
    }
    Ok(())
}

/// Plan and apply in one step. Returns the applied plan.
pub fn sanitize(
    root: &MappingView,
    default: &Value,
    policy: ShapeMismatchPolicy,
) -> Result<ReconciliationPlan> {
    let live = root.to_plain().map_err(|e| failed(root.path(), e))?;
    let plan = plan(&live, default, policy);
    apply(root, &plan)?;
    info!(
        removed = plan.removals.len(),
        added = plan.additions.len(),
        "Settings sanitized"
    );
    Ok(plan)
}

fn failed(path: &KeyPath, source: SettingsError) -> SettingsError {
    SettingsError::Sanitization {
        path: path.clone(),
        source: Box::new(source),
    }
}
