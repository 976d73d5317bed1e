//! CLI domain: parse, route and presentation for the `settings-store` binary.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands};
pub use presentation::{format_plan, format_value};
pub use route::RunContext;
