//! Invocation policy evaluation for agent tool calls.
//!
//! - Argument path resolution into call arguments (`resolver`)
//! - Comparison operators between resolved values and policy values (`operator`)
//! - Batch verdicts combining context trust, bindings and policies (`engine`)

pub mod engine;
pub mod error;
pub mod operator;
pub mod resolver;

pub use {
    engine::{BlockKind, PolicyEngine, PolicyVerdict, ToolDecision, evaluate_tool_call},
    error::{Error, Result},
    operator::matches,
    resolver::resolve_argument,
};
