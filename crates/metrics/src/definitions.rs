//! Metric name and label definitions.
//!
//! This module defines all metric names and common label keys used throughout toolgate.
//! Centralizing these definitions ensures consistency and makes it easier to document
//! what metrics are available.

/// Invocation policy metrics
pub mod policy {
    /// Total number of batch evaluations, labelled by outcome
    pub const EVALUATIONS_TOTAL: &str = "toolgate_policy_evaluations_total";
    /// Total number of blocked batches, labelled by block kind
    pub const BLOCKS_TOTAL: &str = "toolgate_policy_blocks_total";
}

/// Tool gateway metrics
pub mod gateway {
    /// Total number of executed tool calls, labelled by transport and outcome
    pub const TOOL_CALLS_TOTAL: &str = "toolgate_tool_calls_total";
    /// Tool call duration in seconds, including connect and close
    pub const TOOL_CALL_DURATION_SECONDS: &str = "toolgate_tool_call_duration_seconds";
    /// Response templates that failed to render and fell back to raw content
    pub const TEMPLATE_FALLBACKS_TOTAL: &str = "toolgate_template_fallbacks_total";
}

/// Common label keys
pub mod labels {
    pub const OUTCOME: &str = "outcome";
    pub const KIND: &str = "kind";
    pub const TRANSPORT: &str = "transport";
}
