//! Metrics names for toolgate, recorded through the `metrics` crate facade.
//!
//! Installing a recorder (Prometheus exporter or otherwise) is up to the
//! embedding application; without one every macro is a no-op.
//!
//! ```rust,ignore
//! use toolgate_metrics::{counter, gateway};
//!
//! counter!(gateway::TOOL_CALLS_TOTAL, "transport" => "http", "outcome" => "ok").increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, histogram};
