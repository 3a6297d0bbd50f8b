//! Shared types for the vigil alerting pipeline: metric samples as returned
//! by the metric source, alert records handed to sinks, and the severity
//! scale used by threshold rules.

pub mod types;
