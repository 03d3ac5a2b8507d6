//! Logging setup and span helpers for quartet.
//!
//! - **Logging**: human-readable or JSON output via `tracing-subscriber`
//! - **Spans**: correlated spans for workflow runs and agent phases, each
//!   carrying an OpenTelemetry-style trace id

pub mod logging;
pub mod spans;
