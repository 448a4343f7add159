//! Observability module providing logging and metrics.
//!
//! This module initializes and configures:
//! - Structured logging to the console, optionally mirrored to a log file
//! - Prometheus metrics for cycles, archived rows and supervisor restarts

pub mod metrics;
mod tracing_init;

pub use tracing_init::*;
