//! Prometheus metrics for the archiver.
//!
//! Provides metrics for:
//! - Archive cycles, archived rows and written artifacts
//! - Rows remaining after each cycle
//! - Seeded rows and supervisor restarts

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Initialize the metrics system and start the scrape endpoint.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(MetricsError::Install)?;

    tracing::info!(listen = %config.listen, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!(
            "Metrics are enabled in config but the 'prometheus' feature is not compiled. \
             Rebuild with: cargo build --features prometheus"
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record a finished archive cycle.
pub fn record_cycle(archived: u64, remaining: i64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archive_cycles_total").increment(1);
        counter!("archive_rows_total").increment(archived);
        gauge!("archive_rows_remaining").set(remaining as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (archived, remaining);
    }
}

/// Record a backup artifact written to disk.
pub fn record_artifact_written(records: usize) {
    #[cfg(feature = "prometheus")]
    {
        counter!("archive_artifacts_total").increment(1);
        counter!("archive_artifact_records_total").increment(records as u64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = records;
    }
}

/// Record rows inserted by the seeder.
pub fn record_seeded(count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("seed_rows_total").increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = count;
    }
}

/// Record a supervisor pass that failed and will be restarted.
///
/// `phase` is the phase the failure happened in: `seeding` or `draining`.
pub fn record_restart(phase: &'static str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("supervisor_restarts_total", "phase" => phase).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = phase;
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
