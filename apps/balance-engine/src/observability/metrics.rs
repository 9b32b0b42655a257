//! Prometheus metrics for the balance engine.
//!
//! Covers balance validations, reconciliation runs, and the payment health
//! surface.
//!
//! # Example
//!
//! ```ignore
//! use balance_engine::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("Failed to initialize metrics");
//!
//! record_validation_outcome("checked");
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::reconciliation::ReconciliationSummary;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for run durations (in seconds).
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().expect("valid default address"),
            // Duration buckets from 10ms to 5 minutes; a full sweep of 1000
            // bookings sits in the upper half.
            duration_buckets: vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with a custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure the metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install the metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Record the outcome of a single balance validation.
///
/// # Arguments
///
/// * `outcome` - One of "checked", "not_found", "failed"
pub fn record_validation_outcome(outcome: &str) {
    counter!(
        "balance_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a completed reconciliation run.
pub fn record_reconciliation_run(summary: &ReconciliationSummary) {
    counter!("reconciliation_runs_total").increment(1);
    counter!("reconciliation_discrepancies_total").increment(summary.discrepancies as u64);
    counter!("reconciliation_auto_corrected_total").increment(summary.auto_corrected as u64);
    counter!("reconciliation_failed_corrections_total")
        .increment(summary.failed_corrections as u64);
    counter!("reconciliation_lost_races_total").increment(summary.lost_races as u64);
    counter!("reconciliation_manual_review_total")
        .increment(summary.requires_manual_review.len() as u64);

    #[allow(clippy::cast_precision_loss)]
    histogram!("reconciliation_duration_seconds").record(summary.duration_ms as f64 / 1000.0);
}

/// Update the payment health gauge (0=healthy, 1=degraded, 2=unhealthy).
pub fn record_payment_health(state: f64) {
    gauge!("payment_health_state").set(state);
}

/// Payment health state values for the gauge.
pub mod payment_health_state {
    /// Everything within tolerance.
    pub const HEALTHY: f64 = 0.0;
    /// Elevated alerts or low payment success rate.
    pub const DEGRADED: f64 = 1.0;
    /// Critical alert present or backend unreachable.
    pub const UNHEALTHY: f64 = 2.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_config_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn test_record_validation_outcome() {
        // Verifies the function doesn't panic without an installed recorder
        record_validation_outcome("checked");
        record_validation_outcome("not_found");
        record_validation_outcome("failed");
    }

    #[test]
    fn test_record_reconciliation_run() {
        let summary = ReconciliationSummary {
            run_id: "run".to_string(),
            total_validated: 2,
            valid: 1,
            invalid: 1,
            skipped: 0,
            failed: 0,
            discrepancies: 1,
            auto_corrected: 1,
            failed_corrections: 0,
            lost_races: 0,
            requires_manual_review: Vec::new(),
            total_discrepancy: Decimal::ZERO,
            results: Vec::new(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_ms: 12,
        };
        record_reconciliation_run(&summary);
    }

    #[test]
    fn test_record_payment_health() {
        record_payment_health(payment_health_state::HEALTHY);
        record_payment_health(payment_health_state::DEGRADED);
        record_payment_health(payment_health_state::UNHEALTHY);
    }
}
