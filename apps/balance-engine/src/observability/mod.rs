//! Observability: Prometheus metrics.

pub mod metrics;

pub use metrics::{MetricsConfig, MetricsError, init_metrics};
