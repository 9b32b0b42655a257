//! Observability configuration.

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Whether to start the Prometheus metrics exporter.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Port for the Prometheus metrics HTTP listener.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
            metrics_port: default_metrics_port(),
        }
    }
}

pub(crate) const fn default_metrics_enabled() -> bool {
    true
}

pub(crate) const fn default_metrics_port() -> u16 {
    9090
}
