//! Alerting and health-surface configuration.

use serde::{Deserialize, Serialize};

/// Configuration for alert windows and health thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Trailing window, in hours, for alert queries and the health surface.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    /// Payment success rate below which health reports degraded.
    #[serde(default = "default_degraded_success_rate")]
    pub degraded_success_rate: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            degraded_success_rate: default_degraded_success_rate(),
        }
    }
}

pub(crate) const fn default_window_hours() -> u32 {
    24
}

pub(crate) const fn default_degraded_success_rate() -> f64 {
    0.9
}
