//! Configuration module for the balance engine.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for all engine components.
//!
//! # Usage
//!
//! ```rust,ignore
//! use balance_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod alerts;
mod backend;
mod observability;
mod reconciliation;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alerts::AlertsConfig;
pub use backend::BackendConfig;
pub use observability::ObservabilityConfig;
pub use reconciliation::ReconciliationConfig;
pub use server::ServerConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Hosted database backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Reconciliation sweep configuration.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Alerting and health configuration.
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    let interpolated = interpolate_env_vars(&contents);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    // Match ${VAR} or ${VAR:-default} patterns
    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.http_port == config.observability.metrics_port {
        return Err(ConfigError::ValidationError(
            "server.http_port and observability.metrics_port must be different".to_string(),
        ));
    }

    if config.server.rate_limit_window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "server.rate_limit_window_secs must be positive".to_string(),
        ));
    }

    if config.reconciliation.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "reconciliation.concurrency must be at least 1".to_string(),
        ));
    }

    if config.reconciliation.min_discrepancy.is_sign_negative() {
        return Err(ConfigError::ValidationError(
            "reconciliation.min_discrepancy must not be negative".to_string(),
        ));
    }

    if config.reconciliation.auto_correct_threshold.is_sign_negative() {
        return Err(ConfigError::ValidationError(
            "reconciliation.auto_correct_threshold must not be negative".to_string(),
        ));
    }

    if config.alerts.degraded_success_rate < 0.0 || config.alerts.degraded_success_rate > 1.0 {
        return Err(ConfigError::ValidationError(
            "alerts.degraded_success_rate must be between 0.0 and 1.0".to_string(),
        ));
    }

    if config.backend.cache_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "backend.cache_capacity must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = load_config_from_string("{}").unwrap();
        assert_eq!(config.server.http_port, 8090);
        assert_eq!(config.reconciliation.limit, 1000);
        assert_eq!(config.reconciliation.min_discrepancy, dec!(0.01));
        assert_eq!(config.alerts.window_hours, 24);
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r"
server:
  http_port: 9000
reconciliation:
  limit: 250
  concurrency: 4
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.reconciliation.limit, 250);
        assert_eq!(config.reconciliation.concurrency, 4);
        // Untouched sections keep defaults
        assert_eq!(config.backend.timeout_secs, 10);
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let yaml = r"
backend:
  base_url: ${BALANCE_TEST_MISSING_URL:-http://fallback:54321}
";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.backend.base_url, "http://fallback:54321");
    }

    #[test]
    fn test_env_interpolation_unset_without_default_is_empty() {
        let interpolated = interpolate_env_vars("key: ${BALANCE_TEST_UNSET_VAR}");
        assert_eq!(interpolated, "key: ");
    }

    #[test]
    fn test_port_collision_rejected() {
        let yaml = r"
server:
  http_port: 9090
observability:
  metrics_port: 9090
";
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let yaml = r"
reconciliation:
  concurrency: 0
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_negative_min_discrepancy_rejected() {
        let yaml = r"
reconciliation:
  min_discrepancy: -0.01
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_run_options_from_config() {
        let config = Config::default();
        let options = config.reconciliation.to_run_options();
        assert_eq!(options.limit, 1000);
        assert_eq!(options.concurrency, 8);
    }
}
