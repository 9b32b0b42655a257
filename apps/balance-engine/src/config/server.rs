//! Server configuration for the admin and health HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server port for the admin and health endpoints.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Bearer token required on `/api/admin/*` routes.
    #[serde(default)]
    pub admin_token: String,
    /// Requests allowed per client per rate-limit window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    /// Rate-limit window length in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            admin_token: String::new(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

pub(crate) const fn default_http_port() -> u16 {
    8090
}

pub(crate) fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

pub(crate) const fn default_rate_limit_requests() -> u32 {
    30
}

pub(crate) const fn default_rate_limit_window_secs() -> u64 {
    60
}
