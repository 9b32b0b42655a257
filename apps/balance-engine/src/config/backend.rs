//! Hosted database backend configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the hosted database REST backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted database API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Service-role key. Usually interpolated from the environment.
    #[serde(default)]
    pub service_key: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the initial attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// TTL for the validation log response cache, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Capacity of the validation log response cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            service_key: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

pub(crate) fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

pub(crate) const fn default_timeout_secs() -> u64 {
    10
}

pub(crate) const fn default_max_retries() -> u32 {
    2
}

pub(crate) const fn default_retry_base_delay_ms() -> u64 {
    200
}

pub(crate) const fn default_cache_ttl_secs() -> u64 {
    15
}

pub(crate) const fn default_cache_capacity() -> usize {
    64
}
