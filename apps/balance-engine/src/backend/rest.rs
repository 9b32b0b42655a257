//! REST adapter for the hosted database API.
//!
//! Speaks the PostgREST-style surface of the hosted platform: RPC functions
//! under `/rest/v1/rpc/*`, table reads/updates under `/rest/v1/<table>`.
//! Transient failures (network, 5xx) are retried with exponential backoff
//! and jitter; 4xx responses are surfaced as [`BackendError::Rejected`].

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::{BackendError, BackendPort, BalanceCheck};
use crate::models::{PaymentStats, ValidationLogEntry};

/// Maximum jitter added to each retry backoff, in milliseconds.
const RETRY_JITTER_MS: u64 = 100;

/// Configuration for the REST backend adapter.
#[derive(Debug, Clone)]
pub struct RestBackendConfig {
    /// Base URL of the hosted database API (no trailing slash).
    pub base_url: String,
    /// Service-role key, sent as both `apikey` and bearer token.
    pub service_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the initial attempt for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,
}

impl Default for RestBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            service_key: String::new(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// REST adapter over the hosted database API.
#[derive(Debug)]
pub struct RestBackend {
    client: Client,
    config: RestBackendConfig,
}

impl RestBackend {
    /// Create a new REST backend adapter.
    ///
    /// # Errors
    ///
    /// Returns an error when the service key is empty or the HTTP client
    /// cannot be constructed.
    pub fn new(config: RestBackendConfig) -> Result<Self, BackendError> {
        if config.service_key.is_empty() {
            return Err(BackendError::Rejected {
                code: "config".to_string(),
                message: "service key must not be empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transient(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.config.base_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.service_key),
            )
    }

    /// Send a request, retrying transient failures with backoff + jitter.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, BackendError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let last_err = match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    if status.is_server_error() {
                        BackendError::Transient(format!("backend returned {status}"))
                    } else {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(BackendError::Rejected {
                            code: status.as_u16().to_string(),
                            message: body,
                        });
                    }
                }
                Err(e) => BackendError::Transient(e.to_string()),
            };

            if attempt >= self.config.max_retries {
                return Err(last_err);
            }

            let backoff = self.config.retry_base_delay * 2_u32.pow(attempt);
            let jitter = Duration::from_millis(rand::rng().random_range(0..RETRY_JITTER_MS));
            warn!(
                attempt = attempt + 1,
                backoff_ms = (backoff + jitter).as_millis() as u64,
                error = %last_err,
                "Retrying backend request"
            );
            tokio::time::sleep(backoff + jitter).await;
            attempt += 1;
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        resp.json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

#[async_trait]
impl BackendPort for RestBackend {
    async fn validate_balance(&self, booking_id: &str) -> Result<BalanceCheck, BackendError> {
        let url = self.rest_url("rpc/validate_booking_balance");
        let body = json!({ "p_booking_id": booking_id });

        let resp = self
            .send_with_retry(|| self.authed(self.client.post(&url)).json(&body))
            .await?;

        let rows: Vec<BalanceCheck> = Self::decode(resp).await?;
        rows.into_iter().next().ok_or(BackendError::NotFound)
    }

    async fn list_booking_ids(&self, limit: usize) -> Result<Vec<String>, BackendError> {
        let url = self.rest_url("bookings");
        let limit_param = limit.to_string();

        let resp = self
            .send_with_retry(|| {
                self.authed(self.client.get(&url)).query(&[
                    ("select", "id"),
                    ("limit", limit_param.as_str()),
                ])
            })
            .await?;

        let rows: Vec<IdRow> = Self::decode(resp).await?;
        debug!(count = rows.len(), "Listed booking IDs");
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn fetch_validation_log(
        &self,
        limit: usize,
        min_discrepancy: Decimal,
    ) -> Result<Vec<ValidationLogEntry>, BackendError> {
        let url = self.rest_url("balance_validation_log");
        let limit_param = limit.to_string();
        // Signed filter on the persisted discrepancy column, matching the
        // underlying query: negative discrepancies below the threshold are
        // excluded even when their absolute value qualifies.
        let discrepancy_param = format!("gte.{min_discrepancy}");

        let resp = self
            .send_with_retry(|| {
                self.authed(self.client.get(&url)).query(&[
                    ("select", "*"),
                    ("discrepancy", discrepancy_param.as_str()),
                    ("order", "created_at.desc"),
                    ("limit", limit_param.as_str()),
                ])
            })
            .await?;

        Self::decode(resp).await
    }

    async fn correct_balance(
        &self,
        booking_id: &str,
        expected_stored: Decimal,
        new_balance: Decimal,
    ) -> Result<bool, BackendError> {
        let url = self.rest_url("bookings");
        let id_param = format!("eq.{booking_id}");
        let balance_param = format!("eq.{expected_stored}");
        let body = json!({ "balance_amount": new_balance });

        let resp = self
            .send_with_retry(|| {
                self.authed(self.client.patch(&url))
                    .query(&[
                        ("id", id_param.as_str()),
                        ("balance_amount", balance_param.as_str()),
                    ])
                    .header("Prefer", "return=representation")
                    .json(&body)
            })
            .await?;

        // An empty representation means no row matched the CAS filter:
        // a concurrent writer changed the balance since we read it.
        let rows: Vec<serde_json::Value> = Self::decode(resp).await?;
        Ok(!rows.is_empty())
    }

    async fn payment_stats(&self, window_hours: u32) -> Result<PaymentStats, BackendError> {
        let url = self.rest_url("rpc/payment_window_stats");
        let body = json!({ "p_window_hours": window_hours });

        let resp = self
            .send_with_retry(|| self.authed(self.client.post(&url)).json(&body))
            .await?;

        let rows: Vec<PaymentStats> = Self::decode(resp).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let url = self.rest_url("bookings");

        self.send_with_retry(|| {
            self.authed(self.client.get(&url))
                .query(&[("select", "id"), ("limit", "1")])
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_fails_empty_service_key() {
        let config = RestBackendConfig::default();
        let result = RestBackend::new(config);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = RestBackendConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_base_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_rest_url_shape() {
        let backend = RestBackend::new(RestBackendConfig {
            service_key: "key".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            backend.rest_url("rpc/validate_booking_balance"),
            "http://localhost:54321/rest/v1/rpc/validate_booking_balance"
        );
    }
}
