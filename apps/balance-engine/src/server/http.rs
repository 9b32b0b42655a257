//! HTTP/JSON API server implementation.
//!
//! Serves the admin balance validation surfaces and the payment health
//! endpoint. Admin routes sit behind bearer authentication and a
//! per-client rate limiter.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::BackendPort;
use crate::backend::cache::{SystemClock, TtlCache};
use crate::config::{AlertsConfig, Config};
use crate::error::EngineError;
use crate::models::ValidationLogEntry;
use crate::observability::metrics::{payment_health_state, record_payment_health};
use crate::reconciliation::{
    AlertMonitor, AlertSeverity, AlertSummary, BalanceAlert, BalanceValidator, ReconciliationJob,
    ReconciliationSummary, RunOptions, ValidationLogReader, ValidationRunSummary,
};
use crate::server::auth::{AdminGate, require_admin};
use crate::server::rate_limit::FixedWindowLimiter;

/// Shared state for the HTTP server.
pub struct AppState<B> {
    backend: Arc<B>,
    validator: Arc<BalanceValidator<B>>,
    log_reader: Arc<ValidationLogReader<B>>,
    monitor: Arc<AlertMonitor<B>>,
    run_options: RunOptions,
    alerts: AlertsConfig,
    admin_gate: Arc<AdminGate>,
}

// Manual impl: `B` itself is behind `Arc` and need not be `Clone`.
impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            validator: Arc::clone(&self.validator),
            log_reader: Arc::clone(&self.log_reader),
            monitor: Arc::clone(&self.monitor),
            run_options: self.run_options,
            alerts: self.alerts.clone(),
            admin_gate: Arc::clone(&self.admin_gate),
        }
    }
}

impl<B: BackendPort> AppState<B> {
    /// Wire up the server state from configuration.
    #[must_use]
    pub fn new(backend: Arc<B>, config: &Config) -> Self {
        let clock = Arc::new(SystemClock);
        let cache = TtlCache::new(
            config.backend.cache_capacity,
            Duration::from_secs(config.backend.cache_ttl_secs),
            clock.clone(),
        );
        let limiter = FixedWindowLimiter::new(
            config.server.rate_limit_requests,
            Duration::from_secs(config.server.rate_limit_window_secs),
            clock,
        );

        Self {
            validator: Arc::new(BalanceValidator::new(
                Arc::clone(&backend),
                config.reconciliation.concurrency,
            )),
            log_reader: Arc::new(ValidationLogReader::new(Arc::clone(&backend), cache)),
            monitor: Arc::new(AlertMonitor::new(Arc::clone(&backend))),
            run_options: config.reconciliation.to_run_options(),
            alerts: config.alerts.clone(),
            admin_gate: Arc::new(AdminGate::new(config.server.admin_token.clone(), limiter)),
            backend,
        }
    }

    /// The admin authentication gate.
    #[must_use]
    pub fn admin_gate(&self) -> &AdminGate {
        &self.admin_gate
    }
}

/// Create the Axum router with all endpoints.
#[must_use]
pub fn create_router<B: BackendPort + 'static>(state: AppState<B>) -> Router {
    let admin = Router::new()
        .route(
            "/api/admin/payments/validate-balances",
            post(validate_balances::<B>).get(list_validation_logs::<B>),
        )
        .route(
            "/api/admin/payments/reconcile",
            post(trigger_reconciliation::<B>),
        )
        .route("/api/admin/payments/alerts", get(list_alerts::<B>))
        .route(
            "/api/admin/payments/alerts/summary",
            get(alert_summary::<B>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin::<B>,
        ));

    Router::new()
        .merge(admin)
        .route("/api/health/payments", get(payment_health::<B>))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Liveness endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Request to validate balances.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateBalancesRequest {
    /// Specific bookings to validate. When absent, a full sweep runs.
    pub booking_ids: Option<Vec<String>>,
    /// Override for the sweep's booking limit.
    pub limit: Option<usize>,
    /// Override for the minimum discrepancy to flag.
    pub min_discrepancy: Option<Decimal>,
}

/// Either kind of summary a validation request can produce.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SummaryBody {
    /// Targeted validation, no corrections applied.
    Validation(ValidationRunSummary),
    /// Full sweep with corrections.
    Reconciliation(Box<ReconciliationSummary>),
}

/// Response from balance validation.
#[derive(Debug, Serialize)]
pub struct ValidateBalancesResponse {
    /// Whether the request completed.
    pub success: bool,
    /// Validation or reconciliation summary.
    pub summary: SummaryBody,
}

/// Validate balances endpoint.
async fn validate_balances<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<ValidateBalancesRequest>,
) -> Result<Json<ValidateBalancesResponse>, ApiError> {
    if let Some(min) = req.min_discrepancy {
        if min.is_sign_negative() {
            return Err(ApiError::from(
                EngineError::invalid_request("minDiscrepancy must not be negative")
                    .with_context("field", "minDiscrepancy")
                    .with_context("value", min.to_string()),
            ));
        }
    }
    if req.limit == Some(0) {
        return Err(ApiError::from(
            EngineError::invalid_request("limit must be at least 1")
                .with_context("field", "limit"),
        ));
    }

    let min_discrepancy = req.min_discrepancy.unwrap_or(state.run_options.min_discrepancy);

    let summary = match req.booking_ids {
        Some(booking_ids) => {
            tracing::info!(count = booking_ids.len(), "Validating requested bookings");
            SummaryBody::Validation(
                state
                    .validator
                    .validate_summary(&booking_ids, min_discrepancy)
                    .await,
            )
        }
        None => {
            let options = RunOptions {
                limit: req.limit.unwrap_or(state.run_options.limit),
                min_discrepancy,
                ..state.run_options
            };
            let job = ReconciliationJob::new(Arc::clone(&state.backend), options);
            SummaryBody::Reconciliation(Box::new(job.run().await.map_err(EngineError::from)?))
        }
    };

    Ok(Json(ValidateBalancesResponse {
        success: true,
        summary,
    }))
}

/// Query parameters for the validation log listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogQuery {
    /// Maximum rows to return.
    pub limit: Option<usize>,
    /// Signed minimum discrepancy filter.
    pub min_discrepancy: Option<Decimal>,
    /// Output format: "json" (default) or "csv".
    pub format: Option<String>,
}

/// Response with validation log entries.
#[derive(Debug, Serialize)]
pub struct ValidationLogsResponse {
    /// Whether the request completed.
    pub success: bool,
    /// Number of entries returned.
    pub count: usize,
    /// The entries, newest first.
    pub logs: Vec<ValidationLogEntry>,
}

/// List validation log entries endpoint.
async fn list_validation_logs<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<LogQuery>,
) -> Result<Response, ApiError> {
    if query.limit == Some(0) {
        return Err(ApiError::from(
            EngineError::invalid_request("limit must be at least 1")
                .with_context("field", "limit"),
        ));
    }

    let format = query.format.as_deref().unwrap_or("json");
    if format != "json" && format != "csv" {
        return Err(ApiError::from(
            EngineError::invalid_request("format must be 'json' or 'csv'")
                .with_context("field", "format")
                .with_context("value", format),
        ));
    }

    let logs = state
        .log_reader
        .validation_logs(query.limit, query.min_discrepancy)
        .await;

    if format == "csv" {
        let body = render_logs_csv(&logs);
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response());
    }

    Ok(Json(ValidationLogsResponse {
        success: true,
        count: logs.len(),
        logs,
    })
    .into_response())
}

fn render_logs_csv(logs: &[ValidationLogEntry]) -> String {
    use std::fmt::Write;

    let mut out = String::from(
        "id,booking_id,stored_balance,calculated_balance,discrepancy,discrepancy_percentage,auto_corrected,created_at\n",
    );
    for entry in logs {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            entry.id,
            entry.booking_id,
            entry.stored_balance,
            entry.calculated_balance,
            entry.discrepancy,
            entry.discrepancy_percentage,
            entry.auto_corrected,
            entry.created_at.to_rfc3339(),
        );
    }
    out
}

/// Response from a triggered reconciliation run.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// Whether the run completed.
    pub success: bool,
    /// The run summary.
    pub summary: ReconciliationSummary,
}

/// Trigger an on-demand reconciliation sweep with configured options.
async fn trigger_reconciliation<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let job = ReconciliationJob::new(Arc::clone(&state.backend), state.run_options);
    let summary = job.run().await.map_err(EngineError::from)?;

    Ok(Json(ReconcileResponse {
        success: true,
        summary,
    }))
}

/// Query parameters for alert listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertsQuery {
    /// Trailing window in hours.
    pub hours: Option<u32>,
    /// Lowest severity tier to include.
    pub min_severity: Option<String>,
}

/// Response with classified alerts.
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    /// Whether the request completed.
    pub success: bool,
    /// Number of alerts returned.
    pub count: usize,
    /// The alerts, severity-descending.
    pub alerts: Vec<BalanceAlert>,
}

/// List balance alerts endpoint.
async fn list_alerts<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let min_severity = match query.min_severity.as_deref() {
        Some(raw) => raw.parse::<AlertSeverity>().map_err(|e| {
            ApiError::from(
                EngineError::invalid_request(e.to_string())
                    .with_context("field", "minSeverity")
                    .with_context("value", raw),
            )
        })?,
        None => AlertSeverity::Low,
    };
    let hours = query.hours.unwrap_or(state.alerts.window_hours);

    let alerts = state.monitor.balance_alerts(hours, min_severity).await;

    Ok(Json(AlertsResponse {
        success: true,
        count: alerts.len(),
        alerts,
    }))
}

/// Response with the alert summary.
#[derive(Debug, Serialize)]
pub struct AlertSummaryResponse {
    /// Whether the request completed.
    pub success: bool,
    /// Windowed aggregate of alerts.
    pub summary: AlertSummary,
}

/// Alert summary endpoint.
async fn alert_summary<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<AlertsQuery>,
) -> Json<AlertSummaryResponse> {
    let hours = query.hours.unwrap_or(state.alerts.window_hours);
    let summary = state.monitor.alert_summary(hours).await;

    Json(AlertSummaryResponse {
        success: true,
        summary,
    })
}

/// Alert counts for the health payload (without the full alert list).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCounts {
    /// Alerts in the window.
    pub total_alerts: usize,
    /// Critical-tier count.
    pub critical: usize,
    /// High-tier count.
    pub high: usize,
    /// Medium-tier count.
    pub medium: usize,
    /// Low-tier count.
    pub low: usize,
    /// Sum of absolute discrepancies.
    pub total_discrepancy: Decimal,
}

/// Payment health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHealthResponse {
    /// One of "healthy", "degraded", "unhealthy".
    pub status: &'static str,
    /// Whether the database collaborator answered the probe.
    pub database_connected: bool,
    /// Trailing window in hours for payments and alerts.
    pub window_hours: u32,
    /// Payments completed in the window.
    pub payments_completed: u64,
    /// Payments failed in the window.
    pub payments_failed: u64,
    /// Completed fraction, absent when stats could not be fetched.
    pub payment_success_rate: Option<f64>,
    /// Alert counts for the window.
    pub alerts: AlertCounts,
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

/// Payment health endpoint.
///
/// `unhealthy` (503) only on connectivity failure or a critical alert;
/// elevated alert levels and low success rates degrade without flipping
/// the endpoint to an outage signal.
async fn payment_health<B: BackendPort + 'static>(
    State(state): State<AppState<B>>,
) -> (StatusCode, Json<PaymentHealthResponse>) {
    let window_hours = state.alerts.window_hours;

    let database_connected = match state.backend.ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "Payment health: database probe failed");
            false
        }
    };

    let (payments_completed, payments_failed, payment_success_rate) =
        match state.backend.payment_stats(window_hours).await {
            Ok(stats) => (stats.completed, stats.failed, Some(stats.success_rate())),
            Err(err) => {
                warn!(error = %err, "Payment health: stats query failed");
                (0, 0, None)
            }
        };

    let summary = state.monitor.alert_summary(window_hours).await;

    let status = if !database_connected || summary.critical > 0 {
        "unhealthy"
    } else if summary.high > 0
        || payment_success_rate.is_none_or(|rate| rate < state.alerts.degraded_success_rate)
    {
        "degraded"
    } else {
        "healthy"
    };

    record_payment_health(match status {
        "healthy" => payment_health_state::HEALTHY,
        "degraded" => payment_health_state::DEGRADED,
        _ => payment_health_state::UNHEALTHY,
    });

    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(PaymentHealthResponse {
            status,
            database_connected,
            window_hours,
            payments_completed,
            payments_failed,
            payment_success_rate,
            alerts: AlertCounts {
                total_alerts: summary.total_alerts,
                critical: summary.critical,
                high: summary.high,
                medium: summary.medium,
                low: summary.low,
                total_discrepancy: summary.total_discrepancy,
            },
            timestamp: Utc::now(),
        }),
    )
}

/// API error type with rich error details.
#[derive(Debug)]
pub struct ApiError(EngineError);

impl ApiError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(EngineError::invalid_request(message))
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.code().http_status();
        (status, Json(self.0.to_http_response())).into_response()
    }
}
