//! Discrepancy severity classification and alert aggregation.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::backend::BackendPort;
use crate::models::ValidationLogEntry;
use crate::reconciliation::validator::logging_floor;

/// Rows fetched per alert query; the time window is applied in memory.
const ALERT_FETCH_LIMIT: usize = 1000;

/// Severity tier of a balance discrepancy.
///
/// Ordered, so `min_severity` filters compare tiers directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Discrepancy at or above 0.01 (amount or percent).
    Low,
    /// Discrepancy at or above 10.00 or 1%.
    Medium,
    /// Discrepancy at or above 50.00 or 5%.
    High,
    /// Discrepancy at or above 100.00 or 10%.
    Critical,
}

impl AlertSeverity {
    /// Classify a discrepancy by absolute amount or absolute percentage,
    /// whichever reaches the higher tier. Returns `None` below the lowest
    /// threshold.
    #[must_use]
    pub fn classify(amount: Decimal, percentage: Decimal) -> Option<Self> {
        let amount = amount.abs();
        let percentage = percentage.abs();

        let tiers = [
            (Self::Critical, Decimal::new(100, 0), Decimal::new(10, 0)),
            (Self::High, Decimal::new(50, 0), Decimal::new(5, 0)),
            (Self::Medium, Decimal::new(10, 0), Decimal::new(1, 0)),
            (Self::Low, Decimal::new(1, 2), Decimal::new(1, 2)),
        ];

        tiers
            .into_iter()
            .find(|(_, amount_at_least, pct_at_least)| {
                amount >= *amount_at_least || percentage >= *pct_at_least
            })
            .map(|(severity, _, _)| severity)
    }

    /// Lowercase name used in API parameters and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing a severity name.
#[derive(Debug, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct ParseSeverityError(String);

impl FromStr for AlertSeverity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

/// A logged discrepancy enriched with its computed severity.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceAlert {
    /// The underlying log entry.
    #[serde(flatten)]
    pub entry: ValidationLogEntry,
    /// Computed severity tier.
    pub severity: AlertSeverity,
}

/// Windowed aggregate of alerts, recomputed on every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSummary {
    /// Number of alerts in the window.
    pub total_alerts: usize,
    /// Critical-tier count.
    pub critical: usize,
    /// High-tier count.
    pub high: usize,
    /// Medium-tier count.
    pub medium: usize,
    /// Low-tier count.
    pub low: usize,
    /// Sum of absolute discrepancies across all alerts.
    pub total_discrepancy: Decimal,
    /// The alerts themselves, severity-descending.
    pub alerts: Vec<BalanceAlert>,
}

/// Classifies logged discrepancies into operator-facing alerts.
pub struct AlertMonitor<B> {
    backend: Arc<B>,
}

impl<B: BackendPort> AlertMonitor<B> {
    /// Create a monitor over the given backend.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Alerts from the trailing `hours` window at or above `min_severity`,
    /// sorted by severity then absolute discrepancy, both descending.
    ///
    /// Fetch failures are logged and surface as an empty list.
    pub async fn balance_alerts(&self, hours: u32, min_severity: AlertSeverity) -> Vec<BalanceAlert> {
        let entries = match self
            .backend
            .fetch_validation_log(ALERT_FETCH_LIMIT, logging_floor())
            .await
        {
            Ok(entries) => entries,
            Err(err) => {
                error!(hours, error = %err, "Failed to fetch validation log for alerts");
                return Vec::new();
            }
        };

        let cutoff = Utc::now() - Duration::hours(i64::from(hours));
        let mut alerts: Vec<BalanceAlert> = entries
            .into_iter()
            .filter(|entry| entry.created_at >= cutoff)
            .filter_map(|entry| {
                AlertSeverity::classify(entry.discrepancy, entry.discrepancy_percentage)
                    .filter(|severity| *severity >= min_severity)
                    .map(|severity| BalanceAlert { entry, severity })
            })
            .collect();

        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.entry.abs_discrepancy().cmp(&a.entry.abs_discrepancy()))
        });
        alerts
    }

    /// Tally the window's alerts per tier.
    pub async fn alert_summary(&self, hours: u32) -> AlertSummary {
        let alerts = self.balance_alerts(hours, AlertSeverity::Low).await;

        let mut summary = AlertSummary {
            total_alerts: alerts.len(),
            critical: 0,
            high: 0,
            medium: 0,
            low: 0,
            total_discrepancy: Decimal::ZERO,
            alerts: Vec::new(),
        };

        for alert in &alerts {
            match alert.severity {
                AlertSeverity::Critical => summary.critical += 1,
                AlertSeverity::High => summary.high += 1,
                AlertSeverity::Medium => summary.medium += 1,
                AlertSeverity::Low => summary.low += 1,
            }
            summary.total_discrepancy += alert.entry.abs_discrepancy();
        }
        summary.alerts = alerts;
        summary
    }

    /// Fast-path health gate: is any critical alert present in the window?
    pub async fn has_critical_alerts(&self, hours: u32) -> bool {
        !self
            .balance_alerts(hours, AlertSeverity::Critical)
            .await
            .is_empty()
    }
}
