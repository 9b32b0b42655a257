//! Reconciliation sweep configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reconciliation::RunOptions;

/// Configuration for the scheduled reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Maximum number of bookings to sweep per run.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Discrepancies below this absolute amount are ignored.
    #[serde(default = "default_min_discrepancy")]
    pub min_discrepancy: Decimal,
    /// Discrepancies below this absolute amount are corrected in place.
    #[serde(default = "default_auto_correct_threshold")]
    pub auto_correct_threshold: Decimal,
    /// Number of balance checks in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_discrepancy: default_min_discrepancy(),
            auto_correct_threshold: default_auto_correct_threshold(),
            concurrency: default_concurrency(),
        }
    }
}

impl ReconciliationConfig {
    /// Convert to run options for the job.
    #[must_use]
    pub const fn to_run_options(&self) -> RunOptions {
        RunOptions {
            limit: self.limit,
            min_discrepancy: self.min_discrepancy,
            auto_correct_threshold: self.auto_correct_threshold,
            concurrency: self.concurrency,
        }
    }
}

pub(crate) const fn default_limit() -> usize {
    1000
}

pub(crate) fn default_min_discrepancy() -> Decimal {
    Decimal::new(1, 2)
}

pub(crate) fn default_auto_correct_threshold() -> Decimal {
    Decimal::new(1, 2)
}

pub(crate) const fn default_concurrency() -> usize {
    8
}
