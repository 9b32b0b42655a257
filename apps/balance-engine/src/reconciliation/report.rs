//! Run summaries returned by validation and reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BalanceValidation;

/// Summary of a targeted batch validation (no corrections applied).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRunSummary {
    /// Bookings for which a balance check completed.
    pub total_validated: usize,
    /// Checks where the stored balance was within tolerance.
    pub valid: usize,
    /// Checks where it was not.
    pub invalid: usize,
    /// Bookings skipped because no row exists.
    pub skipped: usize,
    /// Bookings whose check failed (backend error).
    pub failed: usize,
    /// Results at or above the requested minimum discrepancy.
    pub discrepancies: usize,
    /// Sum of absolute discrepancies across flagged results.
    pub total_discrepancy: Decimal,
    /// The flagged results themselves.
    pub results: Vec<BalanceValidation>,
}

/// Summary of a full reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    /// Unique ID for this run, present in all related log lines.
    pub run_id: String,
    /// Bookings for which a balance check completed.
    pub total_validated: usize,
    /// Checks where the stored balance was within tolerance.
    pub valid: usize,
    /// Checks where it was not.
    pub invalid: usize,
    /// Bookings skipped because no row exists.
    pub skipped: usize,
    /// Bookings whose check failed (backend error).
    pub failed: usize,
    /// Results at or above the minimum discrepancy.
    pub discrepancies: usize,
    /// Discrepancies corrected in place.
    pub auto_corrected: usize,
    /// Corrections that failed with a backend error.
    pub failed_corrections: usize,
    /// Corrections skipped because a concurrent writer changed the balance.
    pub lost_races: usize,
    /// Booking IDs flagged for manual review.
    pub requires_manual_review: Vec<String>,
    /// Sum of absolute discrepancies across flagged results.
    pub total_discrepancy: Decimal,
    /// The flagged results themselves.
    pub results: Vec<BalanceValidation>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ReconciliationSummary {
    /// Every flagged discrepancy must be accounted for by exactly one of
    /// the disposition counters.
    #[must_use]
    pub fn counters_balance(&self) -> bool {
        self.discrepancies
            == self.auto_corrected
                + self.requires_manual_review.len()
                + self.failed_corrections
                + self.lost_races
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ValidationRunSummary {
            total_validated: 2,
            valid: 1,
            invalid: 1,
            skipped: 0,
            failed: 0,
            discrepancies: 1,
            total_discrepancy: dec!(5.00),
            results: Vec::new(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalValidated"], 2);
        assert_eq!(json["totalDiscrepancy"], "5.00");
    }

    #[test]
    fn test_counters_balance() {
        let summary = ReconciliationSummary {
            run_id: "run".to_string(),
            total_validated: 10,
            valid: 7,
            invalid: 3,
            skipped: 0,
            failed: 0,
            discrepancies: 3,
            auto_corrected: 1,
            failed_corrections: 1,
            lost_races: 0,
            requires_manual_review: vec!["b-1".to_string()],
            total_discrepancy: dec!(42),
            results: Vec::new(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_ms: 5,
        };

        assert!(summary.counters_balance());
    }
}
