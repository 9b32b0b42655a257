//! Booking balance reconciliation.
//!
//! The balance on a booking row is denormalized from its payment/refund
//! history and can drift. This module detects that drift, classifies it
//! into alert severities, and corrects small discrepancies in place:
//!
//! - [`BalanceValidator`] checks a single booking (or a batch with bounded
//!   concurrency) against the database-side calculation.
//! - [`ValidationLogReader`] reads the persisted discrepancy log.
//! - [`AlertMonitor`] classifies logged discrepancies into severity tiers
//!   and aggregates operator-facing summaries.
//! - [`ReconciliationJob`] sweeps bookings, auto-corrects sub-threshold
//!   discrepancies via compare-and-swap, and flags the rest for review.

pub mod alert;
pub mod config;
pub mod error;
pub mod job;
pub mod log;
pub mod report;
pub mod validator;

pub use alert::{AlertMonitor, AlertSeverity, AlertSummary, BalanceAlert};
pub use config::RunOptions;
pub use error::ReconciliationError;
pub use job::ReconciliationJob;
pub use log::ValidationLogReader;
pub use report::{ReconciliationSummary, ValidationRunSummary};
pub use validator::{BalanceValidator, ValidationOutcome};

#[cfg(test)]
pub(crate) mod testing {
    //! Shared in-memory backend stub for reconciliation unit tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::backend::{BackendError, BackendPort, BalanceCheck};
    use crate::models::{PaymentStats, ValidationLogEntry};

    /// How a stubbed `correct_balance` call should behave for a booking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CorrectionBehavior {
        Updated,
        LostRace,
        Fails,
    }

    #[derive(Default)]
    pub struct StubBackend {
        pub checks: HashMap<String, BalanceCheck>,
        pub failing_bookings: HashSet<String>,
        pub booking_ids: Vec<String>,
        pub fail_list: bool,
        pub log_entries: Vec<ValidationLogEntry>,
        pub fail_log: bool,
        pub log_requests: Mutex<Vec<(usize, Decimal)>>,
        pub correction_behavior: HashMap<String, CorrectionBehavior>,
        pub corrections: Mutex<Vec<(String, Decimal, Decimal)>>,
        pub stats: PaymentStats,
        pub fail_ping: bool,
    }

    impl StubBackend {
        pub fn with_checks(checks: Vec<BalanceCheck>) -> Self {
            Self {
                booking_ids: checks.iter().map(|c| c.booking_id.clone()).collect(),
                checks: checks
                    .into_iter()
                    .map(|c| (c.booking_id.clone(), c))
                    .collect(),
                ..Self::default()
            }
        }

        pub fn recorded_corrections(&self) -> Vec<(String, Decimal, Decimal)> {
            self.corrections.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendPort for StubBackend {
        async fn validate_balance(
            &self,
            booking_id: &str,
        ) -> Result<BalanceCheck, BackendError> {
            if self.failing_bookings.contains(booking_id) {
                return Err(BackendError::Transient("stubbed failure".to_string()));
            }
            self.checks
                .get(booking_id)
                .cloned()
                .ok_or(BackendError::NotFound)
        }

        async fn list_booking_ids(&self, limit: usize) -> Result<Vec<String>, BackendError> {
            if self.fail_list {
                return Err(BackendError::Transient("list failed".to_string()));
            }
            Ok(self.booking_ids.iter().take(limit).cloned().collect())
        }

        async fn fetch_validation_log(
            &self,
            limit: usize,
            min_discrepancy: Decimal,
        ) -> Result<Vec<ValidationLogEntry>, BackendError> {
            self.log_requests
                .lock()
                .unwrap()
                .push((limit, min_discrepancy));
            if self.fail_log {
                return Err(BackendError::Transient("log query failed".to_string()));
            }
            // Signed filter, as the backing query applies it.
            Ok(self
                .log_entries
                .iter()
                .filter(|e| e.discrepancy >= min_discrepancy)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn correct_balance(
            &self,
            booking_id: &str,
            expected_stored: Decimal,
            new_balance: Decimal,
        ) -> Result<bool, BackendError> {
            self.corrections.lock().unwrap().push((
                booking_id.to_string(),
                expected_stored,
                new_balance,
            ));
            match self
                .correction_behavior
                .get(booking_id)
                .copied()
                .unwrap_or(CorrectionBehavior::Updated)
            {
                CorrectionBehavior::Updated => Ok(true),
                CorrectionBehavior::LostRace => Ok(false),
                CorrectionBehavior::Fails => {
                    Err(BackendError::Transient("update failed".to_string()))
                }
            }
        }

        async fn payment_stats(&self, _window_hours: u32) -> Result<PaymentStats, BackendError> {
            Ok(self.stats)
        }

        async fn ping(&self) -> Result<(), BackendError> {
            if self.fail_ping {
                return Err(BackendError::Transient("unreachable".to_string()));
            }
            Ok(())
        }
    }

    /// Build a raw balance check fixture.
    pub fn make_check(booking_id: &str, stored: Decimal, calculated: Decimal) -> BalanceCheck {
        BalanceCheck {
            booking_id: booking_id.to_string(),
            stored_balance: stored,
            calculated_balance: calculated,
            is_valid: stored == calculated,
        }
    }

    /// Build a validation log entry fixture created `age_hours` ago.
    pub fn make_log_entry(
        id: &str,
        discrepancy: Decimal,
        percentage: Decimal,
        age_hours: i64,
    ) -> ValidationLogEntry {
        ValidationLogEntry {
            id: id.to_string(),
            booking_id: format!("booking-{id}"),
            stored_balance: Decimal::new(100, 0) + discrepancy,
            calculated_balance: Decimal::new(100, 0),
            discrepancy,
            discrepancy_percentage: percentage,
            auto_corrected: false,
            created_at: chrono::Utc::now() - chrono::Duration::hours(age_hours),
        }
    }
}
