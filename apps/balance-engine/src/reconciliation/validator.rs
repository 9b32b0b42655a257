//! Single-booking and batch balance validation.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::backend::{BackendError, BackendPort};
use crate::models::BalanceValidation;
use crate::observability::metrics::record_validation_outcome;
use crate::reconciliation::report::ValidationRunSummary;

/// Discrepancies below one cent are rounding noise and are never logged.
pub(crate) fn logging_floor() -> Decimal {
    Decimal::new(1, 2)
}

/// Outcome of validating one booking.
///
/// Distinguishes a completed check from a missing row and from a failed
/// query, so callers decide per case instead of inheriting an ambiguous
/// empty result.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// The check completed; the result may or may not show a discrepancy.
    Checked(BalanceValidation),
    /// The booking does not exist; skip it.
    NotFound,
    /// The check could not be performed.
    Failed(BackendError),
}

/// Validates stored booking balances against the database-side calculation.
///
/// Owns only the policy around the result (logging, thresholds); the
/// balance derivation itself lives in the collaborator.
pub struct BalanceValidator<B> {
    backend: Arc<B>,
    concurrency: usize,
}

impl<B: BackendPort> BalanceValidator<B> {
    /// Create a validator with the given fan-out width for batch calls.
    #[must_use]
    pub fn new(backend: Arc<B>, concurrency: usize) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
        }
    }

    /// Validate a single booking's stored balance.
    pub async fn validate(&self, booking_id: &str) -> ValidationOutcome {
        let outcome = match self.backend.validate_balance(booking_id).await {
            Ok(check) => {
                let result = BalanceValidation::from_amounts(
                    check.booking_id,
                    check.stored_balance,
                    check.calculated_balance,
                    check.is_valid,
                );
                if !result.is_valid && result.abs_discrepancy() >= logging_floor() {
                    warn!(
                        booking_id = %result.booking_id,
                        stored_balance = %result.stored_balance,
                        calculated_balance = %result.calculated_balance,
                        discrepancy = %result.discrepancy,
                        discrepancy_percentage = %result.discrepancy_percentage,
                        "Balance discrepancy detected"
                    );
                }
                ValidationOutcome::Checked(result)
            }
            Err(BackendError::NotFound) => {
                debug!(booking_id, "Booking not found, skipping balance check");
                ValidationOutcome::NotFound
            }
            Err(err) => {
                warn!(booking_id, error = %err, "Balance check failed");
                ValidationOutcome::Failed(err)
            }
        };

        let label = match &outcome {
            ValidationOutcome::Checked(_) => "checked",
            ValidationOutcome::NotFound => "not_found",
            ValidationOutcome::Failed(_) => "failed",
        };
        record_validation_outcome(label);
        outcome
    }

    /// Validate a batch of bookings with bounded concurrency.
    ///
    /// Outcomes are returned in input order, one per requested ID; nothing
    /// is silently dropped.
    pub async fn validate_many(&self, booking_ids: &[String]) -> Vec<(String, ValidationOutcome)> {
        stream::iter(booking_ids.to_vec())
            .map(|id| async move {
                let outcome = self.validate(&id).await;
                (id, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Validate a batch and summarize, flagging results at or above
    /// `min_discrepancy`.
    pub async fn validate_summary(
        &self,
        booking_ids: &[String],
        min_discrepancy: Decimal,
    ) -> ValidationRunSummary {
        let outcomes = self.validate_many(booking_ids).await;

        let mut summary = ValidationRunSummary {
            total_validated: 0,
            valid: 0,
            invalid: 0,
            skipped: 0,
            failed: 0,
            discrepancies: 0,
            total_discrepancy: Decimal::ZERO,
            results: Vec::new(),
        };

        for (_, outcome) in outcomes {
            match outcome {
                ValidationOutcome::Checked(result) => {
                    summary.total_validated += 1;
                    if result.is_valid {
                        summary.valid += 1;
                    } else {
                        summary.invalid += 1;
                    }
                    if result.abs_discrepancy() >= min_discrepancy {
                        summary.total_discrepancy += result.abs_discrepancy();
                        summary.results.push(result);
                    }
                }
                ValidationOutcome::NotFound => summary.skipped += 1,
                ValidationOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.discrepancies = summary.results.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::testing::{StubBackend, make_check};
    use rust_decimal_macros::dec;

    fn make_validator(backend: StubBackend) -> BalanceValidator<StubBackend> {
        BalanceValidator::new(Arc::new(backend), 4)
    }

    #[tokio::test]
    async fn test_validate_checked_result() {
        let backend = StubBackend::with_checks(vec![make_check("b-1", dec!(105.00), dec!(100.00))]);
        let validator = make_validator(backend);

        match validator.validate("b-1").await {
            ValidationOutcome::Checked(result) => {
                assert_eq!(result.discrepancy, dec!(5.00));
                assert!(!result.is_valid);
            }
            other => panic!("expected Checked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_missing_booking_is_not_found() {
        let validator = make_validator(StubBackend::default());
        assert!(matches!(
            validator.validate("missing").await,
            ValidationOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn test_validate_backend_failure_is_typed() {
        let mut backend = StubBackend::default();
        backend.failing_bookings.insert("b-1".to_string());
        let validator = make_validator(backend);

        assert!(matches!(
            validator.validate("b-1").await,
            ValidationOutcome::Failed(BackendError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_many_preserves_input_order_and_arity() {
        let mut backend = StubBackend::with_checks(vec![
            make_check("b-1", dec!(100), dec!(100)),
            make_check("b-3", dec!(90), dec!(100)),
        ]);
        backend.failing_bookings.insert("b-4".to_string());
        let validator = make_validator(backend);

        let ids: Vec<String> = ["b-1", "b-2", "b-3", "b-4"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let outcomes = validator.validate_many(&ids).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].0, "b-1");
        assert!(matches!(outcomes[0].1, ValidationOutcome::Checked(_)));
        assert!(matches!(outcomes[1].1, ValidationOutcome::NotFound));
        assert!(matches!(outcomes[2].1, ValidationOutcome::Checked(_)));
        assert!(matches!(outcomes[3].1, ValidationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_summary_flags_only_above_minimum() {
        let backend = StubBackend::with_checks(vec![
            make_check("b-1", dec!(100.00), dec!(100.00)),
            make_check("b-2", dec!(105.00), dec!(100.00)),
            make_check("b-3", dec!(100.004), dec!(100.00)),
        ]);
        let validator = make_validator(backend);

        let ids: Vec<String> = ["b-1", "b-2", "b-3"].iter().map(ToString::to_string).collect();
        let summary = validator.validate_summary(&ids, dec!(0.01)).await;

        assert_eq!(summary.total_validated, 3);
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.discrepancies, 1);
        assert_eq!(summary.results[0].booking_id, "b-2");
        assert_eq!(summary.total_discrepancy, dec!(5.00));
    }

    #[tokio::test]
    async fn test_summary_counts_skipped_and_failed() {
        let mut backend = StubBackend::with_checks(vec![make_check("b-1", dec!(100), dec!(100))]);
        backend.failing_bookings.insert("b-9".to_string());
        let validator = make_validator(backend);

        let ids: Vec<String> = ["b-1", "missing", "b-9"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let summary = validator.validate_summary(&ids, dec!(0.01)).await;

        assert_eq!(summary.total_validated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_negative_discrepancy_flagged_by_absolute_value() {
        let backend = StubBackend::with_checks(vec![make_check("b-1", dec!(95.00), dec!(100.00))]);
        let validator = make_validator(backend);

        let summary = validator
            .validate_summary(&["b-1".to_string()], dec!(0.01))
            .await;

        assert_eq!(summary.discrepancies, 1);
        assert_eq!(summary.results[0].discrepancy, dec!(-5.00));
        assert_eq!(summary.total_discrepancy, dec!(5.00));
    }
}
