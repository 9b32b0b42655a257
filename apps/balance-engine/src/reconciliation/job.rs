//! The reconciliation sweep.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::BackendPort;
use crate::models::BalanceValidation;
use crate::observability::metrics::record_reconciliation_run;
use crate::reconciliation::config::RunOptions;
use crate::reconciliation::error::ReconciliationError;
use crate::reconciliation::report::ReconciliationSummary;
use crate::reconciliation::validator::{BalanceValidator, ValidationOutcome};

/// Sweeps bookings for balance drift and corrects small discrepancies.
///
/// Corrections use an optimistic compare-and-swap on the stored balance,
/// so a run racing a concurrent writer detects the lost update instead of
/// overwriting it; every flagged discrepancy lands in exactly one of the
/// summary's disposition counters.
pub struct ReconciliationJob<B> {
    backend: Arc<B>,
    validator: BalanceValidator<B>,
    options: RunOptions,
}

impl<B: BackendPort> ReconciliationJob<B> {
    /// Create a job with the given run options.
    #[must_use]
    pub fn new(backend: Arc<B>, options: RunOptions) -> Self {
        let validator = BalanceValidator::new(Arc::clone(&backend), options.concurrency);
        Self {
            backend,
            validator,
            options,
        }
    }

    /// Options this job runs with.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run one reconciliation sweep.
    ///
    /// # Errors
    ///
    /// Fails only when the initial booking listing fails; per-booking
    /// validation and correction failures are counted in the summary.
    pub async fn run(&self) -> Result<ReconciliationSummary, ReconciliationError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            run_id = %run_id,
            limit = self.options.limit,
            min_discrepancy = %self.options.min_discrepancy,
            auto_correct_threshold = %self.options.auto_correct_threshold,
            "Starting balance reconciliation"
        );

        let booking_ids = self
            .backend
            .list_booking_ids(self.options.limit)
            .await
            .map_err(|err| {
                error!(
                    run_id = %run_id,
                    error = %err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Reconciliation aborted: could not list bookings"
                );
                ReconciliationError::ListBookings(err)
            })?;

        let outcomes = self.validator.validate_many(&booking_ids).await;

        let mut summary = ReconciliationSummary {
            run_id: run_id.clone(),
            total_validated: 0,
            valid: 0,
            invalid: 0,
            skipped: 0,
            failed: 0,
            discrepancies: 0,
            auto_corrected: 0,
            failed_corrections: 0,
            lost_races: 0,
            requires_manual_review: Vec::new(),
            total_discrepancy: Decimal::ZERO,
            results: Vec::new(),
            started_at,
            completed_at: started_at,
            duration_ms: 0,
        };

        let mut flagged: Vec<BalanceValidation> = Vec::new();
        for (_, outcome) in outcomes {
            match outcome {
                ValidationOutcome::Checked(result) => {
                    summary.total_validated += 1;
                    if result.is_valid {
                        summary.valid += 1;
                    } else {
                        summary.invalid += 1;
                    }
                    if result.abs_discrepancy() >= self.options.min_discrepancy {
                        flagged.push(result);
                    }
                }
                ValidationOutcome::NotFound => summary.skipped += 1,
                ValidationOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.discrepancies = flagged.len();

        for result in &flagged {
            summary.total_discrepancy += result.abs_discrepancy();
            if result.abs_discrepancy() < self.options.auto_correct_threshold {
                self.apply_correction(&run_id, result, &mut summary).await;
            } else {
                warn!(
                    run_id = %run_id,
                    booking_id = %result.booking_id,
                    discrepancy = %result.discrepancy,
                    "Discrepancy exceeds auto-correct threshold, flagging for manual review"
                );
                summary.requires_manual_review.push(result.booking_id.clone());
            }
        }
        summary.results = flagged;

        summary.completed_at = Utc::now();
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            run_id = %run_id,
            total_validated = summary.total_validated,
            valid = summary.valid,
            invalid = summary.invalid,
            skipped = summary.skipped,
            failed = summary.failed,
            discrepancies = summary.discrepancies,
            auto_corrected = summary.auto_corrected,
            failed_corrections = summary.failed_corrections,
            lost_races = summary.lost_races,
            manual_review = summary.requires_manual_review.len(),
            total_discrepancy = %summary.total_discrepancy,
            duration_ms = summary.duration_ms,
            "Balance reconciliation complete"
        );
        record_reconciliation_run(&summary);

        Ok(summary)
    }

    async fn apply_correction(
        &self,
        run_id: &str,
        result: &BalanceValidation,
        summary: &mut ReconciliationSummary,
    ) {
        match self
            .backend
            .correct_balance(
                &result.booking_id,
                result.stored_balance,
                result.calculated_balance,
            )
            .await
        {
            Ok(true) => {
                info!(
                    run_id = %run_id,
                    booking_id = %result.booking_id,
                    old_balance = %result.stored_balance,
                    new_balance = %result.calculated_balance,
                    "Auto-corrected stored balance"
                );
                summary.auto_corrected += 1;
            }
            Ok(false) => {
                warn!(
                    run_id = %run_id,
                    booking_id = %result.booking_id,
                    expected_balance = %result.stored_balance,
                    "Stored balance changed since read, skipping correction"
                );
                summary.lost_races += 1;
            }
            Err(err) => {
                error!(
                    run_id = %run_id,
                    booking_id = %result.booking_id,
                    error = %err,
                    "Balance correction failed"
                );
                summary.failed_corrections += 1;
            }
        }
    }
}
