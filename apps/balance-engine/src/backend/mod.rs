//! Hosted database collaborator port.
//!
//! The balance calculation itself lives in a database-side function
//! (`validate_booking_balance`); this module only defines the seam used to
//! reach it, plus the typed error taxonomy that replaces soft-fail
//! `null`/empty results. Adapters: [`RestBackend`] for the hosted REST API,
//! in-memory fakes in tests.

pub mod cache;
mod rest;

pub use rest::{RestBackend, RestBackendConfig};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{PaymentStats, ValidationLogEntry};

/// Raw output of the database-side balance check for one booking.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceCheck {
    /// Booking that was checked.
    pub booking_id: String,
    /// Denormalized balance on the booking row.
    pub stored_balance: Decimal,
    /// Balance derived from payment/refund history.
    pub calculated_balance: Decimal,
    /// Whether the database-side tolerance comparison passed.
    pub is_valid: bool,
}

/// Errors from the database collaborator.
///
/// `NotFound` is a distinct, expected outcome so callers can skip a missing
/// booking without conflating it with a failed query.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The requested row does not exist.
    #[error("row not found")]
    NotFound,

    /// Network failure, timeout, or 5xx from the backend.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// The backend rejected the request (4xx).
    #[error("backend rejected request ({code}): {message}")]
    Rejected {
        /// HTTP status or backend error code.
        code: String,
        /// Backend-provided message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Seam to the hosted database collaborator.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Run the database-side balance check for one booking.
    ///
    /// # Errors
    ///
    /// `NotFound` when the booking does not exist, `Transient` on
    /// network/5xx failures.
    async fn validate_balance(&self, booking_id: &str) -> Result<BalanceCheck, BackendError>;

    /// List up to `limit` booking IDs for a reconciliation sweep.
    ///
    /// # Errors
    ///
    /// Propagates query failures; the reconciliation job treats this as
    /// fatal for the whole run.
    async fn list_booking_ids(&self, limit: usize) -> Result<Vec<String>, BackendError>;

    /// Fetch persisted validation log rows, newest first.
    ///
    /// The `min_discrepancy` filter applies to the signed `discrepancy`
    /// column as persisted, matching the underlying query.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    async fn fetch_validation_log(
        &self,
        limit: usize,
        min_discrepancy: Decimal,
    ) -> Result<Vec<ValidationLogEntry>, BackendError>;

    /// Overwrite a booking's stored balance, but only if it still equals
    /// `expected_stored` (optimistic compare-and-swap).
    ///
    /// Returns `Ok(false)` when no row matched, i.e. a concurrent writer
    /// changed the balance since it was read.
    ///
    /// # Errors
    ///
    /// Propagates update failures.
    async fn correct_balance(
        &self,
        booking_id: &str,
        expected_stored: Decimal,
        new_balance: Decimal,
    ) -> Result<bool, BackendError>;

    /// Payment success/failure counts over the trailing window.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    async fn payment_stats(&self, window_hours: u32) -> Result<PaymentStats, BackendError>;

    /// Cheap connectivity probe.
    ///
    /// # Errors
    ///
    /// Any failure means the backend is unreachable.
    async fn ping(&self) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_transient_classification() {
        assert!(BackendError::Transient("timeout".to_string()).is_transient());
        assert!(!BackendError::NotFound.is_transient());
        assert!(
            !BackendError::Rejected {
                code: "400".to_string(),
                message: "bad filter".to_string(),
            }
            .is_transient()
        );
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Rejected {
            code: "401".to_string(),
            message: "invalid key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "backend rejected request (401): invalid key"
        );
    }
}
