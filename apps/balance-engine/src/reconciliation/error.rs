//! Reconciliation error types.

use crate::backend::BackendError;

/// Errors that invalidate an entire reconciliation run.
///
/// Per-booking failures are captured in the run summary instead; only
/// failures that prevent the run from proceeding at all surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    /// The initial booking listing failed, so there is nothing to sweep.
    #[error("failed to list bookings for reconciliation: {0}")]
    ListBookings(#[source] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_failure_display() {
        let err = ReconciliationError::ListBookings(BackendError::Transient(
            "connect timeout".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "failed to list bookings for reconciliation: transient backend failure: connect timeout"
        );
    }
}
