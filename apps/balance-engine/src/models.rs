//! Shared value objects for balance validation.
//!
//! All currency amounts use `rust_decimal::Decimal`; the signed
//! `discrepancy` is always `stored_balance - calculated_balance` exactly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};

/// Result of checking one booking's stored balance against the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceValidation {
    /// Booking being checked.
    pub booking_id: String,
    /// Denormalized balance as stored on the booking row.
    pub stored_balance: Decimal,
    /// Balance derived from the payment/refund history.
    pub calculated_balance: Decimal,
    /// Signed difference: `stored_balance - calculated_balance`.
    pub discrepancy: Decimal,
    /// Discrepancy relative to the calculated balance, signed, in percent.
    pub discrepancy_percentage: Decimal,
    /// Whether the database-side comparison considered the balance in tolerance.
    pub is_valid: bool,
}

impl BalanceValidation {
    /// Build a validation result from the raw database-side check.
    ///
    /// The discrepancy and percentage are derived here rather than trusted
    /// from the collaborator, so the `discrepancy == stored - calculated`
    /// identity holds exactly.
    #[must_use]
    pub fn from_amounts(
        booking_id: String,
        stored_balance: Decimal,
        calculated_balance: Decimal,
        is_valid: bool,
    ) -> Self {
        let discrepancy = stored_balance - calculated_balance;
        let discrepancy_percentage = if calculated_balance.is_zero() {
            // A nonzero discrepancy against a zero calculated balance is
            // reported as a full signed 100%.
            if discrepancy.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::ONE_HUNDRED * discrepancy.signum()
            }
        } else {
            (discrepancy / calculated_balance) * Decimal::ONE_HUNDRED
        };

        Self {
            booking_id,
            stored_balance,
            calculated_balance,
            discrepancy,
            discrepancy_percentage,
            is_valid,
        }
    }

    /// Absolute discrepancy amount.
    #[must_use]
    pub fn abs_discrepancy(&self) -> Decimal {
        self.discrepancy.abs()
    }
}

/// A persisted discrepancy record from the `balance_validation_log` table.
///
/// Written by a database trigger on discrepancy detection; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    /// Log row ID.
    pub id: String,
    /// Booking the discrepancy was detected on.
    pub booking_id: String,
    /// Stored balance at detection time.
    pub stored_balance: Decimal,
    /// Calculated balance at detection time.
    pub calculated_balance: Decimal,
    /// Signed discrepancy as persisted.
    pub discrepancy: Decimal,
    /// Signed discrepancy percentage as persisted.
    pub discrepancy_percentage: Decimal,
    /// Whether the trigger auto-corrected the stored balance.
    pub auto_corrected: bool,
    /// Detection timestamp.
    pub created_at: DateTime<Utc>,
}

impl ValidationLogEntry {
    /// Absolute discrepancy amount.
    #[must_use]
    pub fn abs_discrepancy(&self) -> Decimal {
        self.discrepancy.abs()
    }
}

/// Windowed payment counts for the health surface.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaymentStats {
    /// Payments that completed in the window.
    pub completed: u64,
    /// Payments that failed in the window.
    pub failed: u64,
}

impl PaymentStats {
    /// Fraction of payments that completed, in `0.0..=1.0`.
    ///
    /// A window with no payment activity counts as fully healthy.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.failed;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_discrepancy_identity() {
        let v = BalanceValidation::from_amounts(
            "b-1".to_string(),
            dec!(105.00),
            dec!(100.00),
            false,
        );

        assert_eq!(v.discrepancy, v.stored_balance - v.calculated_balance);
        assert_eq!(v.discrepancy, dec!(5.00));
        assert_eq!(v.discrepancy_percentage, dec!(5.00));
        assert_eq!(v.abs_discrepancy(), dec!(5.00));
    }

    #[test]
    fn test_negative_discrepancy_is_signed() {
        let v = BalanceValidation::from_amounts(
            "b-2".to_string(),
            dec!(95.00),
            dec!(100.00),
            false,
        );

        assert_eq!(v.discrepancy, dec!(-5.00));
        assert_eq!(v.discrepancy_percentage, dec!(-5.00));
        assert_eq!(v.abs_discrepancy(), dec!(5.00));
    }

    #[test]
    fn test_zero_calculated_balance() {
        let v = BalanceValidation::from_amounts("b-3".to_string(), dec!(10), dec!(0), false);
        assert_eq!(v.discrepancy_percentage, dec!(100));

        let v = BalanceValidation::from_amounts("b-4".to_string(), dec!(-10), dec!(0), false);
        assert_eq!(v.discrepancy_percentage, dec!(-100));

        let v = BalanceValidation::from_amounts("b-5".to_string(), dec!(0), dec!(0), true);
        assert_eq!(v.discrepancy_percentage, dec!(0));
    }

    #[test]
    fn test_sub_cent_discrepancy_keeps_exact_value() {
        let v = BalanceValidation::from_amounts(
            "b-6".to_string(),
            dec!(100.004),
            dec!(100.00),
            true,
        );
        assert_eq!(v.discrepancy, dec!(0.004));
    }

    #[test]
    fn test_payment_stats_success_rate() {
        let stats = PaymentStats {
            completed: 9,
            failed: 1,
        };
        assert!((stats.success_rate() - 0.9).abs() < f64::EPSILON);

        let empty = PaymentStats::default();
        assert!((empty.success_rate() - 1.0).abs() < f64::EPSILON);
    }
}
