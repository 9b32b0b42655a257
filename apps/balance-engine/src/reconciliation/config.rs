//! Reconciliation run options.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Options for a reconciliation sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    /// Maximum number of bookings to sweep in one run.
    pub limit: usize,
    /// Discrepancies below this absolute amount are ignored.
    pub min_discrepancy: Decimal,
    /// Discrepancies below this absolute amount are corrected in place;
    /// everything at or above it goes to manual review.
    pub auto_correct_threshold: Decimal,
    /// Number of balance checks in flight at once.
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            min_discrepancy: Decimal::new(1, 2),
            auto_correct_threshold: Decimal::new(1, 2),
            concurrency: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.limit, 1000);
        assert_eq!(options.min_discrepancy, dec!(0.01));
        assert_eq!(options.auto_correct_threshold, dec!(0.01));
        assert_eq!(options.concurrency, 8);
    }

    #[test]
    fn test_deserialize_partial_body_fills_defaults() {
        let options: RunOptions = serde_json::from_str(r#"{"limit": 25}"#).unwrap();
        assert_eq!(options.limit, 25);
        assert_eq!(options.min_discrepancy, dec!(0.01));
    }
}
