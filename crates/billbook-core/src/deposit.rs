//! # Deposits
//!
//! Splits an accepted quote's total into an up-front deposit and the
//! remaining balance. Works on an already-computed total; it never looks at
//! line items.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, RoundingMode};
use crate::BPS_PER_WHOLE;

/// How much of a quote is due up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepositSpec {
    /// Share of the total in basis points (5000 = 50%), clamped to 0..=100%.
    Percent { bps: u32 },
    /// Fixed amount in cents; negative amounts count as zero.
    Fixed { cents: i64 },
}

impl DepositSpec {
    /// Whole-percent deposit (`DepositSpec::percent(30)` = 30% up front).
    pub const fn percent(pct: u32) -> Self {
        DepositSpec::Percent {
            bps: pct.saturating_mul(100),
        }
    }

    /// Fixed deposit in cents.
    pub const fn fixed(cents: i64) -> Self {
        DepositSpec::Fixed { cents }
    }
}

/// Deposit and balance for a quote, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DepositSplit {
    pub deposit_cents: i64,
    /// `max(0, total − deposit)`.
    pub balance_cents: i64,
}

/// Computes the deposit and balance with half-up rounding.
///
/// ## Example
/// ```rust
/// use billbook_core::deposit::{apply_deposit, DepositSpec};
///
/// let split = apply_deposit(9900, DepositSpec::percent(25));
/// assert_eq!(split.deposit_cents, 2475);
/// assert_eq!(split.balance_cents, 7425);
///
/// // A fixed deposit larger than the total leaves nothing owing
/// let split = apply_deposit(5000, DepositSpec::fixed(8000));
/// assert_eq!(split.balance_cents, 0);
/// ```
pub fn apply_deposit(total_cents: i64, spec: DepositSpec) -> DepositSplit {
    apply_deposit_with(total_cents, spec, RoundingMode::HalfUp)
}

/// Computes the deposit and balance with an explicit rounding mode.
pub fn apply_deposit_with(total_cents: i64, spec: DepositSpec, mode: RoundingMode) -> DepositSplit {
    let total = Money::from_cents(total_cents);

    let deposit = match spec {
        DepositSpec::Percent { bps } => total.percentage(bps.min(BPS_PER_WHOLE), mode),
        DepositSpec::Fixed { cents } => Money::from_cents(cents).non_negative(),
    };

    DepositSplit {
        deposit_cents: deposit.cents(),
        balance_cents: (total - deposit).non_negative().cents(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_deposit() {
        let split = apply_deposit(10000, DepositSpec::percent(50));
        assert_eq!(split.deposit_cents, 5000);
        assert_eq!(split.balance_cents, 5000);
    }

    #[test]
    fn test_percent_deposit_rounds_once() {
        // 33.33% of $0.99 = 32.9967¢
        let split = apply_deposit(99, DepositSpec::Percent { bps: 3333 });
        assert_eq!(split.deposit_cents, 33);
        assert_eq!(split.balance_cents, 66);

        // 50% of 5¢ = 2.5¢
        assert_eq!(apply_deposit(5, DepositSpec::percent(50)).deposit_cents, 3);
        let split = apply_deposit_with(5, DepositSpec::percent(50), RoundingMode::HalfEven);
        assert_eq!(split.deposit_cents, 2);
        assert_eq!(split.balance_cents, 3);
    }

    #[test]
    fn test_percent_over_100_is_clamped() {
        let split = apply_deposit(4200, DepositSpec::percent(150));
        assert_eq!(split.deposit_cents, 4200);
        assert_eq!(split.balance_cents, 0);
    }

    #[test]
    fn test_fixed_deposit() {
        let split = apply_deposit(10000, DepositSpec::fixed(2500));
        assert_eq!(split.deposit_cents, 2500);
        assert_eq!(split.balance_cents, 7500);

        let split = apply_deposit(10000, DepositSpec::fixed(-100));
        assert_eq!(split.deposit_cents, 0);
        assert_eq!(split.balance_cents, 10000);
    }

    #[test]
    fn test_fixed_deposit_above_total_zeroes_balance() {
        let split = apply_deposit(3000, DepositSpec::fixed(5000));
        assert_eq!(split.deposit_cents, 5000);
        assert_eq!(split.balance_cents, 0);
    }

    #[test]
    fn test_deposit_spec_serde() {
        let spec: DepositSpec = serde_json::from_str(r#"{"kind":"percent","bps":3000}"#).unwrap();
        assert_eq!(spec, DepositSpec::percent(30));

        let json = serde_json::to_string(&DepositSpec::fixed(500)).unwrap();
        assert_eq!(json, r#"{"kind":"fixed","cents":500}"#);
    }
}
