//! Money helpers.
//!
//! Prices are stored and summed as [`rust_decimal::Decimal`] with two
//! fractional digits. The payment gateway wants integer minor units
//! (e.g. paise), so the conversion lives here where it can be tested
//! without any gateway plumbing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert a decimal amount in major units to integer minor units
/// (hundredths), rounding half-up to the nearest minor unit.
///
/// Returns `None` for negative amounts or amounts that overflow `i64`.
///
/// ```
/// use marigold_core::to_minor_units;
/// use rust_decimal::Decimal;
///
/// assert_eq!(to_minor_units(Decimal::new(49999, 2)), Some(49_999)); // 499.99
/// assert_eq!(to_minor_units(Decimal::new(1, 0)), Some(100));
/// assert_eq!(to_minor_units(Decimal::new(-1, 0)), None);
/// ```
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    let minor = amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    minor.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_and_fractional_amounts() {
        assert_eq!(to_minor_units(Decimal::new(0, 0)), Some(0));
        assert_eq!(to_minor_units(Decimal::new(1295, 1)), Some(12_950)); // 129.5
        assert_eq!(to_minor_units(Decimal::new(119900, 2)), Some(119_900)); // 1199.00
    }

    #[test]
    fn sub_minor_precision_rounds() {
        // 10.005 -> 1001 (half-up)
        assert_eq!(to_minor_units(Decimal::new(10_005, 3)), Some(1_001));
        // 10.004 -> 1000
        assert_eq!(to_minor_units(Decimal::new(10_004, 3)), Some(1_000));
    }

    #[test]
    fn negative_amounts_rejected() {
        assert_eq!(to_minor_units(Decimal::new(-500, 2)), None);
    }
}
