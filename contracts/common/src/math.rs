//! Mathematical Utilities for the Tally ledger core
//!
//! Checked integer arithmetic with an explicit rounding direction on every
//! division. Amounts are `u64`; every product is formed in `u128`.

use crate::constants::{bps, precision, time};
use crate::errors::{LedgerError, LedgerResult};

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> LedgerResult<u64> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> LedgerResult<u64> {
    a.checked_sub(b).ok_or(LedgerError::Underflow)
}

/// Narrow a `u128` intermediate back to an amount
pub fn to_u64(value: u128) -> LedgerResult<u64> {
    u64::try_from(value).map_err(|_| LedgerError::Overflow)
}

/// `floor(a * b / denominator)`
pub fn mul_div_down(a: u64, b: u64, denominator: u64) -> LedgerResult<u64> {
    if denominator == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    let product = (a as u128) * (b as u128);
    to_u64(product / denominator as u128)
}

/// `ceil(a * b / denominator)`
pub fn mul_div_up(a: u64, b: u64, denominator: u64) -> LedgerResult<u64> {
    if denominator == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    let product = (a as u128) * (b as u128);
    let denominator = denominator as u128;
    let quotient = product / denominator;
    if product % denominator > 0 {
        to_u64(quotient + 1)
    } else {
        to_u64(quotient)
    }
}

/// `ceil(a / b)`
pub fn div_up(a: u64, b: u64) -> LedgerResult<u64> {
    if b == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    if a == 0 {
        return Ok(0);
    }
    Ok((a - 1) / b + 1)
}

/// `floor(amount * ratio_bps / 10_000)`
pub fn apply_bps(amount: u64, ratio_bps: u64) -> LedgerResult<u64> {
    mul_div_down(amount, ratio_bps, bps::DENOMINATOR)
}

/// Risk-weighted collateral value: `floor(collateral * threshold / 10_000)`
///
/// This is both the borrow ceiling and the liquidation boundary.
pub fn collateral_value(collateral: u64, liquidation_threshold_bps: u64) -> LedgerResult<u64> {
    apply_bps(collateral, liquidation_threshold_bps)
}

/// Calculate the health factor (1e18 = parity)
///
/// `floor(collateral_value * 1e18 / debt)`, or `u128::MAX` with no debt.
pub fn calculate_health_factor(
    collateral: u64,
    debt: u64,
    liquidation_threshold_bps: u64,
) -> LedgerResult<u128> {
    if debt == 0 {
        return Ok(precision::HEALTH_FACTOR_INFINITE);
    }

    let value = collateral_value(collateral, liquidation_threshold_bps)?;

    // u64::MAX * 1e18 < u128::MAX, the multiplication cannot overflow
    Ok((value as u128) * precision::WAD / (debt as u128))
}

/// A position is liquidatable iff its debt exceeds its collateral value
pub fn is_liquidatable(collateral: u64, debt: u64, liquidation_threshold_bps: u64) -> LedgerResult<bool> {
    Ok(debt > collateral_value(collateral, liquidation_threshold_bps)?)
}

/// Collateral a liquidator receives for covering `debt_to_cover`
///
/// `floor(debt_to_cover * (10_000 + bonus) / 10_000)`
pub fn calculate_seizure(debt_to_cover: u64, liquidation_bonus_bps: u64) -> LedgerResult<u64> {
    let multiplier = safe_add(bps::DENOMINATOR, liquidation_bonus_bps)?;
    mul_div_down(debt_to_cover, multiplier, bps::DENOMINATOR)
}

/// Simple interest over `elapsed` seconds
///
/// `floor(debt * rate_bps * elapsed / (10_000 * SECONDS_PER_YEAR))`
pub fn linear_interest(debt: u64, rate_bps: u64, elapsed: u64) -> LedgerResult<u64> {
    if debt == 0 || rate_bps == 0 || elapsed == 0 {
        return Ok(0);
    }

    let numerator = (debt as u128)
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(elapsed as u128))
        .ok_or(LedgerError::Overflow)?;
    let denominator = (bps::DENOMINATOR as u128) * (time::SECONDS_PER_YEAR as u128);

    to_u64(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::token::ONE;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_down(10, 20, 5).unwrap(), 40);
        assert_eq!(mul_div_down(3, 1, 2).unwrap(), 1);
        assert_eq!(mul_div_up(3, 1, 2).unwrap(), 2);
        assert_eq!(mul_div_up(4, 1, 2).unwrap(), 2);
        assert_eq!(mul_div_down(0, 100, 7).unwrap(), 0);
        assert_eq!(mul_div_up(0, 100, 7).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_large_intermediate() {
        // Product overflows u64 but the quotient fits
        assert_eq!(mul_div_down(u64::MAX, u64::MAX, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(mul_div_down(u64::MAX, 2, 1), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(mul_div_down(1, 1, 0), Err(LedgerError::DivisionByZero));
        assert_eq!(mul_div_up(1, 1, 0), Err(LedgerError::DivisionByZero));
        assert_eq!(div_up(1, 0), Err(LedgerError::DivisionByZero));
    }

    #[test]
    fn test_div_up() {
        assert_eq!(div_up(0, 10_000).unwrap(), 0);
        assert_eq!(div_up(1, 10_000).unwrap(), 1);
        assert_eq!(div_up(9_999, 10_000).unwrap(), 1);
        assert_eq!(div_up(10_000, 10_000).unwrap(), 1);
        assert_eq!(div_up(10_001, 10_000).unwrap(), 2);
    }

    #[test]
    fn test_health_factor_boundary() {
        // 100 collateral at 80% threshold covers exactly 80 debt
        assert_eq!(calculate_health_factor(100, 80, 8_000).unwrap(), precision::WAD);
        assert!(!is_liquidatable(100, 80, 8_000).unwrap());

        assert!(calculate_health_factor(100, 81, 8_000).unwrap() < precision::WAD);
        assert!(is_liquidatable(100, 81, 8_000).unwrap());
    }

    #[test]
    fn test_health_factor_zero_debt() {
        assert_eq!(calculate_health_factor(100, 0, 8_000).unwrap(), u128::MAX);
        assert_eq!(calculate_health_factor(0, 0, 8_000).unwrap(), u128::MAX);
    }

    #[test]
    fn test_seizure_with_bonus() {
        // 10.0 covered at 5% bonus seizes 10.5
        assert_eq!(calculate_seizure(10 * ONE, 500).unwrap(), 10 * ONE + ONE / 2);
        // Integer units round down
        assert_eq!(calculate_seizure(10, 500).unwrap(), 10);
        assert_eq!(calculate_seizure(10, 0).unwrap(), 10);
    }

    #[test]
    fn test_linear_interest() {
        // 1000.0 at 10% for a full year = 100.0
        let interest = linear_interest(1_000 * ONE, 1_000, time::SECONDS_PER_YEAR).unwrap();
        assert_eq!(interest, 100 * ONE);

        // Half a year
        let interest = linear_interest(1_000 * ONE, 1_000, time::SECONDS_PER_YEAR / 2).unwrap();
        assert_eq!(interest, 50 * ONE);

        // Dust debt over one second rounds to zero
        assert_eq!(linear_interest(1, 500, 1).unwrap(), 0);
        assert_eq!(linear_interest(0, 500, 1_000).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_mul_div_up_brackets_down(a in 0u64..u32::MAX as u64, b in 0u64..u32::MAX as u64, d in 1u64..u32::MAX as u64) {
            let down = mul_div_down(a, b, d).unwrap();
            let up = mul_div_up(a, b, d).unwrap();
            prop_assert!(up >= down);
            prop_assert!(up - down <= 1);
        }

        #[test]
        fn prop_seizure_never_below_cover(cover in 0u64..u64::MAX / 2, bonus in 0u64..5_000u64) {
            prop_assert!(calculate_seizure(cover, bonus).unwrap() >= cover);
        }
    }
}
