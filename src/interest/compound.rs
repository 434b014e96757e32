use crate::errors::{LendingError, Result};
use crate::interest::fixed_point::Fixed64x64;

/// projects a balance forward by compounding `periods` times at
/// `rate / factor` per period
///
/// The growth factor `(factor + rate) / factor` is truncated to 64.64,
/// raised to the period count, multiplied by the balance exactly and the
/// result rounded half up.
pub fn calculate_tracked_balance(
    original_balance: u64,
    periods: u32,
    rate: u32,
    factor: u64,
) -> Result<u64> {
    if periods == 0 || rate == 0 || original_balance == 0 {
        return Ok(original_balance);
    }
    let numerator = factor
        .checked_add(rate as u64)
        .ok_or(LendingError::overflow("growth factor"))?;
    let growth = Fixed64x64::from_fraction(numerator, factor)?;
    let compounded = growth.pow(periods)?;
    compounded.mul_uint(original_balance)?.to_uint_rounded()
}

/// linear interest `base * periods * rate / factor`, rounded half up
pub fn calculate_simple_interest(base: u64, periods: u32, rate: u32, factor: u64) -> Result<u64> {
    if factor == 0 {
        return Err(LendingError::overflow("zero rate factor"));
    }
    let product = (base as u128)
        .checked_mul(periods as u128)
        .and_then(|p| p.checked_mul(rate as u128))
        .ok_or(LendingError::overflow("simple interest"))?;
    let rounded = (product + (factor as u128) / 2) / factor as u128;
    u64::try_from(rounded).map_err(|_| LendingError::overflow("simple interest"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INTEREST_RATE_FACTOR;

    const ONE_PERCENT: u32 = 10_000_000;

    #[test]
    fn test_ten_periods_at_one_percent() {
        // 100_000 * 1.01^10 = 110_462.2125...
        let balance = calculate_tracked_balance(100_000, 10, ONE_PERCENT, INTEREST_RATE_FACTOR);
        assert_eq!(balance.unwrap(), 110_462);

        // 100_000_000_000 * 1.01^10 = 110_462_212_541.12...
        let balance =
            calculate_tracked_balance(100_000_000_000, 10, ONE_PERCENT, INTEREST_RATE_FACTOR);
        assert_eq!(balance.unwrap(), 110_462_212_541);
    }

    #[test]
    fn test_single_period() {
        let balance = calculate_tracked_balance(100_000, 1, ONE_PERCENT, INTEREST_RATE_FACTOR);
        assert_eq!(balance.unwrap(), 101_000);
    }

    #[test]
    fn test_thirty_periods_rounds_half_up() {
        // 1_000_000_000 * 1.001^30 = 1_030_439_087.548...
        let balance = calculate_tracked_balance(1_000_000_000, 30, 1_000_000, INTEREST_RATE_FACTOR);
        assert_eq!(balance.unwrap(), 1_030_439_088);
    }

    #[test]
    fn test_no_growth_cases() {
        assert_eq!(
            calculate_tracked_balance(100_000, 0, ONE_PERCENT, INTEREST_RATE_FACTOR).unwrap(),
            100_000
        );
        assert_eq!(
            calculate_tracked_balance(100_000, 10, 0, INTEREST_RATE_FACTOR).unwrap(),
            100_000
        );
        assert_eq!(
            calculate_tracked_balance(0, 10, ONE_PERCENT, INTEREST_RATE_FACTOR).unwrap(),
            0
        );
    }

    #[test]
    fn test_balance_width_rejected() {
        let result = calculate_tracked_balance(u64::MAX, 1, ONE_PERCENT, INTEREST_RATE_FACTOR);
        assert!(matches!(result, Err(LendingError::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_simple_interest() {
        // 110_462 * 2% = 2_209.24
        assert_eq!(
            calculate_simple_interest(110_462, 1, 2 * ONE_PERCENT, INTEREST_RATE_FACTOR).unwrap(),
            2_209
        );
        // 110_462 * 0.1% = 110.462
        assert_eq!(
            calculate_simple_interest(110_462, 1, 1_000_000, INTEREST_RATE_FACTOR).unwrap(),
            110
        );
        // 1_500 * 0.1% = 1.5 rounds up
        assert_eq!(
            calculate_simple_interest(1_500, 1, 1_000_000, INTEREST_RATE_FACTOR).unwrap(),
            2
        );
        // linear in the period count
        assert_eq!(
            calculate_simple_interest(100_000, 5, 2 * ONE_PERCENT, INTEREST_RATE_FACTOR).unwrap(),
            10_000
        );
    }
}
