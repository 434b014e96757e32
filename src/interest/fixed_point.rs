use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use crate::errors::{LendingError, Result};

/// signed 64.64 fixed-point number: 64 integer bits, 64 fractional bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed64x64(i128);

const FRACTION_BITS: u32 = 64;
const HALF: i128 = 1 << 63;

impl Fixed64x64 {
    pub const ONE: Fixed64x64 = Fixed64x64(1 << FRACTION_BITS);

    pub fn from_raw(raw: i128) -> Self {
        Fixed64x64(raw)
    }

    pub fn raw(&self) -> i128 {
        self.0
    }

    /// integer to 64.64, the integer must fit 63 bits
    pub fn from_uint(value: u64) -> Result<Self> {
        if value > i64::MAX as u64 {
            return Err(LendingError::ValueOutOfRange {
                field: "fixed-point operand".to_string(),
                value,
                max: i64::MAX as u64,
            });
        }
        Ok(Fixed64x64((value as i128) << FRACTION_BITS))
    }

    /// `numerator / denominator` truncated to 64 fractional bits
    pub fn from_fraction(numerator: u64, denominator: u64) -> Result<Self> {
        if denominator == 0 {
            return Err(LendingError::overflow("fixed-point division by zero"));
        }
        Self::from_uint(numerator)?;
        Self::from_uint(denominator)?;
        // (a << 128) / (b << 64) reduces to (a << 64) / b for whole operands
        let quotient = ((numerator as u128) << FRACTION_BITS) / denominator as u128;
        i128::try_from(quotient)
            .map(Fixed64x64)
            .map_err(|_| LendingError::overflow("fixed-point division"))
    }

    /// exact product with an integer, no fractional bits are lost
    pub fn mul_uint(&self, value: u64) -> Result<Self> {
        Self::from_uint(value)?;
        self.0
            .checked_mul(value as i128)
            .map(Fixed64x64)
            .ok_or(LendingError::overflow("fixed-point multiplication"))
    }

    /// integer part after adding one half, i.e. round half up
    pub fn to_uint_rounded(&self) -> Result<u64> {
        if self.0 < 0 {
            return Err(LendingError::overflow("negative fixed-point value"));
        }
        let rounded = self
            .0
            .checked_add(HALF)
            .ok_or(LendingError::overflow("fixed-point rounding"))?;
        u64::try_from(rounded >> FRACTION_BITS)
            .map_err(|_| LendingError::overflow("fixed-point to integer"))
    }

    /// raises a non-negative value to an integer power
    ///
    /// Binary exponentiation over 128-bit normalized mantissas with
    /// truncating products, so results are reproducible bit for bit.
    pub fn pow(&self, exponent: u32) -> Result<Self> {
        if self.0 < 0 {
            return Err(LendingError::overflow("negative fixed-point base"));
        }
        let one_128 = BigUint::one() << 128usize;
        let mut abs_x = BigUint::from(self.0 as u128);
        let mut abs_result = one_128.clone();
        let mut y = exponent;

        if abs_x <= (BigUint::one() << 64usize) {
            abs_x <<= 63usize;
            while y != 0 {
                for bit in [0x1, 0x2, 0x4, 0x8] {
                    if y & bit != 0 {
                        abs_result = (&abs_result * &abs_x) >> 127usize;
                    }
                    abs_x = (&abs_x * &abs_x) >> 127usize;
                }
                y >>= 4;
            }
            abs_result >>= 64usize;
        } else {
            let mut abs_x_shift: u32 = 63;
            let steps = [(96, 32), (112, 16), (120, 8), (124, 4), (126, 2), (127, 1)];
            for (limit_bits, shift) in steps {
                if abs_x < (BigUint::one() << (limit_bits as usize)) {
                    abs_x <<= shift as usize;
                    abs_x_shift -= shift;
                }
            }

            let mut result_shift: u32 = 0;
            while y != 0 {
                if abs_x_shift >= 64 {
                    return Err(LendingError::overflow("fixed-point power"));
                }
                if y & 0x1 != 0 {
                    abs_result = (&abs_result * &abs_x) >> 127usize;
                    result_shift += abs_x_shift;
                    if abs_result > one_128 {
                        abs_result >>= 1usize;
                        result_shift += 1;
                    }
                }
                abs_x = (&abs_x * &abs_x) >> 127usize;
                abs_x_shift <<= 1;
                if abs_x >= one_128 {
                    abs_x >>= 1usize;
                    abs_x_shift += 1;
                }
                y >>= 1;
            }

            if result_shift >= 64 {
                return Err(LendingError::overflow("fixed-point power"));
            }
            abs_result >>= (64 - result_shift) as usize;
        }

        abs_result
            .to_i128()
            .map(Fixed64x64)
            .ok_or(LendingError::overflow("fixed-point power"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uint_width() {
        assert_eq!(Fixed64x64::from_uint(1).unwrap(), Fixed64x64::ONE);
        assert!(Fixed64x64::from_uint(i64::MAX as u64).is_ok());
        assert!(Fixed64x64::from_uint(i64::MAX as u64 + 1).is_err());
    }

    #[test]
    fn test_fraction_truncates() {
        let half = Fixed64x64::from_fraction(1, 2).unwrap();
        assert_eq!(half.raw(), 1 << 63);

        let third = Fixed64x64::from_fraction(1, 3).unwrap();
        assert_eq!(third.raw(), (1u128 << 64) as i128 / 3);

        assert!(Fixed64x64::from_fraction(1, 0).is_err());
    }

    #[test]
    fn test_pow_identities() {
        let base = Fixed64x64::from_fraction(1_010_000_000, 1_000_000_000).unwrap();
        assert_eq!(base.pow(0).unwrap(), Fixed64x64::ONE);
        assert_eq!(Fixed64x64::ONE.pow(365).unwrap(), Fixed64x64::ONE);

        let two = Fixed64x64::from_uint(2).unwrap();
        assert_eq!(two.pow(10).unwrap(), Fixed64x64::from_uint(1024).unwrap());

        let half = Fixed64x64::from_fraction(1, 2).unwrap();
        assert_eq!(half.pow(2).unwrap(), Fixed64x64::from_fraction(1, 4).unwrap());
    }

    #[test]
    fn test_pow_overflow() {
        let two = Fixed64x64::from_uint(2).unwrap();
        assert!(two.pow(62).is_ok());
        assert!(two.pow(64).is_err());
    }

    #[test]
    fn test_rounding() {
        let value = Fixed64x64::from_uint(7).unwrap();
        assert_eq!(value.to_uint_rounded().unwrap(), 7);

        let just_below_half = Fixed64x64::from_raw(Fixed64x64::ONE.raw() * 7 + HALF - 1);
        assert_eq!(just_below_half.to_uint_rounded().unwrap(), 7);

        let half_up = Fixed64x64::from_raw(Fixed64x64::ONE.raw() * 7 + HALF);
        assert_eq!(half_up.to_uint_rounded().unwrap(), 8);
    }

    #[test]
    fn test_mul_uint_exact() {
        let half = Fixed64x64::from_fraction(1, 2).unwrap();
        let product = half.mul_uint(101).unwrap();
        assert_eq!(product.raw(), 101 * (1 << 63));
        assert_eq!(product.to_uint_rounded().unwrap(), 51);
    }
}
