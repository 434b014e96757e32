use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::{LendingError, Result};

/// largest decimal count whose scale fits a u64
pub const MAX_TOKEN_DECIMALS: u32 = 19;

/// converts a human amount (e.g. 100.25 tokens) into scaled integer units
pub fn amount_from_decimal(value: Decimal, token_decimals: u32) -> Result<u64> {
    let scaled = scale_exact(value, token_scale(token_decimals)?, "amount")?;
    scaled.to_u64().ok_or(LendingError::ValueOutOfRange {
        field: "amount".to_string(),
        value: u64::MAX,
        max: u64::MAX,
    })
}

/// converts scaled integer units back into a human amount
pub fn amount_to_decimal(amount: u64, token_decimals: u32) -> Result<Decimal> {
    Ok(Decimal::from(amount) / Decimal::from(token_scale(token_decimals)?))
}

// 10^decimals must fit the 64-bit amount width
fn token_scale(token_decimals: u32) -> Result<u64> {
    10_u64
        .checked_pow(token_decimals)
        .ok_or(LendingError::ValueOutOfRange {
            field: "token decimals".to_string(),
            value: token_decimals as u64,
            max: MAX_TOKEN_DECIMALS as u64,
        })
}

/// converts a rate fraction (0.01 for 1%) into factor-relative units
pub fn rate_from_decimal(value: Decimal, factor: u64) -> Result<u32> {
    let scaled = scale_exact(value, factor, "rate")?;
    scaled.to_u32().ok_or(LendingError::ValueOutOfRange {
        field: "rate".to_string(),
        value: scaled.to_u64().unwrap_or(u64::MAX),
        max: u32::MAX as u64,
    })
}

/// converts factor-relative units back into a rate fraction
pub fn rate_to_decimal(rate: u32, factor: u64) -> Decimal {
    Decimal::from(rate) / Decimal::from(factor)
}

fn scale_exact(value: Decimal, factor: u64, field: &str) -> Result<Decimal> {
    if value.is_sign_negative() {
        return Err(LendingError::InvalidOperationParameters {
            message: format!("{} must not be negative: {}", field, value),
        });
    }
    let scaled = value
        .checked_mul(Decimal::from(factor))
        .ok_or(LendingError::overflow(field))?;
    if scaled.fract() != Decimal::ZERO {
        return Err(LendingError::InvalidOperationParameters {
            message: format!("{} {} has more precision than the factor {}", field, value, factor),
        });
    }
    Ok(scaled.trunc())
}
