use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::types::Timestamp;

/// denominator of every per-period rate: a rate of 10_000_000 is 1%
pub const INTEREST_RATE_FACTOR: u64 = 1_000_000_000;

/// outstanding balances are rounded to multiples of this value
/// (0.01 of a token with 6 decimals)
pub const ACCURACY_FACTOR: u64 = 10_000;

/// length of one accrual period
pub const PERIOD_IN_SECONDS: u64 = 86_400;

/// how interest accrues after the due period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoratoryInterestMode {
    /// linear: base * periods * rate / factor
    #[default]
    Simple,
    /// compounding on base plus accumulated moratory interest
    Compound,
}

/// market-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub interest_rate_factor: u64,
    pub accuracy_factor: u64,
    pub period_seconds: u64,
    /// subtracted from timestamps before dividing into periods
    pub negative_time_offset: u64,
    pub moratory_interest_mode: MoratoryInterestMode,
    pub max_operations_per_sub_loan: u16,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self::daily()
    }
}

impl MarketConfig {
    /// daily periods starting at utc midnight
    pub fn daily() -> Self {
        Self {
            interest_rate_factor: INTEREST_RATE_FACTOR,
            accuracy_factor: ACCURACY_FACTOR,
            period_seconds: PERIOD_IN_SECONDS,
            negative_time_offset: 0,
            moratory_interest_mode: MoratoryInterestMode::Simple,
            max_operations_per_sub_loan: u16::MAX,
        }
    }

    /// daily periods starting at a local midnight `offset` seconds behind utc
    pub fn with_local_midnight(offset: u64) -> Self {
        Self {
            negative_time_offset: offset,
            ..Self::daily()
        }
    }

    /// builder-style override of the moratory mode
    pub fn moratory_interest_mode(mut self, mode: MoratoryInterestMode) -> Self {
        self.moratory_interest_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.interest_rate_factor == 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "interest rate factor must be positive".to_string(),
            });
        }
        if self.interest_rate_factor > u32::MAX as u64 {
            return Err(LendingError::InvalidConfiguration {
                message: "interest rate factor must fit 32 bits".to_string(),
            });
        }
        if self.accuracy_factor == 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "accuracy factor must be positive".to_string(),
            });
        }
        if self.period_seconds == 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "period length must be positive".to_string(),
            });
        }
        if self.negative_time_offset >= self.period_seconds {
            return Err(LendingError::InvalidConfiguration {
                message: format!(
                    "time offset {} must be shorter than the period {}",
                    self.negative_time_offset, self.period_seconds
                ),
            });
        }
        if self.max_operations_per_sub_loan == 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "at least one operation per sub-loan must be allowed".to_string(),
            });
        }
        Ok(())
    }

    /// period index of a timestamp
    pub fn period_index(&self, timestamp: Timestamp) -> u32 {
        let shifted = (timestamp as u64).saturating_sub(self.negative_time_offset);
        (shifted / self.period_seconds) as u32
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MarketConfig =
            serde_json::from_str(json).map_err(|e| LendingError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}

/// converts a wall-clock time to a stored 32-bit timestamp
pub fn to_timestamp(time: DateTime<Utc>) -> Result<Timestamp> {
    let seconds = time.timestamp();
    Timestamp::try_from(seconds).map_err(|_| LendingError::TimestampOutOfRange {
        message: format!("{} does not fit 32 bits", seconds),
    })
}
