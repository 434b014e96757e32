use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LendingError, Result};

/// unique identifier for a sub-loan, assigned from a per-market counter
pub type SubLoanId = u64;

/// identifier of a program (credit line + liquidity pool pair)
pub type ProgramId = u32;

/// identifier of an operation, unique within one sub-loan
pub type OperationId = u16;

/// account that owns or moves funds, `Uuid::nil()` is the zero account
pub type AccountId = Uuid;

/// seconds since the unix epoch, 32-bit like every stored timestamp
pub type Timestamp = u32;

/// sentinel amount meaning "settle everything that is owed"
pub const AMOUNT_MAX: u64 = u64::MAX;

/// largest monetary value the 64.64 accumulator accepts
pub const ACCUMULATOR_MAX: u64 = i64::MAX as u64;

/// sub-loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubLoanStatus {
    #[default]
    Nonexistent,
    /// accepting operations and accruing interest
    Ongoing,
    /// every tracked component reached zero
    FullyRepaid,
    /// written back to the pool, tracked balances forced to zero
    Revoked,
}

/// kind of an operation queued against a sub-loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Repayment,
    Discounting,
    Revocation,
    Freezing,
    Unfreezing,
    ChangeInInterestRateRemuneratory,
    ChangeInInterestRateMoratory,
    ChangeInLateFeeRate,
    ChangeInDuration,
}

impl OperationKind {
    /// whether the operation moves value through the waterfall
    pub fn is_settlement(&self) -> bool {
        matches!(self, OperationKind::Repayment | OperationKind::Discounting)
    }

    /// whether the operation replaces one of the current terms
    pub fn is_terms_change(&self) -> bool {
        matches!(
            self,
            OperationKind::ChangeInInterestRateRemuneratory
                | OperationKind::ChangeInInterestRateMoratory
                | OperationKind::ChangeInLateFeeRate
                | OperationKind::ChangeInDuration
        )
    }
}

/// operation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationStatus {
    #[default]
    Nonexistent,
    /// queued, not yet reached by processing
    Pending,
    /// took effect on the tracked balances
    Applied,
    /// voided before it took effect
    Canceled,
    /// voided after it took effect, reversed through replay
    Revoked,
}

impl OperationStatus {
    /// voided operations are skipped by processing and replay
    pub fn is_voided(&self) -> bool {
        matches!(self, OperationStatus::Canceled | OperationStatus::Revoked)
    }
}

/// loan terms, used both for the immutable origination record and the
/// mutable current record of a sub-loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanTerms {
    /// whole periods until the due period
    pub duration: u16,
    /// pre-due compounding rate per period, relative to the rate factor
    pub interest_rate_remuneratory: u32,
    /// post-due rate per period, relative to the rate factor
    pub interest_rate_moratory: u32,
    /// one-time fee rate applied when the due period is crossed
    pub late_fee_rate: u32,
}

/// one amount per balance component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentAmounts {
    pub principal: u64,
    pub interest_remuneratory: u64,
    pub interest_moratory: u64,
    pub late_fee: u64,
}

impl ComponentAmounts {
    pub const ZERO: ComponentAmounts = ComponentAmounts {
        principal: 0,
        interest_remuneratory: 0,
        interest_moratory: 0,
        late_fee: 0,
    };

    /// sum of all four components
    pub fn total(&self) -> Result<u64> {
        [
            self.interest_remuneratory,
            self.interest_moratory,
            self.late_fee,
        ]
        .iter()
        .try_fold(self.principal, |acc, value| acc.checked_add(*value))
        .ok_or(LendingError::ArithmeticOverflow {
            context: "component total".to_string(),
        })
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// component-wise checked addition
    pub fn checked_add(&self, other: &ComponentAmounts) -> Result<ComponentAmounts> {
        let add = |a: u64, b: u64, name: &str| {
            a.checked_add(b).ok_or(LendingError::ArithmeticOverflow {
                context: name.to_string(),
            })
        };
        Ok(ComponentAmounts {
            principal: add(self.principal, other.principal, "principal")?,
            interest_remuneratory: add(
                self.interest_remuneratory,
                other.interest_remuneratory,
                "remuneratory interest",
            )?,
            interest_moratory: add(
                self.interest_moratory,
                other.interest_moratory,
                "moratory interest",
            )?,
            late_fee: add(self.late_fee, other.late_fee, "late fee")?,
        })
    }
}

/// checks that a value fits a narrower stored field
pub fn ensure_width(field: &str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(LendingError::ValueOutOfRange {
            field: field.to_string(),
            value,
            max,
        });
    }
    Ok(())
}

/// whether an account is the zero account
pub fn is_zero_account(account: &AccountId) -> bool {
    account.is_nil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_total() {
        let amounts = ComponentAmounts {
            principal: 100,
            interest_remuneratory: 20,
            interest_moratory: 3,
            late_fee: 4,
        };
        assert_eq!(amounts.total().unwrap(), 127);
        assert!(!amounts.is_zero());
        assert!(ComponentAmounts::ZERO.is_zero());
    }

    #[test]
    fn test_component_total_overflow() {
        let amounts = ComponentAmounts {
            principal: u64::MAX,
            late_fee: 1,
            ..ComponentAmounts::ZERO
        };
        assert!(matches!(
            amounts.total(),
            Err(LendingError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_ensure_width() {
        assert!(ensure_width("duration", u16::MAX as u64, u16::MAX as u64).is_ok());
        let err = ensure_width("duration", u16::MAX as u64 + 1, u16::MAX as u64).unwrap_err();
        assert!(matches!(err, LendingError::ValueOutOfRange { max, .. } if max == 65_535));
    }

    #[test]
    fn test_operation_kind_groups() {
        assert!(OperationKind::Repayment.is_settlement());
        assert!(OperationKind::Discounting.is_settlement());
        assert!(!OperationKind::Freezing.is_settlement());
        assert!(OperationKind::ChangeInDuration.is_terms_change());
        assert!(!OperationKind::Revocation.is_terms_change());
        assert!(OperationStatus::Canceled.is_voided());
        assert!(!OperationStatus::Applied.is_voided());
    }
}
