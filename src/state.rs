use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::errors::{LendingError, Result};
use crate::interest::round_to_accuracy;
use crate::operations::OperationLog;
use crate::types::{
    AccountId, ComponentAmounts, LoanTerms, ProgramId, SubLoanId, SubLoanStatus, Timestamp,
    ACCUMULATOR_MAX,
};

/// parameters fixed when a sub-loan is taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubLoan {
    pub id: SubLoanId,
    pub program_id: ProgramId,
    pub borrower: AccountId,
    pub first_sub_loan_id: SubLoanId,
    pub sub_loan_count: u16,
    pub start_timestamp: Timestamp,
    pub borrowed_amount: u64,
    pub addon_amount: u64,
    pub terms: LoanTerms,
}

/// stored record of one sub-loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLoan {
    // identification
    pub id: SubLoanId,
    pub program_id: ProgramId,
    pub borrower: AccountId,

    // installment chain
    pub first_sub_loan_id: SubLoanId,
    pub sub_loan_count: u16,

    // origination
    pub start_timestamp: Timestamp,
    pub borrowed_amount: u64,
    pub addon_amount: u64,
    pub initial_terms: LoanTerms,

    // derived state, rebuilt from origination on replay
    pub terms: LoanTerms,
    pub status: SubLoanStatus,
    pub tracked_timestamp: Timestamp,
    pub freeze_timestamp: Timestamp,
    pub tracked: ComponentAmounts,
    pub repaid: ComponentAmounts,
    pub discount: ComponentAmounts,
    /// set once the late fee has been charged, a later due period does not charge it again
    #[serde(default)]
    pub late_fee_imposed: bool,

    pub operations: OperationLog,
}

impl SubLoan {
    /// create an ongoing sub-loan whose current terms equal its initial terms
    pub fn originate(params: NewSubLoan) -> Result<Self> {
        let principal = params
            .borrowed_amount
            .checked_add(params.addon_amount)
            .ok_or(LendingError::overflow("borrowed plus addon amount"))?;
        if principal > ACCUMULATOR_MAX {
            return Err(LendingError::ValueOutOfRange {
                field: "principal".to_string(),
                value: principal,
                max: ACCUMULATOR_MAX,
            });
        }

        let mut sub_loan = Self {
            id: params.id,
            program_id: params.program_id,
            borrower: params.borrower,
            first_sub_loan_id: params.first_sub_loan_id,
            sub_loan_count: params.sub_loan_count,
            start_timestamp: params.start_timestamp,
            borrowed_amount: params.borrowed_amount,
            addon_amount: params.addon_amount,
            initial_terms: params.terms,
            terms: params.terms,
            status: SubLoanStatus::Ongoing,
            tracked_timestamp: params.start_timestamp,
            freeze_timestamp: 0,
            tracked: ComponentAmounts::ZERO,
            repaid: ComponentAmounts::ZERO,
            discount: ComponentAmounts::ZERO,
            late_fee_imposed: false,
            operations: OperationLog::new(),
        };
        sub_loan.tracked.principal = principal;
        Ok(sub_loan)
    }

    /// principal at origination: borrowed amount plus addon
    pub fn initial_principal(&self) -> u64 {
        // checked at origination
        self.borrowed_amount.saturating_add(self.addon_amount)
    }

    /// discard every derived value and return to the origination state
    ///
    /// The operation log is kept; the caller rewinds its cursor.
    pub fn reset_to_origination(&mut self) {
        self.terms = self.initial_terms;
        self.status = SubLoanStatus::Ongoing;
        self.tracked_timestamp = self.start_timestamp;
        self.freeze_timestamp = 0;
        self.tracked = ComponentAmounts {
            principal: self.initial_principal(),
            ..ComponentAmounts::ZERO
        };
        self.repaid = ComponentAmounts::ZERO;
        self.discount = ComponentAmounts::ZERO;
        self.late_fee_imposed = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_timestamp != 0
    }

    pub fn is_installment(&self) -> bool {
        self.sub_loan_count > 1
    }

    /// ids of every member of this sub-loan's group, in order
    pub fn group_ids(&self) -> impl Iterator<Item = SubLoanId> {
        let count = self.sub_loan_count.max(1) as u64;
        self.first_sub_loan_id..self.first_sub_loan_id + count
    }

    /// period index at which post-due accrual starts
    pub fn due_period(&self, config: &MarketConfig) -> u32 {
        config
            .period_index(self.start_timestamp)
            .saturating_add(self.terms.duration as u32)
    }

    /// unrounded sum of tracked components
    pub fn tracked_balance(&self) -> Result<u64> {
        self.tracked.total()
    }

    /// sum of each tracked component rounded to the accuracy factor
    pub fn outstanding_balance(&self, accuracy_factor: u64) -> Result<u64> {
        rounded_outstanding(&self.tracked, accuracy_factor)
    }

    /// per component, everything ever added: tracked + repaid + discount
    pub fn accrued_totals(&self) -> Result<ComponentAmounts> {
        self.tracked
            .checked_add(&self.repaid)?
            .checked_add(&self.discount)
    }

    /// FullyRepaid once every tracked component is zero, revocation is sticky
    ///
    /// Returns the previous status when it changed.
    pub fn refresh_status(&mut self) -> Option<SubLoanStatus> {
        if self.status != SubLoanStatus::Ongoing {
            return None;
        }
        if self.tracked.is_zero() {
            self.status = SubLoanStatus::FullyRepaid;
            return Some(SubLoanStatus::Ongoing);
        }
        None
    }

    /// operations may only be added while the sub-loan is ongoing
    pub fn ensure_ongoing(&self) -> Result<()> {
        if self.status != SubLoanStatus::Ongoing {
            return Err(LendingError::SubLoanNotOngoing {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

/// sum of rounded components, the amount actually payable
pub fn rounded_outstanding(tracked: &ComponentAmounts, accuracy_factor: u64) -> Result<u64> {
    ComponentAmounts {
        principal: round_to_accuracy(tracked.principal, accuracy_factor),
        interest_remuneratory: round_to_accuracy(tracked.interest_remuneratory, accuracy_factor),
        interest_moratory: round_to_accuracy(tracked.interest_moratory, accuracy_factor),
        late_fee: round_to_accuracy(tracked.late_fee, accuracy_factor),
    }
    .total()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use uuid::Uuid;

    pub(crate) const START: Timestamp = 19_000 * 86_400;

    pub(crate) fn scenario_terms() -> LoanTerms {
        LoanTerms {
            duration: 10,
            interest_rate_remuneratory: 10_000_000,
            interest_rate_moratory: 20_000_000,
            late_fee_rate: 1_000_000,
        }
    }

    pub(crate) fn scenario_sub_loan(borrowed: u64) -> SubLoan {
        SubLoan::originate(NewSubLoan {
            id: 1,
            program_id: 1,
            borrower: Uuid::from_u128(7),
            first_sub_loan_id: 1,
            sub_loan_count: 1,
            start_timestamp: START,
            borrowed_amount: borrowed,
            addon_amount: 0,
            terms: scenario_terms(),
        })
        .unwrap()
    }

    #[test]
    fn test_originate() {
        let loan = SubLoan::originate(NewSubLoan {
            id: 3,
            program_id: 1,
            borrower: Uuid::from_u128(7),
            first_sub_loan_id: 2,
            sub_loan_count: 3,
            start_timestamp: START,
            borrowed_amount: 90_000,
            addon_amount: 10_000,
            terms: scenario_terms(),
        })
        .unwrap();

        assert_eq!(loan.status, SubLoanStatus::Ongoing);
        assert_eq!(loan.tracked.principal, 100_000);
        assert_eq!(loan.terms, loan.initial_terms);
        assert_eq!(loan.tracked_timestamp, START);
        assert!(loan.is_installment());
        assert_eq!(loan.group_ids().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(loan.due_period(&MarketConfig::daily()), 19_010);
    }

    #[test]
    fn test_originate_rejects_wide_principal() {
        let result = SubLoan::originate(NewSubLoan {
            id: 1,
            program_id: 1,
            borrower: Uuid::from_u128(7),
            first_sub_loan_id: 1,
            sub_loan_count: 1,
            start_timestamp: START,
            borrowed_amount: ACCUMULATOR_MAX,
            addon_amount: 1,
            terms: scenario_terms(),
        });
        assert!(matches!(result, Err(LendingError::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_reset_to_origination() {
        let mut loan = scenario_sub_loan(100_000);
        loan.tracked.interest_remuneratory = 500;
        loan.repaid.principal = 10;
        loan.terms.duration = 30;
        loan.freeze_timestamp = START + 5;
        loan.late_fee_imposed = true;
        loan.status = SubLoanStatus::FullyRepaid;

        loan.reset_to_origination();

        assert_eq!(loan.tracked.principal, 100_000);
        assert_eq!(loan.tracked.interest_remuneratory, 0);
        assert!(loan.repaid.is_zero());
        assert_eq!(loan.terms.duration, 10);
        assert!(!loan.is_frozen());
        assert!(!loan.late_fee_imposed);
        assert_eq!(loan.status, SubLoanStatus::Ongoing);
    }

    #[test]
    fn test_outstanding_rounds_each_component() {
        let mut loan = scenario_sub_loan(100_000);
        loan.tracked.interest_remuneratory = 10_462;
        loan.tracked.late_fee = 5_000;
        assert_eq!(loan.tracked_balance().unwrap(), 115_462);
        assert_eq!(loan.outstanding_balance(10_000).unwrap(), 120_000);
    }

    #[test]
    fn test_refresh_status() {
        let mut loan = scenario_sub_loan(100_000);
        assert_eq!(loan.refresh_status(), None);

        loan.repaid.principal = loan.tracked.principal;
        loan.tracked.principal = 0;
        assert_eq!(loan.refresh_status(), Some(SubLoanStatus::Ongoing));
        assert_eq!(loan.status, SubLoanStatus::FullyRepaid);
        assert!(loan.ensure_ongoing().is_err());

        let mut revoked = scenario_sub_loan(100_000);
        revoked.status = SubLoanStatus::Revoked;
        revoked.tracked = ComponentAmounts::ZERO;
        assert_eq!(revoked.refresh_status(), None);
        assert_eq!(revoked.status, SubLoanStatus::Revoked);
    }
}
