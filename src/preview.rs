use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::interest::AccrualEngine;
use crate::state::SubLoan;
use crate::types::{ComponentAmounts, LoanTerms, SubLoanId, SubLoanStatus, Timestamp};

/// read-only projection of one sub-loan at a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLoanPreview {
    pub sub_loan_id: SubLoanId,
    pub period_index: u32,
    pub timestamp: Timestamp,
    pub status: SubLoanStatus,
    pub tracked: ComponentAmounts,
    pub repaid: ComponentAmounts,
    pub discount: ComponentAmounts,
    /// sum of the rounded tracked components
    pub outstanding_balance: u64,
    pub terms: LoanTerms,
    pub freeze_timestamp: Timestamp,
}

impl SubLoanPreview {
    /// accrue a working copy up to `timestamp`; pending operations are not applied
    pub fn project(
        sub_loan: &SubLoan,
        timestamp: Timestamp,
        accrual: &AccrualEngine,
    ) -> Result<Self> {
        let mut working = sub_loan.clone();
        accrual.accrue(&mut working, timestamp)?;

        Ok(Self {
            sub_loan_id: working.id,
            period_index: accrual.config().period_index(timestamp),
            timestamp,
            status: working.status,
            tracked: working.tracked,
            repaid: working.repaid,
            discount: working.discount,
            outstanding_balance: working.outstanding_balance(accrual.config().accuracy_factor)?,
            terms: working.terms,
            freeze_timestamp: working.freeze_timestamp,
        })
    }
}

/// installment group preview: member previews and their sums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPreview {
    pub first_sub_loan_id: SubLoanId,
    pub sub_loan_count: usize,
    /// period index of the last member
    pub period_index: u32,
    pub timestamp: Timestamp,
    pub tracked: ComponentAmounts,
    pub repaid: ComponentAmounts,
    pub discount: ComponentAmounts,
    pub outstanding_balance: u64,
    pub ongoing_sub_loans: usize,
    pub members: Vec<SubLoanPreview>,
}

impl LoanPreview {
    pub fn aggregate(members: Vec<SubLoanPreview>) -> Result<Self> {
        let first = members.first().ok_or(LendingError::EmptyBatch)?;
        let mut preview = LoanPreview {
            first_sub_loan_id: first.sub_loan_id,
            sub_loan_count: members.len(),
            period_index: 0,
            timestamp: first.timestamp,
            tracked: ComponentAmounts::ZERO,
            repaid: ComponentAmounts::ZERO,
            discount: ComponentAmounts::ZERO,
            outstanding_balance: 0,
            ongoing_sub_loans: 0,
            members: Vec::new(),
        };

        for member in &members {
            preview.period_index = member.period_index;
            preview.tracked = preview.tracked.checked_add(&member.tracked)?;
            preview.repaid = preview.repaid.checked_add(&member.repaid)?;
            preview.discount = preview.discount.checked_add(&member.discount)?;
            preview.outstanding_balance = preview
                .outstanding_balance
                .checked_add(member.outstanding_balance)
                .ok_or(LendingError::overflow("group outstanding balance"))?;
            if member.status == SubLoanStatus::Ongoing {
                preview.ongoing_sub_loans += 1;
            }
        }
        preview.members = members;
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarketConfig, PERIOD_IN_SECONDS};
    use crate::state::tests::{scenario_sub_loan, START};

    const DAY: Timestamp = PERIOD_IN_SECONDS as Timestamp;

    #[test]
    fn test_preview_does_not_mutate() {
        let engine = AccrualEngine::new(MarketConfig::daily());
        let loan = scenario_sub_loan(100_000);
        let snapshot = loan.clone();

        let preview = SubLoanPreview::project(&loan, START + 11 * DAY, &engine).unwrap();

        assert_eq!(loan, snapshot);
        assert_eq!(preview.period_index, 19_011);
        assert_eq!(preview.tracked.total().unwrap(), 112_783);
        assert_eq!(preview.outstanding_balance, 110_000);
        assert_eq!(preview.status, SubLoanStatus::Ongoing);
    }

    #[test]
    fn test_group_preview_sums_members() {
        let engine = AccrualEngine::new(MarketConfig::daily());
        let first = scenario_sub_loan(100_000);
        let mut second = scenario_sub_loan(50_000);
        second.id = 2;

        let members = vec![
            SubLoanPreview::project(&first, START + 10 * DAY, &engine).unwrap(),
            SubLoanPreview::project(&second, START + 10 * DAY, &engine).unwrap(),
        ];
        let preview = LoanPreview::aggregate(members).unwrap();

        assert_eq!(preview.sub_loan_count, 2);
        assert_eq!(preview.first_sub_loan_id, 1);
        assert_eq!(preview.tracked.principal, 150_000);
        // 10_462 + 5_231
        assert_eq!(preview.tracked.interest_remuneratory, 15_693);
        assert_eq!(preview.outstanding_balance, 110_000 + 60_000);
        assert_eq!(preview.ongoing_sub_loans, 2);
        assert_eq!(preview.period_index, 19_010);
    }

    #[test]
    fn test_empty_group_rejected() {
        assert_eq!(LoanPreview::aggregate(Vec::new()), Err(LendingError::EmptyBatch));
    }
}
