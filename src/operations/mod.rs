pub mod engine;

use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::interest::is_rounded;
use crate::types::{
    ensure_width, is_zero_account, AccountId, OperationId, OperationKind, OperationStatus,
    SubLoanId, Timestamp, AMOUNT_MAX,
};

pub use engine::{OperationEngine, ProcessingReport};

/// one entry of a sub-loan's operation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub timestamp: Timestamp,
    /// requested value: an amount, a new rate or a new duration
    pub input_value: u64,
    /// value that actually took effect, filled when applied
    pub applied_value: u64,
    /// counterparty for repayments, nil otherwise
    pub account: AccountId,
}

/// add an operation to a sub-loan; `timestamp == 0` means now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOperationRequest {
    pub sub_loan_id: SubLoanId,
    pub kind: OperationKind,
    pub timestamp: Timestamp,
    pub input_value: u64,
    pub account: AccountId,
}

/// void a previously added operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidOperationRequest {
    pub sub_loan_id: SubLoanId,
    pub operation_id: OperationId,
}

/// check the kind / input value / account combination of a new operation
pub fn validate_operation(
    kind: OperationKind,
    input_value: u64,
    account: &AccountId,
    accuracy_factor: u64,
) -> Result<()> {
    let invalid = |message: &str| {
        Err(LendingError::InvalidOperationParameters {
            message: format!("{:?}: {}", kind, message),
        })
    };

    match kind {
        OperationKind::Repayment | OperationKind::Discounting => {
            if input_value == 0 {
                return Err(LendingError::ZeroAmount {
                    field: format!("{:?} amount", kind),
                });
            }
            if input_value != AMOUNT_MAX && !is_rounded(input_value, accuracy_factor) {
                return Err(LendingError::AmountUnrounded {
                    amount: input_value,
                    accuracy_factor,
                });
            }
            match (kind, is_zero_account(account)) {
                (OperationKind::Repayment, true) => Err(LendingError::ZeroAccount {
                    role: "repayer".to_string(),
                }),
                (OperationKind::Discounting, false) => {
                    invalid("account must be the zero account")
                }
                _ => Ok(()),
            }
        }
        OperationKind::Revocation | OperationKind::Freezing | OperationKind::Unfreezing => {
            if input_value != 0 {
                return invalid("input value must be zero");
            }
            if !is_zero_account(account) {
                return invalid("account must be the zero account");
            }
            Ok(())
        }
        OperationKind::ChangeInInterestRateRemuneratory
        | OperationKind::ChangeInInterestRateMoratory
        | OperationKind::ChangeInLateFeeRate
        | OperationKind::ChangeInDuration => {
            let max = if kind == OperationKind::ChangeInDuration {
                u16::MAX as u64
            } else {
                u32::MAX as u64
            };
            ensure_width(&format!("{:?} value", kind), input_value, max)?;
            if !is_zero_account(account) {
                return invalid("account must be the zero account");
            }
            Ok(())
        }
    }
}

/// timestamp-ordered operation log of a single sub-loan
///
/// Operations are stored by id (`id - 1` indexes `operations`) and ordered
/// through `order`, which is kept sorted by timestamp with ties in insertion
/// order. `processed` counts the entries of `order` already walked by the
/// processing cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    operations: Vec<Operation>,
    order: Vec<OperationId>,
    processed: usize,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, id: OperationId) -> Option<&Operation> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.operations.get(index))
    }

    pub fn get_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.operations.get_mut(index))
    }

    /// insert a pending operation at its timestamp position
    ///
    /// Returns the new id and its position in timestamp order.
    pub fn insert(
        &mut self,
        kind: OperationKind,
        timestamp: Timestamp,
        input_value: u64,
        account: AccountId,
        max_operations: u16,
    ) -> Option<(OperationId, usize)> {
        if self.operations.len() >= max_operations as usize {
            return None;
        }
        let id = OperationId::try_from(self.operations.len() + 1).ok()?;
        self.operations.push(Operation {
            id,
            kind,
            status: OperationStatus::Pending,
            timestamp,
            input_value,
            applied_value: 0,
            account,
        });

        // scan back from the tail past every later operation
        let mut position = self.order.len();
        while position > 0 {
            let previous = self.order[position - 1];
            match self.get(previous) {
                Some(operation) if operation.timestamp > timestamp => position -= 1,
                _ => break,
            }
        }
        self.order.insert(position, id);
        Some((id, position))
    }

    /// ids in timestamp order
    pub fn ordered_ids(&self) -> &[OperationId] {
        &self.order
    }

    /// operations in timestamp order
    pub fn iter(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.order.iter().filter_map(move |id| self.get(*id))
    }

    pub fn earliest_operation_id(&self) -> Option<OperationId> {
        self.order.first().copied()
    }

    pub fn latest_operation_id(&self) -> Option<OperationId> {
        self.order.last().copied()
    }

    /// last operation walked by the processing cursor
    pub fn past_operation_id(&self) -> Option<OperationId> {
        self.processed
            .checked_sub(1)
            .and_then(|index| self.order.get(index).copied())
    }

    pub fn prev_operation_id(&self, id: OperationId) -> Option<OperationId> {
        let position = self.position_of(id)?;
        position
            .checked_sub(1)
            .and_then(|index| self.order.get(index).copied())
    }

    pub fn next_operation_id(&self, id: OperationId) -> Option<OperationId> {
        let position = self.position_of(id)?;
        self.order.get(position + 1).copied()
    }

    pub fn position_of(&self, id: OperationId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    /// whether `position` has already been walked by the cursor
    pub fn is_behind_cursor(&self, position: usize) -> bool {
        position < self.processed
    }

    /// first operation the cursor has not walked yet
    pub fn next_unprocessed(&self) -> Option<OperationId> {
        self.order.get(self.processed).copied()
    }

    pub fn advance_cursor(&mut self) {
        if self.processed < self.order.len() {
            self.processed += 1;
        }
    }

    pub fn rewind(&mut self) {
        self.processed = 0;
    }

    /// pending operations the cursor has not reached, in timestamp order
    pub fn pending(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.order[self.processed.min(self.order.len())..]
            .iter()
            .filter_map(move |id| self.get(*id))
            .filter(|operation| operation.status == OperationStatus::Pending)
    }

    /// sum of applied values of the given kind
    pub fn applied_total(&self, kind: OperationKind) -> u64 {
        self.operations
            .iter()
            .filter(|operation| {
                operation.kind == kind && operation.status == OperationStatus::Applied
            })
            .fold(0u64, |total, operation| total.saturating_add(operation.applied_value))
    }
}
