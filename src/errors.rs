use thiserror::Error;

use crate::types::{OperationId, OperationStatus, ProgramId, SubLoanId, SubLoanStatus, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingError {
    // validation errors, raised before any state is touched

    #[error("zero account is not allowed for {role}")]
    ZeroAccount {
        role: String,
    },

    #[error("zero amount is not allowed for {field}")]
    ZeroAmount {
        field: String,
    },

    #[error("amount {amount} is not a multiple of the accuracy factor {accuracy_factor}")]
    AmountUnrounded {
        amount: u64,
        accuracy_factor: u64,
    },

    #[error("array length mismatch: {details}")]
    ArrayLengthMismatch {
        details: String,
    },

    #[error("empty batch")]
    EmptyBatch,

    #[error("installment durations must be non-decreasing")]
    DurationsNotAscending,

    #[error("value {value} for {field} exceeds maximum {max}")]
    ValueOutOfRange {
        field: String,
        value: u64,
        max: u64,
    },

    #[error("invalid operation parameters: {message}")]
    InvalidOperationParameters {
        message: String,
    },

    #[error("operation timestamp {timestamp} is earlier than sub-loan start {start}")]
    TimestampBeforeStart {
        timestamp: Timestamp,
        start: Timestamp,
    },

    #[error("timestamp out of range: {message}")]
    TimestampOutOfRange {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    // state consistency errors, the whole batch is aborted

    #[error("sub-loan not found: {id}")]
    SubLoanNotFound {
        id: SubLoanId,
    },

    #[error("program not found: {id}")]
    ProgramNotFound {
        id: ProgramId,
    },

    #[error("operation {operation_id} not found on sub-loan {sub_loan_id}")]
    OperationNotFound {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
    },

    #[error("sub-loan {id} is not ongoing: current status is {status:?}")]
    SubLoanNotOngoing {
        id: SubLoanId,
        status: SubLoanStatus,
    },

    #[error("sub-loan {id} is revoked")]
    SubLoanRevoked {
        id: SubLoanId,
    },

    #[error("operation cannot be voided: current status is {status:?}")]
    OperationNotVoidable {
        status: OperationStatus,
    },

    #[error("repayment or discount amount excess: requested {requested}, consumed {consumed}")]
    RepaymentOrDiscountAmountExcess {
        requested: u64,
        consumed: u64,
    },

    #[error("sub-loan {id} is already frozen")]
    AlreadyFrozen {
        id: SubLoanId,
    },

    #[error("sub-loan {id} is not frozen")]
    NotFrozen {
        id: SubLoanId,
    },

    #[error("operation count overflow on sub-loan {id}")]
    OperationCountOverflow {
        id: SubLoanId,
    },

    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        context: String,
    },

    // collaborator failures, propagated unchanged

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },
}

impl LendingError {
    pub(crate) fn overflow(context: &str) -> Self {
        LendingError::ArithmeticOverflow {
            context: context.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
