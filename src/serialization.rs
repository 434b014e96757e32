/// serialization support for sub-loans, operations and previews
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::decimal::{amount_to_decimal, rate_to_decimal};
use crate::errors::Result;
use crate::operations::Operation;
use crate::preview::LoanPreview;
use crate::state::SubLoan;
use crate::types::{
    AccountId, ComponentAmounts, LoanTerms, OperationId, OperationKind, OperationStatus,
    ProgramId, SubLoanId, SubLoanStatus, Timestamp,
};

/// serializable view of a sub-loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct SubLoanView {
    pub id: SubLoanId,
    pub program_id: ProgramId,
    pub borrower: AccountId,
    pub status: SubLoanStatus,
    pub installment: InstallmentView,
    pub origination: OriginationView,
    pub terms: TermsView,
    pub balances: BalancesView,
    pub tracking: TrackingView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub first_sub_loan_id: SubLoanId,
    pub sub_loan_count: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OriginationView {
    pub start_timestamp: Timestamp,
    pub borrowed_amount: u64,
    pub addon_amount: u64,
    pub initial_terms: TermsView,
}

/// terms with rates rendered as fractions (0.01 for 1% per period)
#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub duration: u16,
    pub interest_rate_remuneratory: Decimal,
    pub interest_rate_moratory: Decimal,
    pub late_fee_rate: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalancesView {
    pub tracked: ComponentAmounts,
    pub repaid: ComponentAmounts,
    pub discount: ComponentAmounts,
    pub tracked_balance: u64,
    pub outstanding_balance: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackingView {
    pub tracked_timestamp: Timestamp,
    pub freeze_timestamp: Timestamp,
    pub due_period: u32,
    pub operation_count: usize,
    pub earliest_operation_id: Option<OperationId>,
    pub latest_operation_id: Option<OperationId>,
    pub past_operation_id: Option<OperationId>,
}

impl TermsView {
    pub fn from_terms(terms: &LoanTerms, config: &MarketConfig) -> Self {
        let factor = config.interest_rate_factor;
        TermsView {
            duration: terms.duration,
            interest_rate_remuneratory: rate_to_decimal(terms.interest_rate_remuneratory, factor),
            interest_rate_moratory: rate_to_decimal(terms.interest_rate_moratory, factor),
            late_fee_rate: rate_to_decimal(terms.late_fee_rate, factor),
        }
    }
}

impl SubLoanView {
    pub fn from_sub_loan(sub_loan: &SubLoan, config: &MarketConfig) -> Result<Self> {
        Ok(SubLoanView {
            id: sub_loan.id,
            program_id: sub_loan.program_id,
            borrower: sub_loan.borrower,
            status: sub_loan.status,
            installment: InstallmentView {
                first_sub_loan_id: sub_loan.first_sub_loan_id,
                sub_loan_count: sub_loan.sub_loan_count,
            },
            origination: OriginationView {
                start_timestamp: sub_loan.start_timestamp,
                borrowed_amount: sub_loan.borrowed_amount,
                addon_amount: sub_loan.addon_amount,
                initial_terms: TermsView::from_terms(&sub_loan.initial_terms, config),
            },
            terms: TermsView::from_terms(&sub_loan.terms, config),
            balances: BalancesView {
                tracked: sub_loan.tracked,
                repaid: sub_loan.repaid,
                discount: sub_loan.discount,
                tracked_balance: sub_loan.tracked_balance()?,
                outstanding_balance: sub_loan.outstanding_balance(config.accuracy_factor)?,
            },
            tracking: TrackingView {
                tracked_timestamp: sub_loan.tracked_timestamp,
                freeze_timestamp: sub_loan.freeze_timestamp,
                due_period: sub_loan.due_period(config),
                operation_count: sub_loan.operations.len(),
                earliest_operation_id: sub_loan.operations.earliest_operation_id(),
                latest_operation_id: sub_loan.operations.latest_operation_id(),
                past_operation_id: sub_loan.operations.past_operation_id(),
            },
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// serializable view of one operation with its chain neighbours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationView {
    pub id: OperationId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub timestamp: Timestamp,
    pub input_value: u64,
    pub applied_value: u64,
    pub account: AccountId,
    pub prev_operation_id: Option<OperationId>,
    pub next_operation_id: Option<OperationId>,
}

impl OperationView {
    pub fn from_operation(sub_loan: &SubLoan, operation: &Operation) -> Self {
        OperationView {
            id: operation.id,
            kind: operation.kind,
            status: operation.status,
            timestamp: operation.timestamp,
            input_value: operation.input_value,
            applied_value: operation.applied_value,
            account: operation.account,
            prev_operation_id: sub_loan.operations.prev_operation_id(operation.id),
            next_operation_id: sub_loan.operations.next_operation_id(operation.id),
        }
    }

    /// every operation of a sub-loan in timestamp order
    pub fn list(sub_loan: &SubLoan) -> Vec<OperationView> {
        sub_loan
            .operations
            .iter()
            .map(|operation| OperationView::from_operation(sub_loan, operation))
            .collect()
    }
}

/// loan preview with the outstanding balance also rendered in token units
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanPreviewView {
    pub preview: LoanPreview,
    pub outstanding_balance: Decimal,
    pub token_decimals: u32,
}

impl LoanPreviewView {
    pub fn new(preview: LoanPreview, token_decimals: u32) -> Result<Self> {
        Ok(LoanPreviewView {
            outstanding_balance: amount_to_decimal(preview.outstanding_balance, token_decimals)?,
            preview,
            token_decimals,
        })
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
