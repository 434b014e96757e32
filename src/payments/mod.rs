pub mod waterfall;

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, SubLoanId};

pub use waterfall::{BalanceComponent, SettlementKind, SettlementResult, SettlementWaterfall};

/// repayment request, `amount == AMOUNT_MAX` settles everything owed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentRequest {
    pub sub_loan_id: SubLoanId,
    pub amount: u64,
    pub repayer: AccountId,
}

/// discount request, forgives interest and fees up to `amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRequest {
    pub sub_loan_id: SubLoanId,
    pub amount: u64,
}
