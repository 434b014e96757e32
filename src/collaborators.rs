use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{LendingError, Result};
use crate::types::{AccountId, LoanTerms, SubLoanId};

/// risk policy of a program
pub trait CreditLine {
    /// terms for a new sub-loan of `amount` running `duration` periods
    fn determine_loan_terms(
        &self,
        borrower: &AccountId,
        amount: u64,
        duration: u16,
    ) -> Result<LoanTerms>;

    /// called once per sub-loan before funds leave the pool
    fn on_before_loan_taken(
        &mut self,
        sub_loan_id: SubLoanId,
        borrower: &AccountId,
        amount: u64,
    ) -> Result<()>;

    /// called after a repayment reached the pool
    fn on_after_loan_payment(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;

    /// called after a sub-loan was revoked and settled with the pool
    fn on_after_loan_revocation(&mut self, sub_loan_id: SubLoanId) -> Result<()>;

    // compensations, called in reverse order when a later side effect of
    // the same batch fails

    fn revert_loan_taken(
        &mut self,
        sub_loan_id: SubLoanId,
        borrower: &AccountId,
        amount: u64,
    ) -> Result<()>;

    fn revert_loan_payment(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;

    fn revert_loan_revocation(&mut self, sub_loan_id: SubLoanId) -> Result<()>;
}

/// custody of a program's funds
pub trait LiquidityPool {
    /// account the pool's tokens are held in
    fn account(&self) -> AccountId;

    fn on_before_liquidity_out(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;

    fn on_after_liquidity_in(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;

    fn revert_liquidity_out(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;

    fn revert_liquidity_in(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()>;
}

/// token movement between accounts
pub trait TokenMover {
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u64) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure(collaborator: &str, message: String) -> LendingError {
    LendingError::Collaborator {
        collaborator: collaborator.to_string(),
        message,
    }
}

/// hook invocation recorded by the reference collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    LoanTaken { sub_loan_id: SubLoanId, borrower: AccountId, amount: u64 },
    LoanPayment { sub_loan_id: SubLoanId, amount: u64 },
    LoanRevocation { sub_loan_id: SubLoanId },
    LiquidityOut { sub_loan_id: SubLoanId, amount: u64 },
    LiquidityIn { sub_loan_id: SubLoanId, amount: u64 },
}

#[derive(Debug, Default)]
struct HookLog {
    calls: Vec<HookCall>,
    failing: bool,
}

impl HookLog {
    fn record(&mut self, collaborator: &str, call: HookCall) -> Result<()> {
        if self.failing {
            return Err(failure(collaborator, format!("rejected {:?}", call)));
        }
        self.calls.push(call);
        Ok(())
    }

    // compensations ignore the failure switch
    fn forget(&mut self, collaborator: &str, call: HookCall) -> Result<()> {
        let position = self
            .calls
            .iter()
            .rposition(|recorded| *recorded == call)
            .ok_or_else(|| failure(collaborator, format!("nothing to revert for {:?}", call)))?;
        self.calls.remove(position);
        Ok(())
    }
}

/// credit line handing out the same rates to everyone
///
/// Clones share the same call log, so a test can keep a handle after the
/// credit line was registered with a market.
#[derive(Debug, Clone)]
pub struct FixedTermsCreditLine {
    interest_rate_remuneratory: u32,
    interest_rate_moratory: u32,
    late_fee_rate: u32,
    log: Arc<Mutex<HookLog>>,
}

impl FixedTermsCreditLine {
    pub fn new(
        interest_rate_remuneratory: u32,
        interest_rate_moratory: u32,
        late_fee_rate: u32,
    ) -> Self {
        Self {
            interest_rate_remuneratory,
            interest_rate_moratory,
            late_fee_rate,
            log: Arc::new(Mutex::new(HookLog::default())),
        }
    }

    /// make every hook fail until switched back
    pub fn set_failing(&self, failing: bool) {
        lock(&self.log).failing = failing;
    }

    pub fn calls(&self) -> Vec<HookCall> {
        lock(&self.log).calls.clone()
    }

    fn record(&self, call: HookCall) -> Result<()> {
        lock(&self.log).record("credit line", call)
    }

    fn forget(&self, call: HookCall) -> Result<()> {
        lock(&self.log).forget("credit line", call)
    }
}

impl CreditLine for FixedTermsCreditLine {
    fn determine_loan_terms(
        &self,
        _borrower: &AccountId,
        _amount: u64,
        duration: u16,
    ) -> Result<LoanTerms> {
        Ok(LoanTerms {
            duration,
            interest_rate_remuneratory: self.interest_rate_remuneratory,
            interest_rate_moratory: self.interest_rate_moratory,
            late_fee_rate: self.late_fee_rate,
        })
    }

    fn on_before_loan_taken(
        &mut self,
        sub_loan_id: SubLoanId,
        borrower: &AccountId,
        amount: u64,
    ) -> Result<()> {
        self.record(HookCall::LoanTaken {
            sub_loan_id,
            borrower: *borrower,
            amount,
        })
    }

    fn on_after_loan_payment(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.record(HookCall::LoanPayment {
            sub_loan_id,
            amount,
        })
    }

    fn on_after_loan_revocation(&mut self, sub_loan_id: SubLoanId) -> Result<()> {
        self.record(HookCall::LoanRevocation { sub_loan_id })
    }

    fn revert_loan_taken(
        &mut self,
        sub_loan_id: SubLoanId,
        borrower: &AccountId,
        amount: u64,
    ) -> Result<()> {
        self.forget(HookCall::LoanTaken {
            sub_loan_id,
            borrower: *borrower,
            amount,
        })
    }

    fn revert_loan_payment(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.forget(HookCall::LoanPayment {
            sub_loan_id,
            amount,
        })
    }

    fn revert_loan_revocation(&mut self, sub_loan_id: SubLoanId) -> Result<()> {
        self.forget(HookCall::LoanRevocation { sub_loan_id })
    }
}

/// liquidity pool that only records its hooks
#[derive(Debug, Clone)]
pub struct RecordingLiquidityPool {
    account: AccountId,
    log: Arc<Mutex<HookLog>>,
}

impl RecordingLiquidityPool {
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            log: Arc::new(Mutex::new(HookLog::default())),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        lock(&self.log).failing = failing;
    }

    pub fn calls(&self) -> Vec<HookCall> {
        lock(&self.log).calls.clone()
    }

    /// liquidity in minus liquidity out, as seen through the hooks
    pub fn net_inflow(&self) -> i128 {
        lock(&self.log)
            .calls
            .iter()
            .map(|call| match call {
                HookCall::LiquidityIn { amount, .. } => *amount as i128,
                HookCall::LiquidityOut { amount, .. } => -(*amount as i128),
                _ => 0,
            })
            .sum()
    }

    fn record(&self, call: HookCall) -> Result<()> {
        lock(&self.log).record("liquidity pool", call)
    }

    fn forget(&self, call: HookCall) -> Result<()> {
        lock(&self.log).forget("liquidity pool", call)
    }
}

impl LiquidityPool for RecordingLiquidityPool {
    fn account(&self) -> AccountId {
        self.account
    }

    fn on_before_liquidity_out(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.record(HookCall::LiquidityOut {
            sub_loan_id,
            amount,
        })
    }

    fn on_after_liquidity_in(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.record(HookCall::LiquidityIn {
            sub_loan_id,
            amount,
        })
    }

    fn revert_liquidity_out(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.forget(HookCall::LiquidityOut {
            sub_loan_id,
            amount,
        })
    }

    fn revert_liquidity_in(&mut self, sub_loan_id: SubLoanId, amount: u64) -> Result<()> {
        self.forget(HookCall::LiquidityIn {
            sub_loan_id,
            amount,
        })
    }
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<AccountId, u64>,
    failing: bool,
}

/// token balances kept in memory, transfers fail on insufficient funds
#[derive(Debug, Clone, Default)]
pub struct InMemoryToken {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, account: &AccountId, amount: u64) {
        let mut ledger = lock(&self.ledger);
        let balance = ledger.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &AccountId) -> u64 {
        lock(&self.ledger).balances.get(account).copied().unwrap_or(0)
    }

    pub fn set_failing(&self, failing: bool) {
        lock(&self.ledger).failing = failing;
    }
}

impl TokenMover for InMemoryToken {
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u64) -> Result<()> {
        let mut ledger = lock(&self.ledger);
        if ledger.failing {
            return Err(failure("token", "transfers are disabled".to_string()));
        }
        let available = ledger.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(failure(
                "token",
                format!("insufficient balance: {} < {}", available, amount),
            ));
        }
        ledger.balances.insert(*from, available - amount);
        let credited = ledger.balances.entry(*to).or_insert(0);
        *credited = credited
            .checked_add(amount)
            .ok_or(LendingError::overflow("token balance"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_token_transfer() {
        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);
        let mut token = InMemoryToken::new();
        token.mint(&alice, 100);

        token.transfer(&alice, &bob, 60).unwrap();
        assert_eq!(token.balance_of(&alice), 40);
        assert_eq!(token.balance_of(&bob), 60);

        assert!(matches!(
            token.transfer(&alice, &bob, 41),
            Err(LendingError::Collaborator { .. })
        ));
        assert_eq!(token.balance_of(&alice), 40);
    }

    #[test]
    fn test_shared_handles() {
        let pool = RecordingLiquidityPool::new(Uuid::from_u128(9));
        let mut registered = pool.clone();

        registered.on_before_liquidity_out(1, 500).unwrap();
        registered.on_after_liquidity_in(1, 200).unwrap();
        assert_eq!(pool.calls().len(), 2);
        assert_eq!(pool.net_inflow(), -300);

        pool.set_failing(true);
        assert!(registered.on_after_liquidity_in(1, 1).is_err());
        assert_eq!(pool.calls().len(), 2);
    }

    #[test]
    fn test_revert_removes_latest_matching_call() {
        let credit_line = FixedTermsCreditLine::new(10_000_000, 20_000_000, 1_000_000);
        let mut registered = credit_line.clone();
        registered.on_after_loan_payment(1, 500).unwrap();
        registered.on_after_loan_payment(2, 300).unwrap();
        registered.on_after_loan_payment(1, 500).unwrap();

        credit_line.set_failing(true);
        registered.revert_loan_payment(1, 500).unwrap();
        assert_eq!(
            credit_line.calls(),
            vec![
                HookCall::LoanPayment {
                    sub_loan_id: 1,
                    amount: 500
                },
                HookCall::LoanPayment {
                    sub_loan_id: 2,
                    amount: 300
                },
            ]
        );
        assert!(matches!(
            registered.revert_loan_revocation(1),
            Err(LendingError::Collaborator { .. })
        ));
    }

    #[test]
    fn test_fixed_terms() {
        let credit_line = FixedTermsCreditLine::new(10_000_000, 20_000_000, 1_000_000);
        let terms = credit_line
            .determine_loan_terms(&Uuid::from_u128(1), 100_000, 30)
            .unwrap();
        assert_eq!(terms.duration, 30);
        assert_eq!(terms.interest_rate_moratory, 20_000_000);
    }
}
