use std::collections::{BTreeMap, BTreeSet};

use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::collaborators::{CreditLine, LiquidityPool, TokenMover};
use crate::config::{to_timestamp, MarketConfig};
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::operations::{AddOperationRequest, OperationEngine, VoidOperationRequest};
use crate::payments::{DiscountRequest, RepaymentRequest};
use crate::preview::{LoanPreview, SubLoanPreview};
use crate::serialization::{OperationView, SubLoanView};
use crate::state::{NewSubLoan, SubLoan};
use crate::types::{
    ensure_width, is_zero_account, AccountId, OperationId, OperationKind, OperationStatus,
    ProgramId, SubLoanId, SubLoanStatus, Timestamp, ACCUMULATOR_MAX,
};

/// credit line and liquidity pool pair loans are taken against
pub struct Program {
    pub id: ProgramId,
    credit_line: Box<dyn CreditLine>,
    liquidity_pool: Box<dyn LiquidityPool>,
}

impl Program {
    pub fn pool_account(&self) -> AccountId {
        self.liquidity_pool.account()
    }
}

/// external call planned by a batch, executed before the batch commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u64,
    },
    BeforeLoanTaken {
        program_id: ProgramId,
        sub_loan_id: SubLoanId,
        borrower: AccountId,
        amount: u64,
    },
    BeforeLiquidityOut {
        program_id: ProgramId,
        sub_loan_id: SubLoanId,
        amount: u64,
    },
    AfterLiquidityIn {
        program_id: ProgramId,
        sub_loan_id: SubLoanId,
        amount: u64,
    },
    AfterLoanPayment {
        program_id: ProgramId,
        sub_loan_id: SubLoanId,
        amount: u64,
    },
    AfterLoanRevocation {
        program_id: ProgramId,
        sub_loan_id: SubLoanId,
    },
}

// what a staged sub-loan looked like before the batch touched it
struct Baseline {
    status: SubLoanStatus,
    repayments: BTreeMap<OperationId, u64>,
}

impl Baseline {
    fn capture(sub_loan: &SubLoan) -> Self {
        Self {
            status: sub_loan.status,
            repayments: applied_repayments(sub_loan),
        }
    }
}

fn applied_repayments(sub_loan: &SubLoan) -> BTreeMap<OperationId, u64> {
    sub_loan
        .operations
        .iter()
        .filter(|operation| {
            operation.kind == OperationKind::Repayment
                && operation.status == OperationStatus::Applied
        })
        .map(|operation| (operation.id, operation.applied_value))
        .collect()
}

/// working copies of every sub-loan a batch touches
#[derive(Default)]
struct Batch {
    staged: BTreeMap<SubLoanId, SubLoan>,
    baselines: BTreeMap<SubLoanId, Baseline>,
    replay: BTreeSet<SubLoanId>,
    events: EventStore,
}

impl Batch {
    fn stage(
        &mut self,
        stored: &BTreeMap<SubLoanId, SubLoan>,
        id: SubLoanId,
    ) -> Result<(&mut SubLoan, &mut EventStore)> {
        if !self.staged.contains_key(&id) {
            let sub_loan = stored.get(&id).ok_or(LendingError::SubLoanNotFound { id })?;
            self.baselines.insert(id, Baseline::capture(sub_loan));
            self.staged.insert(id, sub_loan.clone());
        }
        let sub_loan = self
            .staged
            .get_mut(&id)
            .ok_or(LendingError::SubLoanNotFound { id })?;
        Ok((sub_loan, &mut self.events))
    }
}

/// lending market: owns sub-loans and programs, runs every mutation as an
/// all-or-nothing batch
pub struct LendingMarket {
    config: MarketConfig,
    engine: OperationEngine,
    programs: BTreeMap<ProgramId, Program>,
    sub_loans: BTreeMap<SubLoanId, SubLoan>,
    token: Box<dyn TokenMover>,
    next_sub_loan_id: SubLoanId,
    next_program_id: ProgramId,
    events: EventStore,
}

impl LendingMarket {
    pub fn new(config: MarketConfig, token: Box<dyn TokenMover>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: OperationEngine::new(config.clone()),
            config,
            programs: BTreeMap::new(),
            sub_loans: BTreeMap::new(),
            token,
            next_sub_loan_id: 1,
            next_program_id: 1,
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// register a credit line / liquidity pool pair
    pub fn register_program(
        &mut self,
        credit_line: Box<dyn CreditLine>,
        liquidity_pool: Box<dyn LiquidityPool>,
    ) -> Result<ProgramId> {
        let pool_account = liquidity_pool.account();
        if is_zero_account(&pool_account) {
            return Err(LendingError::ZeroAccount {
                role: "liquidity pool".to_string(),
            });
        }
        let program_id = self.next_program_id;
        self.next_program_id = program_id
            .checked_add(1)
            .ok_or(LendingError::overflow("program id counter"))?;
        self.programs.insert(
            program_id,
            Program {
                id: program_id,
                credit_line,
                liquidity_pool,
            },
        );
        self.events.emit(Event::ProgramRegistered {
            program_id,
            pool_account,
        });
        info!(program_id, %pool_account, "program registered");
        Ok(program_id)
    }

    /// take a loan of one or more installments; returns the first sub-loan id
    #[instrument(
        name = "market.take_loan",
        skip(self, amounts, addons, durations, time),
        fields(installments = amounts.len()),
        err
    )]
    pub fn take_loan(
        &mut self,
        borrower: AccountId,
        program_id: ProgramId,
        amounts: &[u64],
        addons: &[u64],
        durations: &[u32],
        time: &SafeTimeProvider,
    ) -> Result<SubLoanId> {
        if is_zero_account(&borrower) {
            return Err(LendingError::ZeroAccount {
                role: "borrower".to_string(),
            });
        }
        if amounts.is_empty() {
            return Err(LendingError::EmptyBatch);
        }
        if amounts.len() != addons.len() || amounts.len() != durations.len() {
            return Err(LendingError::ArrayLengthMismatch {
                details: format!(
                    "{} amounts, {} addons, {} durations",
                    amounts.len(),
                    addons.len(),
                    durations.len()
                ),
            });
        }
        let count = u16::try_from(amounts.len()).map_err(|_| LendingError::ValueOutOfRange {
            field: "installment count".to_string(),
            value: amounts.len() as u64,
            max: u16::MAX as u64,
        })?;
        for duration in durations {
            ensure_width("duration", *duration as u64, u16::MAX as u64)?;
        }
        if durations.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(LendingError::DurationsNotAscending);
        }
        for (amount, addon) in amounts.iter().zip(addons) {
            if *amount == 0 {
                return Err(LendingError::ZeroAmount {
                    field: "borrowed amount".to_string(),
                });
            }
            let principal = amount
                .checked_add(*addon)
                .ok_or(LendingError::overflow("borrowed plus addon amount"))?;
            ensure_width("borrowed plus addon amount", principal, ACCUMULATOR_MAX)?;
        }

        let program = self
            .programs
            .get(&program_id)
            .ok_or(LendingError::ProgramNotFound { id: program_id })?;
        let pool_account = program.pool_account();
        let now = current_timestamp(time)?;
        let first_sub_loan_id = self.next_sub_loan_id;
        let next_sub_loan_id = first_sub_loan_id
            .checked_add(count as u64)
            .ok_or(LendingError::overflow("sub-loan id counter"))?;

        let mut sub_loans = Vec::with_capacity(amounts.len());
        let mut effects = Vec::new();
        let mut events = EventStore::new();
        for (index, ((amount, addon), duration)) in
            amounts.iter().zip(addons).zip(durations).enumerate()
        {
            let sub_loan_id = first_sub_loan_id + index as u64;
            // width checked above
            let duration = *duration as u16;
            let terms = program
                .credit_line
                .determine_loan_terms(&borrower, *amount, duration)?;
            let sub_loan = SubLoan::originate(NewSubLoan {
                id: sub_loan_id,
                program_id,
                borrower,
                first_sub_loan_id,
                sub_loan_count: count,
                start_timestamp: now,
                borrowed_amount: *amount,
                addon_amount: *addon,
                terms,
            })?;

            effects.push(SideEffect::BeforeLoanTaken {
                program_id,
                sub_loan_id,
                borrower,
                amount: *amount,
            });
            effects.push(SideEffect::BeforeLiquidityOut {
                program_id,
                sub_loan_id,
                amount: *amount,
            });
            effects.push(SideEffect::Transfer {
                from: pool_account,
                to: borrower,
                amount: *amount,
            });
            events.emit(Event::SubLoanTaken {
                sub_loan_id,
                program_id,
                borrower,
                borrowed_amount: *amount,
                addon_amount: *addon,
                duration: terms.duration,
                timestamp: now,
            });
            sub_loans.push(sub_loan);
        }
        let total_borrowed = amounts
            .iter()
            .try_fold(0u64, |total, amount| total.checked_add(*amount))
            .ok_or(LendingError::overflow("total borrowed"))?;
        events.emit(Event::LoanTaken {
            first_sub_loan_id,
            sub_loan_count: count,
            borrower,
            total_borrowed,
            timestamp: now,
        });

        self.execute(&effects)?;

        self.next_sub_loan_id = next_sub_loan_id;
        for sub_loan in sub_loans {
            self.sub_loans.insert(sub_loan.id, sub_loan);
        }
        self.events.extend(events);
        info!(first_sub_loan_id, count, total_borrowed, "loan taken");
        Ok(first_sub_loan_id)
    }

    /// repay sub-loans at the current time
    #[instrument(
        name = "market.repay_sub_loan_batch",
        skip(self, requests, time),
        fields(requests = requests.len()),
        err
    )]
    pub fn repay_sub_loan_batch(
        &mut self,
        requests: &[RepaymentRequest],
        time: &SafeTimeProvider,
    ) -> Result<()> {
        if requests.is_empty() {
            return Err(LendingError::EmptyBatch);
        }
        let now = current_timestamp(time)?;
        let mut batch = Batch::default();
        for request in requests {
            let (sub_loan, events) = batch.stage(&self.sub_loans, request.sub_loan_id)?;
            let (_, needs_replay) = self.engine.add_operation(
                sub_loan,
                OperationKind::Repayment,
                now,
                request.amount,
                request.repayer,
                now,
                events,
            )?;
            if needs_replay {
                batch.replay.insert(request.sub_loan_id);
            }
        }
        self.commit(batch, now)
    }

    /// discount sub-loans at the current time
    #[instrument(
        name = "market.discount_sub_loan_batch",
        skip(self, requests, time),
        fields(requests = requests.len()),
        err
    )]
    pub fn discount_sub_loan_batch(
        &mut self,
        requests: &[DiscountRequest],
        time: &SafeTimeProvider,
    ) -> Result<()> {
        if requests.is_empty() {
            return Err(LendingError::EmptyBatch);
        }
        let now = current_timestamp(time)?;
        let mut batch = Batch::default();
        for request in requests {
            let (sub_loan, events) = batch.stage(&self.sub_loans, request.sub_loan_id)?;
            let (_, needs_replay) = self.engine.add_operation(
                sub_loan,
                OperationKind::Discounting,
                now,
                request.amount,
                Uuid::nil(),
                now,
                events,
            )?;
            if needs_replay {
                batch.replay.insert(request.sub_loan_id);
            }
        }
        self.commit(batch, now)
    }

    /// revoke every ongoing member of the loan `sub_loan_id` belongs to
    #[instrument(name = "market.revoke_loan", skip(self, time), err)]
    pub fn revoke_loan(&mut self, sub_loan_id: SubLoanId, time: &SafeTimeProvider) -> Result<()> {
        let sub_loan = self.sub_loan(sub_loan_id)?;
        if sub_loan.status == SubLoanStatus::Revoked {
            return Err(LendingError::SubLoanRevoked { id: sub_loan_id });
        }
        let members: Vec<SubLoanId> = sub_loan
            .group_ids()
            .filter(|id| {
                self.sub_loans
                    .get(id)
                    .map_or(false, |member| member.status == SubLoanStatus::Ongoing)
            })
            .collect();
        if members.is_empty() {
            return Err(LendingError::SubLoanNotOngoing {
                id: sub_loan_id,
                status: sub_loan.status,
            });
        }

        let now = current_timestamp(time)?;
        let mut batch = Batch::default();
        for id in members {
            let (sub_loan, events) = batch.stage(&self.sub_loans, id)?;
            let (_, needs_replay) = self.engine.add_operation(
                sub_loan,
                OperationKind::Revocation,
                now,
                0,
                Uuid::nil(),
                now,
                events,
            )?;
            if needs_replay {
                batch.replay.insert(id);
            }
        }
        self.commit(batch, now)
    }

    /// void operations, then add new ones, as one batch
    #[instrument(
        name = "market.modify_operation_batch",
        skip(self, voids, adds, time),
        fields(voids = voids.len(), adds = adds.len()),
        err
    )]
    pub fn modify_operation_batch(
        &mut self,
        voids: &[VoidOperationRequest],
        adds: &[AddOperationRequest],
        time: &SafeTimeProvider,
    ) -> Result<()> {
        if voids.is_empty() && adds.is_empty() {
            return Err(LendingError::EmptyBatch);
        }
        let now = current_timestamp(time)?;
        let mut batch = Batch::default();

        for request in voids {
            let (sub_loan, events) = batch.stage(&self.sub_loans, request.sub_loan_id)?;
            if self
                .engine
                .void_operation(sub_loan, request.operation_id, events)?
            {
                // rebuild now so later adds see the corrected status
                self.engine.replay(sub_loan, now, events)?;
            }
        }
        for request in adds {
            let (sub_loan, events) = batch.stage(&self.sub_loans, request.sub_loan_id)?;
            let (_, needs_replay) = self.engine.add_operation(
                sub_loan,
                request.kind,
                request.timestamp,
                request.input_value,
                request.account,
                now,
                events,
            )?;
            if needs_replay {
                batch.replay.insert(request.sub_loan_id);
            }
        }
        self.commit(batch, now)
    }

    /// apply operations whose timestamps have been reached
    #[instrument(name = "market.process_sub_loan_batch", skip(self, time), err)]
    pub fn process_sub_loan_batch(
        &mut self,
        ids: &[SubLoanId],
        time: &SafeTimeProvider,
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(LendingError::EmptyBatch);
        }
        let now = current_timestamp(time)?;
        let mut batch = Batch::default();
        for id in ids {
            batch.stage(&self.sub_loans, *id)?;
        }
        self.commit(batch, now)
    }

    pub fn sub_loan(&self, id: SubLoanId) -> Result<&SubLoan> {
        self.sub_loans
            .get(&id)
            .ok_or(LendingError::SubLoanNotFound { id })
    }

    pub fn get_sub_loan_state(&self, ids: &[SubLoanId]) -> Result<Vec<SubLoanView>> {
        ids.iter()
            .map(|id| SubLoanView::from_sub_loan(self.sub_loan(*id)?, &self.config))
            .collect()
    }

    pub fn get_sub_loan_operations(&self, id: SubLoanId) -> Result<Vec<OperationView>> {
        Ok(OperationView::list(self.sub_loan(id)?))
    }

    /// project one sub-loan to `timestamp` (0 means now) without storing anything
    pub fn get_sub_loan_preview(
        &self,
        id: SubLoanId,
        timestamp: Timestamp,
        time: &SafeTimeProvider,
    ) -> Result<SubLoanPreview> {
        let timestamp = resolve_timestamp(timestamp, time)?;
        SubLoanPreview::project(self.sub_loan(id)?, timestamp, self.engine.accrual())
    }

    /// project the whole installment group of `sub_loan_id`
    pub fn get_loan_preview(
        &self,
        sub_loan_id: SubLoanId,
        timestamp: Timestamp,
        time: &SafeTimeProvider,
    ) -> Result<LoanPreview> {
        let timestamp = resolve_timestamp(timestamp, time)?;
        let members = self
            .sub_loan(sub_loan_id)?
            .group_ids()
            .map(|id| {
                SubLoanPreview::project(self.sub_loan(id)?, timestamp, self.engine.accrual())
            })
            .collect::<Result<Vec<_>>>()?;
        LoanPreview::aggregate(members)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn program(&self, id: ProgramId) -> Result<&Program> {
        self.programs
            .get(&id)
            .ok_or(LendingError::ProgramNotFound { id })
    }

    fn program_mut(&mut self, id: ProgramId) -> Result<&mut Program> {
        self.programs
            .get_mut(&id)
            .ok_or(LendingError::ProgramNotFound { id })
    }

    // process staged sub-loans, settle with collaborators, then store
    fn commit(&mut self, batch: Batch, now: Timestamp) -> Result<()> {
        let Batch {
            mut staged,
            baselines,
            replay,
            mut events,
        } = batch;

        for (id, sub_loan) in staged.iter_mut() {
            if replay.contains(id) {
                self.engine.replay(sub_loan, now, &mut events)?;
            } else {
                self.engine.process(sub_loan, now, &mut events)?;
            }
        }

        let mut effects = Vec::new();
        for (id, sub_loan) in &staged {
            let baseline = baselines
                .get(id)
                .ok_or(LendingError::SubLoanNotFound { id: *id })?;
            effects.extend(self.plan_settlement(sub_loan, baseline, now, &mut events)?);
        }

        self.execute(&effects)?;

        debug!(
            sub_loans = staged.len(),
            side_effects = effects.len(),
            "batch committed"
        );
        self.sub_loans.extend(staged);
        self.events.extend(events);
        Ok(())
    }

    // side effects follow from how the sub-loan changed, not from the request
    fn plan_settlement(
        &self,
        sub_loan: &SubLoan,
        baseline: &Baseline,
        now: Timestamp,
        events: &mut EventStore,
    ) -> Result<Vec<SideEffect>> {
        let program_id = sub_loan.program_id;
        let sub_loan_id = sub_loan.id;
        let pool_account = self.program(program_id)?.pool_account();
        let mut effects = Vec::new();

        for operation in sub_loan.operations.iter() {
            if operation.kind != OperationKind::Repayment {
                continue;
            }
            let before = baseline.repayments.get(&operation.id).copied().unwrap_or(0);
            let after = if operation.status == OperationStatus::Applied {
                operation.applied_value
            } else {
                0
            };

            if after > before {
                let amount = after - before;
                effects.push(SideEffect::Transfer {
                    from: operation.account,
                    to: pool_account,
                    amount,
                });
                effects.push(SideEffect::AfterLiquidityIn {
                    program_id,
                    sub_loan_id,
                    amount,
                });
                effects.push(SideEffect::AfterLoanPayment {
                    program_id,
                    sub_loan_id,
                    amount,
                });
                events.emit(Event::SubLoanRepaid {
                    sub_loan_id,
                    operation_id: operation.id,
                    repayer: operation.account,
                    amount,
                    timestamp: operation.timestamp,
                });
            } else if after < before {
                let amount = before - after;
                effects.push(SideEffect::BeforeLiquidityOut {
                    program_id,
                    sub_loan_id,
                    amount,
                });
                effects.push(SideEffect::Transfer {
                    from: pool_account,
                    to: operation.account,
                    amount,
                });
                events.emit(Event::RepaymentReversed {
                    sub_loan_id,
                    operation_id: operation.id,
                    repayer: operation.account,
                    amount,
                });
            }
        }

        if sub_loan.status == SubLoanStatus::Revoked && baseline.status != SubLoanStatus::Revoked {
            let repaid = sub_loan.operations.applied_total(OperationKind::Repayment);
            let borrowed = sub_loan.borrowed_amount;
            if repaid < borrowed {
                let amount = borrowed - repaid;
                effects.push(SideEffect::Transfer {
                    from: sub_loan.borrower,
                    to: pool_account,
                    amount,
                });
                effects.push(SideEffect::AfterLiquidityIn {
                    program_id,
                    sub_loan_id,
                    amount,
                });
            } else if repaid > borrowed {
                let amount = repaid - borrowed;
                effects.push(SideEffect::BeforeLiquidityOut {
                    program_id,
                    sub_loan_id,
                    amount,
                });
                effects.push(SideEffect::Transfer {
                    from: pool_account,
                    to: sub_loan.borrower,
                    amount,
                });
            }
            effects.push(SideEffect::AfterLoanRevocation {
                program_id,
                sub_loan_id,
            });
        }

        if sub_loan.status != baseline.status {
            events.emit(Event::SubLoanStatusChanged {
                sub_loan_id,
                old_status: baseline.status,
                new_status: sub_loan.status,
                timestamp: now,
            });
        }
        Ok(effects)
    }

    /// run side effects in plan order, reverting performed ones if any fails
    fn execute(&mut self, effects: &[SideEffect]) -> Result<()> {
        for (index, effect) in effects.iter().enumerate() {
            if let Err(error) = self.perform(effect) {
                warn!(?effect, %error, "side effect failed, compensating");
                self.compensate(&effects[..index]);
                return Err(error);
            }
        }
        Ok(())
    }

    fn perform(&mut self, effect: &SideEffect) -> Result<()> {
        match effect {
            SideEffect::Transfer { from, to, amount } => {
                if *amount > 0 {
                    self.token.transfer(from, to, *amount)?;
                }
                Ok(())
            }
            SideEffect::BeforeLoanTaken {
                program_id,
                sub_loan_id,
                borrower,
                amount,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .on_before_loan_taken(*sub_loan_id, borrower, *amount),
            SideEffect::BeforeLiquidityOut {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .liquidity_pool
                .on_before_liquidity_out(*sub_loan_id, *amount),
            SideEffect::AfterLiquidityIn {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .liquidity_pool
                .on_after_liquidity_in(*sub_loan_id, *amount),
            SideEffect::AfterLoanPayment {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .on_after_loan_payment(*sub_loan_id, *amount),
            SideEffect::AfterLoanRevocation {
                program_id,
                sub_loan_id,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .on_after_loan_revocation(*sub_loan_id),
        }
    }

    // undo already performed effects, latest first
    fn compensate(&mut self, performed: &[SideEffect]) {
        for effect in performed.iter().rev() {
            if let Err(error) = self.revert(effect) {
                warn!(?effect, %error, "side effect could not be reverted");
            }
        }
    }

    fn revert(&mut self, effect: &SideEffect) -> Result<()> {
        match effect {
            SideEffect::Transfer { from, to, amount } => {
                if *amount > 0 {
                    self.token.transfer(to, from, *amount)?;
                }
                Ok(())
            }
            SideEffect::BeforeLoanTaken {
                program_id,
                sub_loan_id,
                borrower,
                amount,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .revert_loan_taken(*sub_loan_id, borrower, *amount),
            SideEffect::BeforeLiquidityOut {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .liquidity_pool
                .revert_liquidity_out(*sub_loan_id, *amount),
            SideEffect::AfterLiquidityIn {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .liquidity_pool
                .revert_liquidity_in(*sub_loan_id, *amount),
            SideEffect::AfterLoanPayment {
                program_id,
                sub_loan_id,
                amount,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .revert_loan_payment(*sub_loan_id, *amount),
            SideEffect::AfterLoanRevocation {
                program_id,
                sub_loan_id,
            } => self
                .program_mut(*program_id)?
                .credit_line
                .revert_loan_revocation(*sub_loan_id),
        }
    }
}

fn current_timestamp(time: &SafeTimeProvider) -> Result<Timestamp> {
    to_timestamp(time.now())
}

fn resolve_timestamp(timestamp: Timestamp, time: &SafeTimeProvider) -> Result<Timestamp> {
    if timestamp == 0 {
        current_timestamp(time)
    } else {
        Ok(timestamp)
    }
}
