use tracing::debug;

use crate::config::MarketConfig;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::interest::{AccrualEngine, AccrualOutcome};
use crate::payments::{SettlementKind, SettlementWaterfall};
use crate::state::SubLoan;
use crate::types::{
    AccountId, ComponentAmounts, OperationId, OperationKind, OperationStatus, SubLoanStatus,
    Timestamp,
};

use super::{validate_operation, Operation};

/// what a processing walk did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    /// operations applied during the walk
    pub applied: usize,
    /// operations still waiting for their timestamp
    pub pending: usize,
    pub replayed: bool,
}

/// drives a sub-loan's operation log: insertion, voiding, processing, replay
#[derive(Debug, Clone)]
pub struct OperationEngine {
    config: MarketConfig,
    accrual: AccrualEngine,
    waterfall: SettlementWaterfall,
}

impl OperationEngine {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            accrual: AccrualEngine::new(config.clone()),
            waterfall: SettlementWaterfall::new(config.accuracy_factor),
            config,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn accrual(&self) -> &AccrualEngine {
        &self.accrual
    }

    /// validate and insert a pending operation
    ///
    /// Returns the new id and whether the sub-loan must be replayed because
    /// the operation landed behind already processed history.
    #[allow(clippy::too_many_arguments)]
    pub fn add_operation(
        &self,
        sub_loan: &mut SubLoan,
        kind: OperationKind,
        timestamp: Timestamp,
        input_value: u64,
        account: AccountId,
        now: Timestamp,
        events: &mut EventStore,
    ) -> Result<(OperationId, bool)> {
        sub_loan.ensure_ongoing()?;
        validate_operation(kind, input_value, &account, self.config.accuracy_factor)?;

        let timestamp = if timestamp == 0 { now } else { timestamp };
        if timestamp < sub_loan.start_timestamp {
            return Err(LendingError::TimestampBeforeStart {
                timestamp,
                start: sub_loan.start_timestamp,
            });
        }

        let (operation_id, position) = sub_loan
            .operations
            .insert(
                kind,
                timestamp,
                input_value,
                account,
                self.config.max_operations_per_sub_loan,
            )
            .ok_or(LendingError::OperationCountOverflow { id: sub_loan.id })?;
        let needs_replay = sub_loan.operations.is_behind_cursor(position)
            || timestamp < sub_loan.tracked_timestamp;

        events.emit(Event::OperationAdded {
            sub_loan_id: sub_loan.id,
            operation_id,
            kind,
            timestamp,
            input_value,
        });
        if timestamp > now {
            events.emit(Event::OperationPended {
                sub_loan_id: sub_loan.id,
                operation_id,
                kind,
                timestamp,
            });
        }
        debug!(
            sub_loan_id = sub_loan.id,
            operation_id,
            ?kind,
            timestamp,
            needs_replay,
            "operation added"
        );
        Ok((operation_id, needs_replay))
    }

    /// cancel a pending operation or revoke an applied one
    ///
    /// Returns true when the revoked operation had taken effect and the
    /// sub-loan must be replayed.
    pub fn void_operation(
        &self,
        sub_loan: &mut SubLoan,
        operation_id: OperationId,
        events: &mut EventStore,
    ) -> Result<bool> {
        if sub_loan.status == SubLoanStatus::Revoked {
            return Err(LendingError::SubLoanRevoked { id: sub_loan.id });
        }
        let sub_loan_id = sub_loan.id;
        let operation = sub_loan
            .operations
            .get_mut(operation_id)
            .ok_or(LendingError::OperationNotFound {
                sub_loan_id,
                operation_id,
            })?;

        match operation.status {
            OperationStatus::Pending => {
                operation.status = OperationStatus::Canceled;
                events.emit(Event::OperationCanceled {
                    sub_loan_id,
                    operation_id,
                });
                Ok(false)
            }
            OperationStatus::Applied => {
                operation.status = OperationStatus::Revoked;
                events.emit(Event::OperationRevoked {
                    sub_loan_id,
                    operation_id,
                });
                Ok(true)
            }
            status => Err(LendingError::OperationNotVoidable { status }),
        }
    }

    /// apply every due operation past the cursor, then accrue up to `now`
    pub fn process(
        &self,
        sub_loan: &mut SubLoan,
        now: Timestamp,
        events: &mut EventStore,
    ) -> Result<ProcessingReport> {
        self.walk(sub_loan, now, events, true)
    }

    /// rebuild the sub-loan from origination by re-running its log
    pub fn replay(
        &self,
        sub_loan: &mut SubLoan,
        now: Timestamp,
        events: &mut EventStore,
    ) -> Result<ProcessingReport> {
        sub_loan.reset_to_origination();
        sub_loan.operations.rewind();

        let mut report = self.walk(sub_loan, now, events, false)?;
        report.replayed = true;

        debug!(
            sub_loan_id = sub_loan.id,
            applied = report.applied,
            pending = report.pending,
            "sub-loan replayed"
        );
        events.emit(Event::SubLoanReplayed {
            sub_loan_id: sub_loan.id,
            operations_applied: report.applied,
            accrued: sub_loan.accrued_totals()?,
            timestamp: now,
        });
        Ok(report)
    }

    // replays announce the replay itself and operations applied for the
    // first time, not the re-applied history
    fn walk(
        &self,
        sub_loan: &mut SubLoan,
        now: Timestamp,
        events: &mut EventStore,
        announce: bool,
    ) -> Result<ProcessingReport> {
        let mut report = ProcessingReport::default();

        while let Some(operation_id) = sub_loan.operations.next_unprocessed() {
            let operation = sub_loan.operations.get(operation_id).cloned().ok_or(
                LendingError::OperationNotFound {
                    sub_loan_id: sub_loan.id,
                    operation_id,
                },
            )?;
            if operation.status.is_voided() {
                sub_loan.operations.advance_cursor();
                continue;
            }
            if operation.timestamp > now || sub_loan.status == SubLoanStatus::Revoked {
                break;
            }

            let accrual = self.accrual.accrue(sub_loan, operation.timestamp)?;
            if announce {
                self.announce_accrual(sub_loan, &accrual, events);
            }

            let first_application = operation.status == OperationStatus::Pending;
            let applied_value = self.apply(sub_loan, &operation, events, announce)?;
            if let Some(stored) = sub_loan.operations.get_mut(operation_id) {
                stored.status = OperationStatus::Applied;
                stored.applied_value = applied_value;
            }
            sub_loan.operations.advance_cursor();
            sub_loan.refresh_status();
            report.applied += 1;

            if announce || first_application {
                events.emit(Event::OperationApplied {
                    sub_loan_id: sub_loan.id,
                    operation_id,
                    kind: operation.kind,
                    applied_value,
                    timestamp: operation.timestamp,
                });
            }
            if operation.kind == OperationKind::Revocation {
                break;
            }
        }

        let accrual = self.accrual.accrue(sub_loan, now)?;
        if announce {
            self.announce_accrual(sub_loan, &accrual, events);
        }
        sub_loan.refresh_status();

        report.pending = sub_loan.operations.pending().count();
        if announce && report.applied > 0 {
            debug!(
                sub_loan_id = sub_loan.id,
                applied = report.applied,
                pending = report.pending,
                "operations processed"
            );
        }
        Ok(report)
    }

    fn apply(
        &self,
        sub_loan: &mut SubLoan,
        operation: &Operation,
        events: &mut EventStore,
        announce: bool,
    ) -> Result<u64> {
        let sub_loan_id = sub_loan.id;
        let timestamp = operation.timestamp;

        match operation.kind {
            OperationKind::Repayment => {
                let result = self.waterfall.settle(
                    SettlementKind::Repayment,
                    operation.input_value,
                    &mut sub_loan.tracked,
                    &mut sub_loan.repaid,
                )?;
                Ok(result.consumed)
            }
            OperationKind::Discounting => {
                let result = self.waterfall.settle(
                    SettlementKind::Discount,
                    operation.input_value,
                    &mut sub_loan.tracked,
                    &mut sub_loan.discount,
                )?;
                if announce {
                    events.emit(Event::SubLoanDiscounted {
                        sub_loan_id,
                        amount: result.consumed,
                        moved: result.moved,
                        timestamp,
                    });
                }
                Ok(result.consumed)
            }
            OperationKind::Revocation => {
                let written_off = sub_loan.tracked;
                sub_loan.tracked = ComponentAmounts::ZERO;
                sub_loan.status = SubLoanStatus::Revoked;
                events.emit(Event::SubLoanRevoked {
                    sub_loan_id,
                    written_off,
                    timestamp,
                });
                Ok(0)
            }
            OperationKind::Freezing => {
                if sub_loan.is_frozen() {
                    return Err(LendingError::AlreadyFrozen { id: sub_loan_id });
                }
                sub_loan.freeze_timestamp = timestamp;
                if announce {
                    events.emit(Event::SubLoanFrozen {
                        sub_loan_id,
                        timestamp,
                    });
                }
                Ok(0)
            }
            OperationKind::Unfreezing => {
                if !sub_loan.is_frozen() {
                    return Err(LendingError::NotFrozen { id: sub_loan_id });
                }
                let frozen_periods = self
                    .config
                    .period_index(timestamp)
                    .saturating_sub(self.config.period_index(sub_loan.freeze_timestamp));
                let extended = sub_loan.terms.duration as u64 + frozen_periods as u64;
                sub_loan.terms.duration =
                    u16::try_from(extended).map_err(|_| LendingError::ValueOutOfRange {
                        field: "duration".to_string(),
                        value: extended,
                        max: u16::MAX as u64,
                    })?;
                sub_loan.tracked_timestamp = sub_loan.tracked_timestamp.max(timestamp);
                sub_loan.freeze_timestamp = 0;
                if announce {
                    events.emit(Event::SubLoanUnfrozen {
                        sub_loan_id,
                        frozen_periods,
                        new_duration: sub_loan.terms.duration,
                        timestamp,
                    });
                }
                Ok(0)
            }
            OperationKind::ChangeInInterestRateRemuneratory
            | OperationKind::ChangeInInterestRateMoratory
            | OperationKind::ChangeInLateFeeRate
            | OperationKind::ChangeInDuration => {
                let old_value = self.replace_term(sub_loan, operation.kind, operation.input_value)?;
                if announce {
                    events.emit(Event::TermsChanged {
                        sub_loan_id,
                        kind: operation.kind,
                        old_value,
                        new_value: operation.input_value,
                        timestamp,
                    });
                }
                Ok(operation.input_value)
            }
        }
    }

    // returns the previous value of the replaced term
    fn replace_term(&self, sub_loan: &mut SubLoan, kind: OperationKind, value: u64) -> Result<u64> {
        let out_of_range = |max: u64| LendingError::ValueOutOfRange {
            field: format!("{:?} value", kind),
            value,
            max,
        };
        let rate = || u32::try_from(value).map_err(|_| out_of_range(u32::MAX as u64));
        let terms = &mut sub_loan.terms;

        let old_value = match kind {
            OperationKind::ChangeInInterestRateRemuneratory => {
                std::mem::replace(&mut terms.interest_rate_remuneratory, rate()?) as u64
            }
            OperationKind::ChangeInInterestRateMoratory => {
                std::mem::replace(&mut terms.interest_rate_moratory, rate()?) as u64
            }
            OperationKind::ChangeInLateFeeRate => {
                std::mem::replace(&mut terms.late_fee_rate, rate()?) as u64
            }
            OperationKind::ChangeInDuration => {
                let duration =
                    u16::try_from(value).map_err(|_| out_of_range(u16::MAX as u64))?;
                std::mem::replace(&mut terms.duration, duration) as u64
            }
            _ => {
                return Err(LendingError::InvalidOperationParameters {
                    message: format!("{:?} does not change terms", kind),
                })
            }
        };
        Ok(old_value)
    }

    fn announce_accrual(
        &self,
        sub_loan: &SubLoan,
        accrual: &AccrualOutcome,
        events: &mut EventStore,
    ) {
        if accrual.interest_remuneratory > 0 || accrual.interest_moratory > 0 {
            events.emit(Event::InterestAccrued {
                sub_loan_id: sub_loan.id,
                interest_remuneratory: accrual.interest_remuneratory,
                interest_moratory: accrual.interest_moratory,
                from_period: accrual.start_period,
                to_period: accrual.finish_period,
            });
        }
        if accrual.late_fee_imposed {
            events.emit(Event::LateFeeImposed {
                sub_loan_id: sub_loan.id,
                amount: accrual.late_fee,
                due_period: sub_loan.due_period(&self.config),
            });
        }
    }
}
