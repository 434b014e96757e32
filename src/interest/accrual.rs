use serde::{Deserialize, Serialize};

use crate::config::{MarketConfig, MoratoryInterestMode};
use crate::errors::{LendingError, Result};
use crate::interest::compound::{calculate_simple_interest, calculate_tracked_balance};
use crate::state::SubLoan;
use crate::types::{SubLoanStatus, Timestamp};

/// what one accrual step added to the tracked balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccrualOutcome {
    pub start_period: u32,
    pub finish_period: u32,
    pub interest_remuneratory: u64,
    pub interest_moratory: u64,
    pub late_fee: u64,
    /// true when this step charged the late fee
    pub late_fee_imposed: bool,
}

impl AccrualOutcome {
    pub fn is_empty(&self) -> bool {
        self.interest_remuneratory == 0 && self.interest_moratory == 0 && self.late_fee == 0
    }
}

/// engine for bringing a sub-loan's tracked balances forward in time
#[derive(Debug, Clone)]
pub struct AccrualEngine {
    config: MarketConfig,
}

impl AccrualEngine {
    pub fn new(config: MarketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// accrue interest from the tracked timestamp up to `finish`
    ///
    /// Accrual stops at the freeze timestamp while frozen. Pre-due periods
    /// compound principal plus remuneratory interest; crossing the due
    /// period imposes the late fee once per history, even when a duration
    /// change moves the due period later; post-due periods grow moratory
    /// interest on principal plus remuneratory interest plus the late fee.
    pub fn accrue(&self, sub_loan: &mut SubLoan, finish: Timestamp) -> Result<AccrualOutcome> {
        let finish = if sub_loan.is_frozen() {
            finish.min(sub_loan.freeze_timestamp)
        } else {
            finish
        };
        let start_period = self.config.period_index(sub_loan.tracked_timestamp);
        let finish_period = self.config.period_index(finish);
        let mut outcome = AccrualOutcome {
            start_period,
            finish_period,
            ..AccrualOutcome::default()
        };

        if finish <= sub_loan.tracked_timestamp {
            return Ok(outcome);
        }
        if sub_loan.status != SubLoanStatus::Ongoing || finish_period <= start_period {
            sub_loan.tracked_timestamp = finish;
            return Ok(outcome);
        }

        let due_period = sub_loan.due_period(&self.config);
        if finish_period <= due_period {
            outcome.interest_remuneratory =
                self.accrue_remuneratory(sub_loan, finish_period - start_period)?;
        } else {
            if start_period <= due_period {
                outcome.interest_remuneratory =
                    self.accrue_remuneratory(sub_loan, due_period - start_period)?;
                if !sub_loan.late_fee_imposed {
                    outcome.late_fee = self.impose_late_fee(sub_loan)?;
                    outcome.late_fee_imposed = true;
                    sub_loan.late_fee_imposed = true;
                }
            }
            let overdue_from = start_period.max(due_period);
            outcome.interest_moratory =
                self.accrue_moratory(sub_loan, finish_period - overdue_from)?;
        }

        sub_loan.tracked_timestamp = finish;
        Ok(outcome)
    }

    fn accrue_remuneratory(&self, sub_loan: &mut SubLoan, periods: u32) -> Result<u64> {
        let base = sub_loan
            .tracked
            .principal
            .checked_add(sub_loan.tracked.interest_remuneratory)
            .ok_or(LendingError::overflow("remuneratory base"))?;
        let grown = calculate_tracked_balance(
            base,
            periods,
            sub_loan.terms.interest_rate_remuneratory,
            self.config.interest_rate_factor,
        )?;
        let added = grown.saturating_sub(base);
        sub_loan.tracked.interest_remuneratory += added;
        Ok(added)
    }

    fn impose_late_fee(&self, sub_loan: &mut SubLoan) -> Result<u64> {
        let fee = calculate_simple_interest(
            self.overdue_base(sub_loan)?,
            1,
            sub_loan.terms.late_fee_rate,
            self.config.interest_rate_factor,
        )?;
        sub_loan.tracked.late_fee = sub_loan
            .tracked
            .late_fee
            .checked_add(fee)
            .ok_or(LendingError::overflow("late fee"))?;
        Ok(fee)
    }

    fn accrue_moratory(&self, sub_loan: &mut SubLoan, periods: u32) -> Result<u64> {
        let rate = sub_loan.terms.interest_rate_moratory;
        let factor = self.config.interest_rate_factor;
        let base = self
            .overdue_base(sub_loan)?
            .checked_add(sub_loan.tracked.late_fee)
            .ok_or(LendingError::overflow("moratory base"))?;
        let added = match self.config.moratory_interest_mode {
            MoratoryInterestMode::Simple => calculate_simple_interest(base, periods, rate, factor)?,
            MoratoryInterestMode::Compound => {
                let compounding_base = base
                    .checked_add(sub_loan.tracked.interest_moratory)
                    .ok_or(LendingError::overflow("moratory base"))?;
                calculate_tracked_balance(compounding_base, periods, rate, factor)?
                    .saturating_sub(compounding_base)
            }
        };
        sub_loan.tracked.interest_moratory = sub_loan
            .tracked
            .interest_moratory
            .checked_add(added)
            .ok_or(LendingError::overflow("moratory interest"))?;
        Ok(added)
    }

    // principal plus remuneratory interest, the late fee is charged on it
    fn overdue_base(&self, sub_loan: &SubLoan) -> Result<u64> {
        sub_loan
            .tracked
            .principal
            .checked_add(sub_loan.tracked.interest_remuneratory)
            .ok_or(LendingError::overflow("overdue base"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PERIOD_IN_SECONDS;
    use crate::state::tests::{scenario_sub_loan, START};

    const DAY: Timestamp = PERIOD_IN_SECONDS as Timestamp;

    fn engine() -> AccrualEngine {
        AccrualEngine::new(MarketConfig::daily())
    }

    #[test]
    fn test_accrue_to_due_day() {
        let mut loan = scenario_sub_loan(100_000);
        let outcome = engine().accrue(&mut loan, START + 10 * DAY).unwrap();

        assert_eq!(outcome.interest_remuneratory, 10_462);
        assert!(!outcome.late_fee_imposed);
        assert_eq!(loan.tracked.interest_remuneratory, 10_462);
        assert_eq!(loan.tracked.late_fee, 0);
        assert_eq!(loan.tracked.interest_moratory, 0);
        assert_eq!(loan.tracked_timestamp, START + 10 * DAY);
    }

    #[test]
    fn test_first_overdue_period() {
        let mut loan = scenario_sub_loan(100_000);
        let engine = engine();
        engine.accrue(&mut loan, START + 10 * DAY).unwrap();
        let outcome = engine.accrue(&mut loan, START + 11 * DAY).unwrap();

        assert!(outcome.late_fee_imposed);
        assert_eq!(outcome.interest_remuneratory, 0);
        assert_eq!(loan.tracked.late_fee, 110);
        // (110_462 + 110) * 2% = 2_211.44
        assert_eq!(loan.tracked.interest_moratory, 2_211);
        assert_eq!(loan.tracked.total().unwrap(), 112_783);
        assert_eq!(loan.outstanding_balance(10_000).unwrap(), 110_000);
    }

    #[test]
    fn test_single_step_across_due_day_matches_two_steps() {
        let mut stepped = scenario_sub_loan(100_000);
        let mut direct = scenario_sub_loan(100_000);
        let engine = engine();

        engine.accrue(&mut stepped, START + 10 * DAY).unwrap();
        engine.accrue(&mut stepped, START + 11 * DAY).unwrap();
        engine.accrue(&mut direct, START + 11 * DAY).unwrap();

        assert_eq!(stepped.tracked, direct.tracked);
    }

    #[test]
    fn test_late_fee_imposed_once() {
        let mut loan = scenario_sub_loan(100_000);
        let engine = engine();
        engine.accrue(&mut loan, START + 11 * DAY).unwrap();
        let later = engine.accrue(&mut loan, START + 13 * DAY).unwrap();

        assert!(!later.late_fee_imposed);
        assert_eq!(loan.tracked.late_fee, 110);
        // two more simple periods on the same base
        assert_eq!(later.interest_moratory, 4_423);
    }

    #[test]
    fn test_extended_duration_does_not_charge_late_fee_again() {
        let mut loan = scenario_sub_loan(100_000);
        let engine = engine();
        let first = engine.accrue(&mut loan, START + 12 * DAY).unwrap();
        assert!(first.late_fee_imposed);
        assert_eq!(loan.tracked.late_fee, 110);

        loan.terms.duration = 20;
        let second = engine.accrue(&mut loan, START + 25 * DAY).unwrap();

        assert!(!second.late_fee_imposed);
        assert_eq!(second.late_fee, 0);
        assert_eq!(loan.tracked.late_fee, 110);
        assert!(second.interest_remuneratory > 0);
        assert!(second.interest_moratory > 0);
        assert!(loan.late_fee_imposed);
    }

    #[test]
    fn test_accrual_is_idempotent() {
        let mut loan = scenario_sub_loan(100_000);
        let engine = engine();
        engine.accrue(&mut loan, START + 5 * DAY).unwrap();
        let snapshot = loan.clone();

        let outcome = engine.accrue(&mut loan, START + 5 * DAY).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(loan, snapshot);

        let backwards = engine.accrue(&mut loan, START + DAY).unwrap();
        assert!(backwards.is_empty());
        assert_eq!(loan, snapshot);
    }

    #[test]
    fn test_within_period_moves_timestamp_only() {
        let mut loan = scenario_sub_loan(100_000);
        let outcome = engine().accrue(&mut loan, START + DAY - 1).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(loan.tracked_timestamp, START + DAY - 1);
        assert_eq!(loan.tracked.interest_remuneratory, 0);
    }

    #[test]
    fn test_freeze_clamps_accrual() {
        let mut loan = scenario_sub_loan(100_000);
        loan.freeze_timestamp = START + DAY;
        engine().accrue(&mut loan, START + 30 * DAY).unwrap();

        assert_eq!(loan.tracked.interest_remuneratory, 1_000);
        assert_eq!(loan.tracked_timestamp, START + DAY);
        assert_eq!(loan.tracked.late_fee, 0);
    }

    #[test]
    fn test_compound_moratory_mode() {
        let config = MarketConfig::daily().moratory_interest_mode(MoratoryInterestMode::Compound);
        let engine = AccrualEngine::new(config);
        let mut loan = scenario_sub_loan(100_000);
        engine.accrue(&mut loan, START + 11 * DAY).unwrap();

        // one compounding period equals one simple period
        assert_eq!(loan.tracked.interest_moratory, 2_211);

        engine.accrue(&mut loan, START + 12 * DAY).unwrap();
        // 112_783 * 1.02 = 115_038.66
        assert_eq!(loan.tracked.interest_moratory, 2_211 + 2_256);
    }

    #[test]
    fn test_non_ongoing_does_not_accrue() {
        let mut loan = scenario_sub_loan(100_000);
        loan.status = SubLoanStatus::Revoked;
        loan.tracked = crate::types::ComponentAmounts::ZERO;
        let outcome = engine().accrue(&mut loan, START + 20 * DAY).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(loan.tracked_timestamp, START + 20 * DAY);
    }
}
