use serde::{Deserialize, Serialize};

use crate::errors::{LendingError, Result};
use crate::interest::round_to_accuracy;
use crate::state::rounded_outstanding;
use crate::types::{ComponentAmounts, AMOUNT_MAX};

/// balance components in the order settlements consume them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceComponent {
    InterestMoratory,
    LateFee,
    InterestRemuneratory,
    Principal,
}

impl BalanceComponent {
    pub const WATERFALL: [BalanceComponent; 4] = [
        BalanceComponent::InterestMoratory,
        BalanceComponent::LateFee,
        BalanceComponent::InterestRemuneratory,
        BalanceComponent::Principal,
    ];

    fn slot(self, amounts: &mut ComponentAmounts) -> &mut u64 {
        match self {
            BalanceComponent::InterestMoratory => &mut amounts.interest_moratory,
            BalanceComponent::LateFee => &mut amounts.late_fee,
            BalanceComponent::InterestRemuneratory => &mut amounts.interest_remuneratory,
            BalanceComponent::Principal => &mut amounts.principal,
        }
    }
}

/// which settled bucket receives the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementKind {
    Repayment,
    /// forgives interest and fees, never principal
    Discount,
}

/// result of running one amount through the waterfall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementResult {
    /// amount the caller asked for, the sentinel resolved to the outstanding balance
    pub requested: u64,
    /// amount actually taken by the waterfall
    pub consumed: u64,
    /// tracked value moved into the settled bucket, per component
    pub moved: ComponentAmounts,
}

/// settlement waterfall: moratory -> late fee -> remuneratory -> principal
#[derive(Debug, Clone, Copy)]
pub struct SettlementWaterfall {
    accuracy_factor: u64,
}

impl SettlementWaterfall {
    pub fn new(accuracy_factor: u64) -> Self {
        Self { accuracy_factor }
    }

    /// move value from `tracked` into `settled` in waterfall order
    ///
    /// A component whose rounded value fits the remaining amount is cleared
    /// entirely, including its sub-accuracy dust. Otherwise the remainder
    /// is taken from it and the walk ends. Any amount left over is an error
    /// unless the request was the "everything" sentinel.
    pub fn settle(
        &self,
        kind: SettlementKind,
        amount: u64,
        tracked: &mut ComponentAmounts,
        settled: &mut ComponentAmounts,
    ) -> Result<SettlementResult> {
        let is_sentinel = amount == AMOUNT_MAX;
        let requested = if is_sentinel {
            self.payable(kind, tracked)?
        } else {
            amount
        };

        let mut remaining = requested;
        let mut moved = ComponentAmounts::ZERO;
        for component in BalanceComponent::WATERFALL {
            if kind == SettlementKind::Discount && component == BalanceComponent::Principal {
                break;
            }
            let balance = component.slot(tracked);
            let rounded = round_to_accuracy(*balance, self.accuracy_factor);
            if rounded <= remaining {
                let value = *balance;
                *balance = 0;
                *component.slot(settled) = component
                    .slot(settled)
                    .checked_add(value)
                    .ok_or(LendingError::overflow("settled component"))?;
                *component.slot(&mut moved) = value;
                remaining -= rounded;
            } else {
                let value = remaining;
                *balance = balance
                    .checked_sub(value)
                    .ok_or(LendingError::overflow("partial settlement"))?;
                *component.slot(settled) = component
                    .slot(settled)
                    .checked_add(value)
                    .ok_or(LendingError::overflow("settled component"))?;
                *component.slot(&mut moved) = value;
                remaining = 0;
                break;
            }
        }

        let consumed = requested - remaining;
        if remaining > 0 && !is_sentinel {
            return Err(LendingError::RepaymentOrDiscountAmountExcess {
                requested,
                consumed,
            });
        }
        Ok(SettlementResult {
            requested,
            consumed,
            moved,
        })
    }

    /// what the sentinel resolves to for this kind of settlement
    fn payable(&self, kind: SettlementKind, tracked: &ComponentAmounts) -> Result<u64> {
        match kind {
            SettlementKind::Repayment => rounded_outstanding(tracked, self.accuracy_factor),
            SettlementKind::Discount => rounded_outstanding(
                &ComponentAmounts {
                    principal: 0,
                    ..*tracked
                },
                self.accuracy_factor,
            ),
        }
    }
}
