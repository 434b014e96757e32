use serde::{Deserialize, Serialize};

use crate::types::{
    AccountId, ComponentAmounts, OperationId, OperationKind, ProgramId, SubLoanId, SubLoanStatus,
    Timestamp,
};

/// all events that can be emitted by the market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    ProgramRegistered {
        program_id: ProgramId,
        pool_account: AccountId,
    },
    SubLoanTaken {
        sub_loan_id: SubLoanId,
        program_id: ProgramId,
        borrower: AccountId,
        borrowed_amount: u64,
        addon_amount: u64,
        duration: u16,
        timestamp: Timestamp,
    },
    LoanTaken {
        first_sub_loan_id: SubLoanId,
        sub_loan_count: u16,
        borrower: AccountId,
        total_borrowed: u64,
        timestamp: Timestamp,
    },
    SubLoanStatusChanged {
        sub_loan_id: SubLoanId,
        old_status: SubLoanStatus,
        new_status: SubLoanStatus,
        timestamp: Timestamp,
    },
    SubLoanRevoked {
        sub_loan_id: SubLoanId,
        written_off: ComponentAmounts,
        timestamp: Timestamp,
    },

    // operation log events
    OperationAdded {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
        kind: OperationKind,
        timestamp: Timestamp,
        input_value: u64,
    },
    OperationPended {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
        kind: OperationKind,
        timestamp: Timestamp,
    },
    OperationApplied {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
        kind: OperationKind,
        applied_value: u64,
        timestamp: Timestamp,
    },
    OperationCanceled {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
    },
    OperationRevoked {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
    },
    /// history was rebuilt; `accrued` replaces every earlier accrual total
    SubLoanReplayed {
        sub_loan_id: SubLoanId,
        operations_applied: usize,
        accrued: ComponentAmounts,
        timestamp: Timestamp,
    },

    // interest events
    InterestAccrued {
        sub_loan_id: SubLoanId,
        interest_remuneratory: u64,
        interest_moratory: u64,
        from_period: u32,
        to_period: u32,
    },
    LateFeeImposed {
        sub_loan_id: SubLoanId,
        amount: u64,
        due_period: u32,
    },

    // parameter events
    SubLoanFrozen {
        sub_loan_id: SubLoanId,
        timestamp: Timestamp,
    },
    SubLoanUnfrozen {
        sub_loan_id: SubLoanId,
        frozen_periods: u32,
        new_duration: u16,
        timestamp: Timestamp,
    },
    TermsChanged {
        sub_loan_id: SubLoanId,
        kind: OperationKind,
        old_value: u64,
        new_value: u64,
        timestamp: Timestamp,
    },

    // settlement events
    SubLoanRepaid {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
        repayer: AccountId,
        amount: u64,
        timestamp: Timestamp,
    },
    SubLoanDiscounted {
        sub_loan_id: SubLoanId,
        amount: u64,
        moved: ComponentAmounts,
        timestamp: Timestamp,
    },
    RepaymentReversed {
        sub_loan_id: SubLoanId,
        operation_id: OperationId,
        repayer: AccountId,
        amount: u64,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// move every event of a committed batch into this store
    pub fn extend(&mut self, other: EventStore) {
        self.events.extend(other.events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_store() {
        let mut store = EventStore::new();
        store.emit(Event::OperationCanceled {
            sub_loan_id: 1,
            operation_id: 2,
        });

        let mut batch = EventStore::new();
        batch.emit(Event::SubLoanFrozen {
            sub_loan_id: 1,
            timestamp: 100,
        });
        store.extend(batch);

        assert_eq!(store.len(), 2);
        let taken = store.take_events();
        assert_eq!(taken.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_event_serializes() {
        let event = Event::LateFeeImposed {
            sub_loan_id: 7,
            amount: 110,
            due_period: 19_010,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("LateFeeImposed"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
