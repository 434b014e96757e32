pub mod collaborators;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod market;
pub mod operations;
pub mod payments;
pub mod preview;
pub mod serialization;
pub mod state;
pub mod types;

// re-export key types
pub use collaborators::{
    CreditLine, FixedTermsCreditLine, HookCall, InMemoryToken, LiquidityPool,
    RecordingLiquidityPool, TokenMover,
};
pub use config::{MarketConfig, MoratoryInterestMode};
pub use errors::{LendingError, Result};
pub use events::{Event, EventStore};
pub use interest::{AccrualEngine, AccrualOutcome};
pub use market::{LendingMarket, SideEffect};
pub use operations::{AddOperationRequest, Operation, OperationEngine, VoidOperationRequest};
pub use payments::{DiscountRequest, RepaymentRequest, SettlementWaterfall};
pub use preview::{LoanPreview, SubLoanPreview};
pub use serialization::{LoanPreviewView, OperationView, SubLoanView};
pub use state::SubLoan;
pub use types::{
    AccountId, ComponentAmounts, LoanTerms, OperationId, OperationKind, OperationStatus,
    ProgramId, SubLoanId, SubLoanStatus, Timestamp, AMOUNT_MAX,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
