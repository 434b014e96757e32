pub mod accrual;
pub mod compound;
pub mod fixed_point;
pub mod rounding;

pub use accrual::{AccrualEngine, AccrualOutcome};
pub use compound::{calculate_simple_interest, calculate_tracked_balance};
pub use fixed_point::Fixed64x64;
pub use rounding::{is_rounded, round_to_accuracy};
