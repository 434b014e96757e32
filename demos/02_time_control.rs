/// time control - freezing pauses accrual and pushes the due date out
use chrono::{Duration, TimeZone, Utc};
use lending_market_rs::{
    AddOperationRequest, FixedTermsCreditLine, InMemoryToken, LendingMarket, LiquidityPool,
    MarketConfig, OperationKind, RecordingLiquidityPool, SafeTimeProvider, TimeSource, Uuid,
};

fn freeze_request(sub_loan_id: u64, kind: OperationKind) -> AddOperationRequest {
    AddOperationRequest {
        sub_loan_id,
        kind,
        timestamp: 0,
        input_value: 0,
        account: Uuid::nil(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time control example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let pool = RecordingLiquidityPool::new(Uuid::new_v4());
    let token = InMemoryToken::new();
    token.mint(&pool.account(), 1_000_000);
    let mut market = LendingMarket::new(MarketConfig::daily(), Box::new(token))?;
    let program_id = market.register_program(
        Box::new(FixedTermsCreditLine::new(10_000_000, 20_000_000, 1_000_000)),
        Box::new(pool),
    )?;
    let id = market.take_loan(Uuid::new_v4(), program_id, &[100_000], &[0], &[10], &time)?;
    println!("loan taken on {}", time.now().format("%Y-%m-%d"));

    controller.advance(Duration::days(5));
    market.modify_operation_batch(&[], &[freeze_request(id, OperationKind::Freezing)], &time)?;
    println!("frozen on {}", time.now().format("%Y-%m-%d"));

    controller.advance(Duration::days(20));
    let frozen = market.get_sub_loan_preview(id, 0, &time)?;
    println!(
        "still frozen on {}: remuneratory {}, late fee {}",
        time.now().format("%Y-%m-%d"),
        frozen.tracked.interest_remuneratory,
        frozen.tracked.late_fee
    );

    market.modify_operation_batch(&[], &[freeze_request(id, OperationKind::Unfreezing)], &time)?;
    let states = market.get_sub_loan_state(&[id])?;
    let state = &states[0];
    println!(
        "unfrozen on {}: duration {} -> {}, due period {}",
        time.now().format("%Y-%m-%d"),
        state.origination.initial_terms.duration,
        state.terms.duration,
        state.tracking.due_period
    );

    for event in market.take_events() {
        println!("{:?}", event);
    }
    Ok(())
}
