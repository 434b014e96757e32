/// backdated correction - void a mistaken repayment and replay the log
use chrono::{Duration, TimeZone, Utc};
use lending_market_rs::{
    AddOperationRequest, Event, FixedTermsCreditLine, InMemoryToken, LendingMarket, LiquidityPool,
    MarketConfig, OperationKind, RecordingLiquidityPool, RepaymentRequest, SafeTimeProvider,
    TimeSource, Uuid, VoidOperationRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

    let pool = RecordingLiquidityPool::new(Uuid::new_v4());
    let token = InMemoryToken::new();
    token.mint(&pool.account(), 1_000_000);
    let mut market = LendingMarket::new(MarketConfig::daily(), Box::new(token.clone()))?;
    let program_id = market.register_program(
        Box::new(FixedTermsCreditLine::new(10_000_000, 20_000_000, 1_000_000)),
        Box::new(pool.clone()),
    )?;

    let borrower = Uuid::new_v4();
    let id = market.take_loan(borrower, program_id, &[100_000], &[0], &[30], &time)?;
    let start = market.sub_loan(id)?.start_timestamp;

    control.advance(Duration::days(3));
    market.repay_sub_loan_batch(
        &[RepaymentRequest {
            sub_loan_id: id,
            amount: 50_000,
            repayer: borrower,
        }],
        &time,
    )?;
    println!("after repayment: {:?}", market.sub_loan(id)?.tracked);

    // the 50_000 was booked by mistake, the borrower actually paid 20_000 on day 1
    control.advance(Duration::days(4));
    market.modify_operation_batch(
        &[VoidOperationRequest {
            sub_loan_id: id,
            operation_id: 1,
        }],
        &[AddOperationRequest {
            sub_loan_id: id,
            kind: OperationKind::Repayment,
            timestamp: start + 86_400,
            input_value: 20_000,
            account: borrower,
        }],
        &time,
    )?;
    println!("after correction: {:?}", market.sub_loan(id)?.tracked);
    println!("borrower balance: {}", token.balance_of(&borrower));

    for operation in market.get_sub_loan_operations(id)? {
        println!(
            "#{} {:?} {:?} at {} applied {}",
            operation.id,
            operation.kind,
            operation.status,
            operation.timestamp,
            operation.applied_value
        );
    }
    let replays = market
        .events()
        .iter()
        .filter(|event| matches!(event, Event::SubLoanReplayed { .. }))
        .count();
    println!("replays: {}", replays);
    Ok(())
}
