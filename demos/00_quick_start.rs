/// quick start - take a loan, let it accrue, repay it in full
use chrono::{Duration, TimeZone, Utc};
use lending_market_rs::{
    FixedTermsCreditLine, InMemoryToken, LendingMarket, LiquidityPool, MarketConfig,
    RecordingLiquidityPool, RepaymentRequest, SafeTimeProvider, TimeSource, Uuid, AMOUNT_MAX,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));

    // 1% per day before due, 2% after, 0.1% late fee
    let credit_line = FixedTermsCreditLine::new(10_000_000, 20_000_000, 1_000_000);
    let pool = RecordingLiquidityPool::new(Uuid::new_v4());
    let token = InMemoryToken::new();
    token.mint(&pool.account(), 1_000_000);

    let mut market = LendingMarket::new(MarketConfig::daily(), Box::new(token.clone()))?;
    let program_id = market.register_program(Box::new(credit_line), Box::new(pool))?;

    let borrower = Uuid::new_v4();
    let id = market.take_loan(borrower, program_id, &[100_000], &[0], &[10], &time)?;
    println!("sub-loan {} taken", id);

    // one day past due
    time.test_control().unwrap().advance(Duration::days(11));
    let preview = market.get_sub_loan_preview(id, 0, &time)?;
    println!("tracked:     {:?}", preview.tracked);
    println!("outstanding: {}", preview.outstanding_balance);

    token.mint(&borrower, preview.outstanding_balance);
    market.repay_sub_loan_batch(
        &[RepaymentRequest {
            sub_loan_id: id,
            amount: AMOUNT_MAX,
            repayer: borrower,
        }],
        &time,
    )?;

    println!("{}", market.get_sub_loan_state(&[id])?[0].to_json_pretty()?);
    Ok(())
}
