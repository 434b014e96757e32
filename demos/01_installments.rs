/// installments - one loan split into sub-loans with staggered due dates
use chrono::{Duration, TimeZone, Utc};
use lending_market_rs::decimal::amount_from_decimal;
use lending_market_rs::{
    FixedTermsCreditLine, InMemoryToken, LendingMarket, LiquidityPool, LoanPreviewView,
    MarketConfig, RecordingLiquidityPool, RepaymentRequest, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

const TOKEN_DECIMALS: u32 = 6;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

    let pool = RecordingLiquidityPool::new(Uuid::new_v4());
    let token = InMemoryToken::new();
    token.mint(&pool.account(), amount_from_decimal(dec!(1000000), TOKEN_DECIMALS)?);

    let mut market = LendingMarket::new(MarketConfig::daily(), Box::new(token.clone()))?;
    let program_id = market.register_program(
        Box::new(FixedTermsCreditLine::new(1_000_000, 5_000_000, 10_000_000)),
        Box::new(pool.clone()),
    )?;

    // 900 over three monthly installments, with a 10 fee on each
    let borrower = Uuid::new_v4();
    let installment = amount_from_decimal(dec!(300), TOKEN_DECIMALS)?;
    let fee = amount_from_decimal(dec!(10), TOKEN_DECIMALS)?;
    let first = market.take_loan(
        borrower,
        program_id,
        &[installment; 3],
        &[fee; 3],
        &[30, 60, 90],
        &time,
    )?;
    println!("installment loan starts at sub-loan {}", first);

    control.advance(Duration::days(30));
    let due = market.get_sub_loan_preview(first, 0, &time)?.outstanding_balance;
    token.mint(&borrower, due);
    market.repay_sub_loan_batch(
        &[RepaymentRequest {
            sub_loan_id: first,
            amount: due,
            repayer: borrower,
        }],
        &time,
    )?;
    println!("first installment repaid: {}", due);

    // second installment is paid late
    control.advance(Duration::days(40));
    let preview = market.get_loan_preview(first, 0, &time)?;
    for member in &preview.members {
        println!(
            "sub-loan {}: {:?}, late fee {}, outstanding {}",
            member.sub_loan_id, member.status, member.tracked.late_fee, member.outstanding_balance
        );
    }
    println!("{}", LoanPreviewView::new(preview, TOKEN_DECIMALS)?.to_json_pretty()?);
    println!("pool net inflow: {}", pool.net_inflow());
    Ok(())
}
