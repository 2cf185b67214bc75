use std::sync::Arc;
use tradetrace::engine::TokenTrade;
use tradetrace::{
    Address, Decimal, MockPriceDataSource, PortfolioWindow, PriceLoader, PriceSeries,
    RawTransferEvent, TokenSymbol, UnixTime,
};

const ME: &str = "0x00000000000000000000000000000000000000aa";

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn t(secs: i64) -> UnixTime {
    UnixTime::new(secs)
}

fn series() -> PriceSeries {
    PriceSeries::new(vec![(t(100), d("1.00")), (t(200), d("1.10"))], (t(300), d("1.20")))
}

fn event(hash: &str, ts: i64, from: &str, to: &str, value: &str) -> RawTransferEvent {
    RawTransferEvent {
        hash: Some(hash.to_string()),
        block_number: Some(ts.to_string()),
        time_stamp: Some(ts.to_string()),
        from: Some(from.to_string()),
        to: Some(to.to_string()),
        token_symbol: Some("UNI".to_string()),
        token_name: None,
        token_decimal: Some("0".to_string()),
        contract_address: Some("0xuni".to_string()),
        value: Some(value.to_string()),
    }
}

#[test]
fn test_nearest_sample_with_ties_going_right() {
    let series = series();
    assert_eq!(series.price_at(t(180)), Some(d("1.10")));
    assert_eq!(series.price_at(t(150)), Some(d("1.10")));
    assert_eq!(series.price_at(t(120)), Some(d("1.00")));
    assert_eq!(series.price_at(t(250)), Some(d("1.20")));
}

#[test]
fn test_exact_samples_and_bounds() {
    let series = series();
    assert_eq!(series.price_at(t(100)), Some(d("1.00")));
    assert_eq!(series.price_at(t(300)), Some(d("1.20")));
    assert_eq!(series.price_at(t(99)), None);
    assert_eq!(series.price_at(t(301)), None);
    assert!(series.covers(t(200)));
    assert!(!series.covers(t(301)));
}

#[test]
fn test_correlate_window_trades() {
    let raw = vec![
        event("0x1", 180, "0xpool", ME, "10"),
        event("0x2", 260, ME, "0xpool", "4"),
        event("0x3", 400, "0xpool", ME, "1"),
    ];
    let window = PortfolioWindow::from_raw(Address::new(ME), &raw, t(0), t(500));
    let trades: Vec<TokenTrade> = window.trades_for(&TokenSymbol::new("UNI"));

    let priced = series().correlate(trades);
    assert_eq!(priced.len(), 3);
    assert_eq!(priced[0].usd_value, Some(d("11.00")));
    assert_eq!(priced[1].price, Some(d("1.20")));
    assert_eq!(priced[1].usd_value, Some(d("-4.80")));
    assert_eq!(priced[2].price, None);
    assert_eq!(priced[2].usd_value, None);
}

#[tokio::test]
async fn test_price_loader_values_window_trades() {
    let mock = MockPriceDataSource::new()
        .with_coin("UNI", "uniswap")
        .with_series("uniswap", vec![(t(50), d("2")), (t(150), d("3"))])
        .with_spot("uniswap", d("4"));
    let loader = PriceLoader::new(Arc::new(mock));

    let raw = vec![event("0x1", 140, "0xpool", ME, "5")];
    let window = PortfolioWindow::from_raw(Address::new(ME), &raw, t(100), t(200));

    let priced = loader
        .value_trades(&window, &TokenSymbol::new("uni"))
        .await
        .unwrap();
    // Symbol lookup is case-insensitive but the window's symbol is "UNI".
    assert_eq!(priced.map(|p| p.len()), Some(0));

    let priced = loader
        .value_trades(&window, &TokenSymbol::new("UNI"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(priced.len(), 1);
    // The sample at 50 falls inside the five-minute left pad.
    assert_eq!(priced[0].price, Some(d("3")));
    assert_eq!(priced[0].usd_value, Some(d("15")));
}
