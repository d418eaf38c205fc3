#![cfg(feature = "market_data")]

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use replaybook::diagnostics::{Diagnostics, Issue};
use replaybook::market_data::providers::YahooChartSource;
use replaybook::market_data::{
    DateRange, MarketDataService, MarketDataSource, MemoryMarketDataStore,
};
use replaybook::models::TickerMap;
use rust_decimal_macros::dec;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn chart(closes: &str) -> String {
    format!(
        r#"{{
            "chart": {{
                "result": [{{
                    "meta": {{"gmtoffset": -18000}},
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {{"quote": [{{"close": {closes}}}]}}
                }}],
                "error": null
            }}
        }}"#
    )
}

#[tokio::test]
async fn yahoo_price_series_from_chart_endpoint() -> Result<()> {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/AAPL"))
        .and(query_param("interval", "1d"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(chart("[185.5, null, 181.25]"), "application/json"),
        )
        .mount(&server)
        .await;

    let series = source
        .fetch_price_series("AAPL", d(2), d(4))
        .await?
        .expect("expected a series");

    assert_eq!(series.len(), 2);
    assert_eq!(series.first_date(), Some(d(2)));
    assert_eq!(
        series.value_as_of(d(3).and_hms_opt(12, 0, 0).unwrap()),
        Some(dec!(185.5))
    );
    assert_eq!(
        series.value_as_of(d(4).and_hms_opt(23, 0, 0).unwrap()),
        Some(dec!(181.25))
    );

    Ok(())
}

#[tokio::test]
async fn yahoo_unknown_symbol_is_unavailable() -> Result<()> {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(source.fetch_price_series("NOPE", d(2), d(4)).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn service_inverts_yahoo_fx_quote() -> Result<()> {
    let server = MockServer::start().await;
    let source = YahooChartSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/EURUSD=X"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(chart("[1.25, 1.25, 1.25]"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = MarketDataService::new(Arc::new(MemoryMarketDataStore::new()), Arc::new(source))
        .with_currencies("EUR", "USD");
    let range = DateRange::new(d(2), d(4));

    let fx = service.fx_series(range).await?.expect("expected FX");
    assert_eq!(fx.value_as_of(d(3).and_hms_opt(12, 0, 0).unwrap()), Some(dec!(0.8)));

    // Second call is served from the run cache.
    let again = service.fx_series(range).await?.expect("expected cached FX");
    assert_eq!(again.len(), 3);

    Ok(())
}

#[tokio::test]
async fn server_error_for_one_symbol_does_not_block_others() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ACME.AS"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(chart("[10.0, 11.0, 12.0]"), "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/BROKEN"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = YahooChartSource::new().with_base_url(server.uri());
    let service = MarketDataService::new(Arc::new(MemoryMarketDataStore::new()), Arc::new(source));
    let tickers = TickerMap::new()
        .with("ACME", "ACME.AS", false)
        .with("BROKEN CO", "BROKEN", false);
    let mut diagnostics = Diagnostics::new();

    let snapshot = service
        .fetch_snapshot(
            ["ACME", "BROKEN CO"],
            &tickers,
            DateRange::new(d(2), d(4)),
            &mut diagnostics,
        )
        .await;

    assert_eq!(snapshot.price("ACME").map(|s| s.len()), Some(3));
    assert!(snapshot.price("BROKEN CO").is_none());
    assert!(matches!(
        diagnostics.issues(),
        [Issue::MissingMarketData { product, symbol, .. }] if product == "BROKEN CO" && symbol == "BROKEN"
    ));

    Ok(())
}
