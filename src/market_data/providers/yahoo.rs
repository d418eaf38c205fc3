//! Yahoo Finance chart API source for daily closes and FX rates.
//!
//! FX pairs use Yahoo's `{BASE}{QUOTE}=X` symbols, so `EURUSD=X` yields USD per
//! EUR, which is the foreign-per-home quote the service expects.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::market_data::{MarketDataSource, TimeSeries};

pub const YAHOO_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteIndicator>,
}

#[derive(Debug, Deserialize)]
struct QuoteIndicator {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: YAHOO_CHART_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn fx_symbol(home: &str, foreign: &str) -> String {
        format!("{}{}=X", home.to_uppercase(), foreign.to_uppercase())
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), symbol);
        debug!(symbol, %start, %end, "requesting Yahoo chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Request failed for {symbol}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .error_for_status()?
            .json::<ChartResponse>()
            .await
            .with_context(|| format!("Failed to parse chart response for {symbol}"))?;

        parse_chart(symbol, body)
    }
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_chart(symbol: &str, body: ChartResponse) -> Result<Option<TimeSeries>> {
    if let Some(error) = body.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(None);
        }
        return Err(anyhow!(
            "Yahoo chart error for {symbol}: {} - {}",
            error.code,
            error.description.unwrap_or_default()
        ));
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };
    let offset = result.meta.map(|m| m.gmt_offset).unwrap_or(0);
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    // While the market is open the current session can be reported twice; the
    // later close wins.
    let samples = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            let close = Decimal::from_f64(close?)?;
            Some((date, close))
        });

    let series = TimeSeries::from_unordered(samples);
    if series.is_empty() {
        return Ok(None);
    }
    Ok(Some(series))
}

#[async_trait::async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        self.fetch_chart(symbol, start, end).await
    }

    async fn fetch_fx_series(
        &self,
        home: &str,
        foreign: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        self.fetch_chart(&Self::fx_symbol(home, foreign), start, end)
            .await
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE_CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "AAPL", "gmtoffset": -18000},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {"quote": [{"close": [185.64, null, 181.91]}]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_closes_and_skips_nulls() -> Result<()> {
        let body: ChartResponse = serde_json::from_str(SAMPLE_CHART)?;
        let series = parse_chart("AAPL", body)?.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(
            series.samples()[0],
            (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(185.64))
        );
        assert_eq!(
            series.samples()[1],
            (NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), dec!(181.91))
        );
        Ok(())
    }

    #[test]
    fn not_found_is_unavailable_other_errors_fail() -> Result<()> {
        let body: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )?;
        assert!(parse_chart("NOPE", body)?.is_none());

        let body: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#,
        )?;
        let err = parse_chart("AAPL", body).unwrap_err();
        assert!(err.to_string().contains("Bad Request"));
        Ok(())
    }

    #[test]
    fn fx_symbol_is_home_then_foreign() {
        assert_eq!(YahooChartSource::fx_symbol("eur", "usd"), "EURUSD=X");
    }
}
