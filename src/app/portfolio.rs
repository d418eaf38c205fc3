use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::types::{HistoryOutput, HistorySummary, ReportOutput};
use crate::clock::Clock;
use crate::config::ResolvedConfig;
use crate::diagnostics::Diagnostics;
use crate::ledger::{read_ledger_file, Ledger};
use crate::market_data::{
    DateRange, MarketDataService, MarketDataSource, MarketSnapshot, MemoryMarketDataStore,
    NoopSource, TimeSeries,
};
use crate::models::TickerMap;
use crate::portfolio::{Granularity, Timeline, ValuationAggregator, ValuationPoint};
use crate::reports::{
    order_summary, position_history, transactions_eod, OrderSummaryRow, PositionRow,
    TransactionRow,
};

/// Parsed ledger and ticker mapping for one run.
pub struct RunInputs {
    pub ledger: Ledger,
    pub tickers: TickerMap,
}

/// Source to use for a run. Offline runs, and builds without the HTTP source,
/// never fetch.
pub fn market_source(config: &ResolvedConfig, offline: bool) -> Arc<dyn MarketDataSource> {
    if offline {
        return Arc::new(NoopSource);
    }
    http_source(config)
}

#[cfg(feature = "market_data")]
fn http_source(config: &ResolvedConfig) -> Arc<dyn MarketDataSource> {
    use crate::market_data::providers::YahooChartSource;

    let mut source = YahooChartSource::new();
    if let Some(base_url) = &config.market_data.base_url {
        source = source.with_base_url(base_url.clone());
    }
    Arc::new(source)
}

#[cfg(not(feature = "market_data"))]
fn http_source(_config: &ResolvedConfig) -> Arc<dyn MarketDataSource> {
    warn!("built without the market_data feature, running offline");
    Arc::new(NoopSource)
}

pub fn load_ledger(config: &ResolvedConfig, diagnostics: &mut Diagnostics) -> Result<Ledger> {
    let rows = read_ledger_file(&config.ledger_path)
        .with_context(|| format!("Failed to read ledger: {}", config.ledger_path.display()))?;
    let ledger = Ledger::from_rows(&rows, &config.ledger_options(), diagnostics)
        .with_context(|| format!("Failed to load ledger: {}", config.ledger_path.display()))?;

    let malformed = diagnostics.malformed_row_count();
    if malformed > 0 {
        warn!(rows = malformed, "ledger rows were coerced or dropped");
    }
    info!(rows = rows.len(), path = %config.ledger_path.display(), "ledger file read");
    Ok(ledger)
}

/// A missing mapping file leaves every product unmapped rather than failing.
pub fn load_tickers(config: &ResolvedConfig) -> Result<TickerMap> {
    let path = &config.tickers_path;
    if !path.exists() {
        warn!(path = %path.display(), "ticker mapping not found, every product is unmapped");
        return Ok(TickerMap::new());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ticker mapping: {}", path.display()))?;
    let tickers = TickerMap::from_csv_reader(file)
        .with_context(|| format!("Failed to parse ticker mapping: {}", path.display()))?;
    info!(mappings = tickers.len(), "ticker mapping loaded");
    Ok(tickers)
}

pub fn load_inputs(config: &ResolvedConfig, diagnostics: &mut Diagnostics) -> Result<RunInputs> {
    let ledger = load_ledger(config, diagnostics)?;
    let tickers = load_tickers(config)?;

    let unmapped = tickers.unmapped_products(ledger.products());
    if !unmapped.is_empty() {
        info!(products = ?unmapped, "traded products without a ticker mapping");
    }
    Ok(RunInputs { ledger, tickers })
}

/// Timeline from the configured (or ledger-derived) start through the
/// configured end or today.
pub fn build_timeline(
    config: &ResolvedConfig,
    ledger: &Ledger,
    clock: &dyn Clock,
    granularity: &Granularity,
) -> Timeline {
    let full = Timeline::for_ledger(ledger, clock, granularity);
    let Some(range) = full.date_range() else {
        return full;
    };
    let start = config.timeline.start.unwrap_or(range.start);
    let end = config.timeline.end.unwrap_or(range.end);
    if start == range.start && end == range.end {
        return full;
    }
    Timeline::build(start, end, granularity)
}

fn service(config: &ResolvedConfig, source: Arc<dyn MarketDataSource>) -> MarketDataService {
    MarketDataService::new(Arc::new(MemoryMarketDataStore::new()), source)
        .with_concurrency(config.market_data.concurrency)
        .with_currencies(&config.home_currency, &config.foreign_currency)
}

/// Every traded product's series plus FX over `range`.
pub async fn fetch_market_data(
    config: &ResolvedConfig,
    inputs: &RunInputs,
    source: Arc<dyn MarketDataSource>,
    range: DateRange,
    diagnostics: &mut Diagnostics,
) -> MarketSnapshot {
    service(config, source)
        .fetch_snapshot(inputs.ledger.products(), &inputs.tickers, range, diagnostics)
        .await
}

/// FX series for pricing trades, fetched only when some trade is foreign.
async fn trade_fx(
    config: &ResolvedConfig,
    ledger: &Ledger,
    source: Arc<dyn MarketDataSource>,
) -> Option<TimeSeries> {
    let needs_fx = ledger.entries().iter().any(|e| {
        e.transaction.as_trade().is_some() && ledger.is_foreign_trade(e)
    });
    if !needs_fx {
        return None;
    }
    let (first, last) = (ledger.first_timestamp()?, ledger.last_timestamp()?);
    let range = DateRange::new(first.date(), last.date());
    match service(config, source).fx_series(range).await {
        Ok(series) => series.filter(|s| !s.is_empty()),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "FX fetch failed, trade prices use ledger rates");
            None
        }
    }
}

async fn valuation_points(
    config: &ResolvedConfig,
    inputs: &RunInputs,
    source: Arc<dyn MarketDataSource>,
    timeline: &Timeline,
    diagnostics: &mut Diagnostics,
) -> Vec<ValuationPoint> {
    let Some(range) = timeline.date_range() else {
        return Vec::new();
    };
    let market = fetch_market_data(config, inputs, source, range, diagnostics).await;
    ValuationAggregator::new(&inputs.ledger, &inputs.tickers, &market)
        .with_default_fx_rate(config.default_fx_rate)
        .valuation(timeline.points(), diagnostics)
}

pub async fn portfolio_history(
    config: &ResolvedConfig,
    source: Arc<dyn MarketDataSource>,
    clock: &dyn Clock,
    granularity: &Granularity,
) -> Result<HistoryOutput> {
    let mut diagnostics = Diagnostics::new();
    let inputs = load_inputs(config, &mut diagnostics)?;
    let timeline = build_timeline(config, &inputs.ledger, clock, granularity);

    let points = valuation_points(config, &inputs, source, &timeline, &mut diagnostics).await;
    let summary = points.last().map(HistorySummary::from_point);

    Ok(HistoryOutput {
        currency: config.home_currency.clone(),
        points,
        summary,
        issues: diagnostics.into_issues(),
    })
}

/// End-of-day position rows for each day of the timeline.
pub async fn position_report(
    config: &ResolvedConfig,
    source: Arc<dyn MarketDataSource>,
    clock: &dyn Clock,
) -> Result<ReportOutput<PositionRow>> {
    let mut diagnostics = Diagnostics::new();
    let inputs = load_inputs(config, &mut diagnostics)?;
    let timeline = build_timeline(config, &inputs.ledger, clock, &Granularity::EndOfDay);

    let points = valuation_points(config, &inputs, source, &timeline, &mut diagnostics).await;
    let rows = position_history(&points, &inputs.tickers);

    Ok(ReportOutput {
        rows,
        issues: diagnostics.into_issues(),
    })
}

pub async fn transaction_report(
    config: &ResolvedConfig,
    source: Arc<dyn MarketDataSource>,
) -> Result<ReportOutput<TransactionRow>> {
    let mut diagnostics = Diagnostics::new();
    let inputs = load_inputs(config, &mut diagnostics)?;
    let fx = trade_fx(config, &inputs.ledger, source).await;

    let rows = transactions_eod(
        &inputs.ledger,
        &inputs.tickers,
        fx.as_ref(),
        config.default_fx_rate,
        &mut diagnostics,
    );

    Ok(ReportOutput {
        rows,
        issues: diagnostics.into_issues(),
    })
}

pub async fn order_report(
    config: &ResolvedConfig,
    source: Arc<dyn MarketDataSource>,
) -> Result<ReportOutput<OrderSummaryRow>> {
    let mut diagnostics = Diagnostics::new();
    let inputs = load_inputs(config, &mut diagnostics)?;
    let fx = trade_fx(config, &inputs.ledger, source).await;

    let rows = order_summary(
        &inputs.ledger,
        &inputs.tickers,
        fx.as_ref(),
        config.default_fx_rate,
        &mut diagnostics,
    );

    Ok(ReportOutput {
        rows,
        issues: diagnostics.into_issues(),
    })
}
