use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::{DateRange, MarketDataSource, MarketDataStore, MarketSnapshot, SeriesKey, TimeSeries};
use crate::diagnostics::{Diagnostics, Issue};
use crate::models::TickerMap;

const DEFAULT_CONCURRENCY: usize = 4;

pub struct MarketDataService {
    store: Arc<dyn MarketDataStore>,
    source: Arc<dyn MarketDataSource>,
    concurrency: usize,
    home_currency: String,
    foreign_currency: String,
}

impl MarketDataService {
    pub fn new(store: Arc<dyn MarketDataStore>, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            store,
            source,
            concurrency: DEFAULT_CONCURRENCY,
            home_currency: "EUR".to_string(),
            foreign_currency: "USD".to_string(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_currencies(mut self, home: &str, foreign: &str) -> Self {
        self.home_currency = home.to_uppercase();
        self.foreign_currency = foreign.to_uppercase();
        self
    }

    /// Daily closes for one symbol, from the run cache or the source.
    pub async fn price_series(&self, symbol: &str, range: DateRange) -> Result<Option<TimeSeries>> {
        let key = SeriesKey::Price {
            symbol: symbol.to_string(),
        };
        if let Some(series) = self.store.get_series(&key, range).await? {
            debug!(symbol, "price series found in cache");
            return Ok(Some(series));
        }

        let series = self
            .source
            .fetch_price_series(symbol, range.start, range.end)
            .await
            .with_context(|| format!("Failed to fetch prices for {symbol} from {}", self.source.name()))?;

        if let Some(series) = &series {
            self.store.put_series(&key, range, series).await?;
            debug!(symbol, samples = series.len(), source = self.source.name(), "price series fetched");
        }
        Ok(series)
    }

    /// Home-currency units per foreign unit. The source's quote is inverted once here.
    pub async fn fx_series(&self, range: DateRange) -> Result<Option<TimeSeries>> {
        let key = SeriesKey::Fx {
            home: self.home_currency.clone(),
            foreign: self.foreign_currency.clone(),
        };
        if let Some(series) = self.store.get_series(&key, range).await? {
            return Ok(Some(series));
        }

        let quoted = self
            .source
            .fetch_fx_series(&self.home_currency, &self.foreign_currency, range.start, range.end)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch {}/{} rates from {}",
                    self.home_currency,
                    self.foreign_currency,
                    self.source.name()
                )
            })?;

        let Some(quoted) = quoted else {
            return Ok(None);
        };
        let series = quoted.inverted();
        self.store.put_series(&key, range, &series).await?;
        Ok(Some(series))
    }

    /// Fetch every mapped product's series concurrently, each into its own slot.
    ///
    /// A failed or empty fetch for one product is recorded and leaves that
    /// product without a series; it never aborts the others.
    pub async fn fetch_snapshot<'a, I>(
        &self,
        products: I,
        tickers: &TickerMap,
        range: DateRange,
        diagnostics: &mut Diagnostics,
    ) -> MarketSnapshot
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut jobs: Vec<(String, String)> = products
            .into_iter()
            .filter_map(|product| {
                tickers
                    .symbol(product)
                    .map(|symbol| (product.to_string(), symbol.to_string()))
            })
            .collect();
        jobs.sort();
        jobs.dedup();
        let needs_fx = jobs.iter().any(|(product, _)| tickers.is_foreign_quoted(product));

        info!(
            products = jobs.len(),
            needs_fx,
            source = self.source.name(),
            start = %range.start,
            end = %range.end,
            "fetching market data"
        );

        let mut results: Vec<(String, String, Result<Option<TimeSeries>>)> = stream::iter(jobs)
            .map(|(product, symbol)| async move {
                let result = self.price_series(&symbol, range).await;
                (product, symbol, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut snapshot = MarketSnapshot::new();
        for (product, symbol, result) in results {
            match result {
                Ok(Some(series)) if !series.is_empty() => {
                    snapshot.prices.insert(product, series);
                }
                Ok(_) => diagnostics.record(Issue::MissingMarketData {
                    product,
                    symbol,
                    reason: "no samples in range".to_string(),
                }),
                Err(err) => diagnostics.record(Issue::MissingMarketData {
                    product,
                    symbol,
                    reason: format!("{err:#}"),
                }),
            }
        }

        if needs_fx {
            match self.fx_series(range).await {
                Ok(Some(series)) if !series.is_empty() => snapshot.fx = Some(series),
                Ok(_) => warn!(
                    home = %self.home_currency,
                    foreign = %self.foreign_currency,
                    "no FX samples in range"
                ),
                Err(err) => warn!(error = %format!("{err:#}"), "FX fetch failed"),
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{MemoryMarketDataStore, StaticSource};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    struct CountingSource {
        inner: StaticSource,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for CountingSource {
        async fn fetch_price_series(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Option<TimeSeries>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_price_series(symbol, start, end).await
        }

        async fn fetch_fx_series(
            &self,
            home: &str,
            foreign: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Option<TimeSeries>> {
            self.inner.fetch_fx_series(home, foreign, start, end).await
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn price_series_is_cached_for_the_run() -> Result<()> {
        let source = Arc::new(CountingSource {
            inner: StaticSource::new()
                .with_price("ASML.AS", TimeSeries::new(vec![(d(2), dec!(600))])?),
            calls: AtomicUsize::new(0),
        });
        let service = MarketDataService::new(Arc::new(MemoryMarketDataStore::new()), source.clone());
        let range = DateRange::new(d(1), d(31));

        service.price_series("ASML.AS", range).await?;
        let second = service.price_series("ASML.AS", range).await?;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.map(|s| s.len()), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_isolates_failures_and_inverts_fx() -> Result<()> {
        let source = StaticSource::new()
            .with_price("AAPL", TimeSeries::new(vec![(d(2), dec!(185))])?)
            .with_failure("BROKEN")
            .with_fx("EUR", "USD", TimeSeries::new(vec![(d(2), dec!(1.25))])?);
        let service = MarketDataService::new(Arc::new(MemoryMarketDataStore::new()), Arc::new(source))
            .with_concurrency(2);
        let tickers = TickerMap::new()
            .with("APPLE INC", "AAPL", true)
            .with("BROKEN CO", "BROKEN", false)
            .with("EMPTY CO", "NOTHING", false);

        let mut diagnostics = Diagnostics::new();
        let snapshot = service
            .fetch_snapshot(
                ["APPLE INC", "BROKEN CO", "EMPTY CO", "UNMAPPED"],
                &tickers,
                DateRange::new(d(1), d(31)),
                &mut diagnostics,
            )
            .await;

        assert!(snapshot.price("APPLE INC").is_some());
        assert!(snapshot.price("BROKEN CO").is_none());
        assert_eq!(snapshot.fx().and_then(|s| s.samples().first().map(|p| p.1)), Some(dec!(0.8)));

        let missing: Vec<&str> = diagnostics
            .issues()
            .iter()
            .filter_map(|i| match i {
                Issue::MissingMarketData { product, .. } => Some(product.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["BROKEN CO", "EMPTY CO"]);
        Ok(())
    }
}
