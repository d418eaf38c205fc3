use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use super::TimeSeries;

#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Daily closes for `symbol` in its quote currency, or `None` when unavailable.
    async fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>>;

    /// Daily rates quoted as `foreign` units per one `home` unit.
    async fn fetch_fx_series(
        &self,
        home: &str,
        foreign: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>>;

    fn name(&self) -> &str;
}

/// Source used for offline runs. Never has data.
pub struct NoopSource;

#[async_trait::async_trait]
impl MarketDataSource for NoopSource {
    async fn fetch_price_series(
        &self,
        _symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        Ok(None)
    }

    async fn fetch_fx_series(
        &self,
        _home: &str,
        _foreign: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// In-memory source with fixed series, for tests and replaying saved data.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    prices: HashMap<String, TimeSeries>,
    fx: HashMap<(String, String), TimeSeries>,
    failing: HashSet<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, series: TimeSeries) -> Self {
        self.prices.insert(symbol.to_string(), series);
        self
    }

    /// `series` is foreign units per home unit, as a remote source would quote it.
    pub fn with_fx(mut self, home: &str, foreign: &str, series: TimeSeries) -> Self {
        self.fx
            .insert((home.to_uppercase(), foreign.to_uppercase()), series);
        self
    }

    /// Make every fetch for `symbol` fail.
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

#[async_trait::async_trait]
impl MarketDataSource for StaticSource {
    async fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        if self.failing.contains(symbol) {
            return Err(anyhow!("static failure for {symbol}"));
        }
        Ok(self.prices.get(symbol).map(|s| s.between(start, end)))
    }

    async fn fetch_fx_series(
        &self,
        home: &str,
        foreign: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TimeSeries>> {
        Ok(self
            .fx
            .get(&(home.to_uppercase(), foreign.to_uppercase()))
            .map(|s| s.between(start, end)))
    }

    fn name(&self) -> &str {
        "static"
    }
}
