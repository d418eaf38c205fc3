use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TimeSeries;

/// Inclusive date range for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesKey {
    Price { symbol: String },
    /// Home-currency units per foreign unit, already inverted.
    Fx { home: String, foreign: String },
}

/// Every series the valuation needs, fully populated before it runs.
///
/// Price series are keyed by ledger product name and quoted in the symbol's own
/// currency. The FX series, if any, is home units per foreign unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub prices: HashMap<String, TimeSeries>,
    pub fx: Option<TimeSeries>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, product: impl Into<String>, series: TimeSeries) -> Self {
        self.prices.insert(product.into(), series);
        self
    }

    pub fn with_fx(mut self, series: TimeSeries) -> Self {
        self.fx = Some(series);
        self
    }

    pub fn price(&self, product: &str) -> Option<&TimeSeries> {
        self.prices.get(product)
    }

    pub fn fx(&self) -> Option<&TimeSeries> {
        self.fx.as_ref()
    }
}
