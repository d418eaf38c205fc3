use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::debug;

use super::{Position, PositionReplay, ValuationPoint};
use crate::diagnostics::{Diagnostics, Issue};
use crate::ledger::Ledger;
use crate::market_data::MarketSnapshot;
use crate::models::TickerMap;

pub const DEFAULT_FX_RATE: Decimal = Decimal::from_parts(97, 0, 0, false, 2);

/// Values replayed positions against a fully populated market snapshot.
///
/// Pure over its inputs: the same ledger, mapping and snapshot always give the
/// same points for the same timeline.
pub struct ValuationAggregator<'a> {
    replay: PositionReplay,
    tickers: &'a TickerMap,
    market: &'a MarketSnapshot,
    default_fx_rate: Decimal,
}

#[derive(Default)]
struct Shortfalls {
    unpriced: HashMap<String, usize>,
    fx_fallback: usize,
}

impl<'a> ValuationAggregator<'a> {
    pub fn new(ledger: &Ledger, tickers: &'a TickerMap, market: &'a MarketSnapshot) -> Self {
        Self {
            replay: PositionReplay::new(ledger),
            tickers,
            market,
            default_fx_rate: DEFAULT_FX_RATE,
        }
    }

    pub fn with_default_fx_rate(mut self, rate: Decimal) -> Self {
        self.default_fx_rate = rate;
        self
    }

    pub fn replay(&self) -> &PositionReplay {
        &self.replay
    }

    /// One point per timestamp, in the order given.
    pub fn valuation(
        &self,
        timeline: &[NaiveDateTime],
        diagnostics: &mut Diagnostics,
    ) -> Vec<ValuationPoint> {
        for product in self.replay.products() {
            if self.tickers.get(product).is_none() {
                diagnostics.record_once(Issue::MissingMapping {
                    product: product.to_string(),
                });
            }
        }

        let mut shortfalls = Shortfalls::default();
        let points: Vec<ValuationPoint> = timeline
            .iter()
            .map(|t| self.value_at(*t, &mut shortfalls))
            .collect();

        let mut unpriced: Vec<(String, usize)> = shortfalls.unpriced.into_iter().collect();
        unpriced.sort();
        for (product, count) in unpriced {
            diagnostics.record(Issue::UnpricedPoints { product, count });
        }
        if shortfalls.fx_fallback > 0 {
            diagnostics.record(Issue::FxFallback {
                timestamp_count: shortfalls.fx_fallback,
                rate: self.default_fx_rate,
            });
        }

        debug!(points = points.len(), "valuation computed");
        points
    }

    fn value_at(&self, t: NaiveDateTime, shortfalls: &mut Shortfalls) -> ValuationPoint {
        let mut per_asset_value = BTreeMap::new();
        let mut positions = BTreeMap::new();
        let mut used_fallback = false;

        for product in self.replay.products() {
            let shares = self.replay.holdings_as_of(product, t);
            let unit_price = self.tickers.get(product).and_then(|mapping| {
                let price = self.market.price(product).and_then(|s| s.value_as_of(t));
                let Some(price) = price else {
                    if !shares.is_zero() {
                        *shortfalls.unpriced.entry(product.to_string()).or_default() += 1;
                    }
                    return None;
                };
                if !mapping.foreign_quoted {
                    return Some(price);
                }
                let rate = match self.market.fx().and_then(|s| s.value_as_of(t)) {
                    Some(rate) => rate,
                    None => {
                        if !shares.is_zero() {
                            used_fallback = true;
                        }
                        self.default_fx_rate
                    }
                };
                Some(price * rate)
            });

            let value = unit_price.map_or(Decimal::ZERO, |p| shares * p);
            per_asset_value.insert(product.to_string(), value);
            positions.insert(product.to_string(), Position { shares, unit_price });
        }

        if used_fallback {
            shortfalls.fx_fallback += 1;
        }

        ValuationPoint {
            timestamp: t,
            per_asset_value,
            positions,
            cash_value: self.replay.cash_as_of(t),
            total_deposits: self.replay.cumulative_deposits_as_of(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerOptions;
    use crate::market_data::TimeSeries;
    use crate::models::RawLedgerRow;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn noon(day: u32) -> NaiveDateTime {
        d(day).and_hms_opt(12, 0, 0).unwrap()
    }

    fn usd_ledger() -> Ledger {
        let rows = vec![
            RawLedgerRow::from_fields(
                1,
                &["02-01-2024", "10:00", "", "APPLE INC", "US1", "Koop 2 @ 100 USD", "", "USD", "-200", "USD", "0", "o1"],
            ),
            RawLedgerRow::from_fields(
                2,
                &["01-01-2024", "09:00", "", "", "", "iDEAL Deposit", "", "EUR", "500", "EUR", "500", ""],
            ),
        ];
        let mut diagnostics = Diagnostics::new();
        Ledger::from_rows(&rows, &LedgerOptions::default(), &mut diagnostics).unwrap()
    }

    #[test]
    fn defaults_to_documented_fx_rate() {
        assert_eq!(DEFAULT_FX_RATE, dec!(0.97));
    }

    #[test]
    fn foreign_price_without_fx_uses_fallback_rate() {
        let ledger = usd_ledger();
        let tickers = TickerMap::new().with("APPLE INC", "AAPL", true);
        let market = MarketSnapshot::new()
            .with_price("APPLE INC", TimeSeries::new(vec![(d(2), dec!(100))]).unwrap());
        let mut diagnostics = Diagnostics::new();

        let points = ValuationAggregator::new(&ledger, &tickers, &market)
            .valuation(&[noon(1), noon(2), noon(3)], &mut diagnostics);

        assert_eq!(points[0].total_value(), dec!(500));
        assert_eq!(points[1].per_asset_value["APPLE INC"], dec!(194.00));
        assert_eq!(points[2].positions["APPLE INC"].unit_price, Some(dec!(97.00)));
        assert_eq!(
            diagnostics.issues(),
            &[Issue::FxFallback {
                timestamp_count: 2,
                rate: dec!(0.97)
            }]
        );
    }

    #[test]
    fn fx_series_converts_foreign_prices() {
        let ledger = usd_ledger();
        let tickers = TickerMap::new().with("APPLE INC", "AAPL", true);
        let market = MarketSnapshot::new()
            .with_price("APPLE INC", TimeSeries::new(vec![(d(2), dec!(100))]).unwrap())
            .with_fx(TimeSeries::new(vec![(d(1), dec!(0.9))]).unwrap());
        let mut diagnostics = Diagnostics::new();

        let points = ValuationAggregator::new(&ledger, &tickers, &market)
            .valuation(&[noon(2)], &mut diagnostics);

        assert_eq!(points[0].per_asset_value["APPLE INC"], dec!(180));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unmapped_and_unpriced_products_contribute_zero() {
        let ledger = usd_ledger();
        let market = MarketSnapshot::new();
        let mut diagnostics = Diagnostics::new();

        let unmapped = TickerMap::new();
        let points = ValuationAggregator::new(&ledger, &unmapped, &market)
            .valuation(&[noon(3)], &mut diagnostics);
        assert_eq!(points[0].per_asset_value["APPLE INC"], Decimal::ZERO);
        assert_eq!(points[0].positions["APPLE INC"].shares, dec!(2));
        assert_eq!(
            diagnostics.issues(),
            &[Issue::MissingMapping {
                product: "APPLE INC".to_string()
            }]
        );

        let mapped = TickerMap::new().with("APPLE INC", "AAPL", true);
        let mut diagnostics = Diagnostics::new();
        let points = ValuationAggregator::new(&ledger, &mapped, &market)
            .valuation(&[noon(1), noon(3), noon(4)], &mut diagnostics);
        assert!(points.iter().all(|p| p.assets_value().is_zero()));
        assert_eq!(
            diagnostics.issues(),
            &[Issue::UnpricedPoints {
                product: "APPLE INC".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn follows_requested_order() {
        let ledger = usd_ledger();
        let tickers = TickerMap::new();
        let market = MarketSnapshot::new();
        let mut diagnostics = Diagnostics::new();
        let timeline = [noon(3), noon(1), noon(2)];

        let points = ValuationAggregator::new(&ledger, &tickers, &market)
            .valuation(&timeline, &mut diagnostics);
        let stamps: Vec<NaiveDateTime> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, timeline.to_vec());
    }
}
