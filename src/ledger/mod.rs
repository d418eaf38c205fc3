//! Loading a broker ledger: raw rows, normalised records, classified entries.

mod classify;
mod normalize;
mod source;
mod vocabulary;

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use classify::Classifier;
pub use normalize::{normalize_rows, parse_decimal, parse_timestamp};
pub use source::{read_ledger_csv, read_ledger_file};
pub use vocabulary::Vocabulary;

use crate::diagnostics::{Diagnostics, Issue};
use crate::market_data::{value_as_of_or, TimeSeries};
use crate::models::{LedgerEntry, LedgerRecord, RawLedgerRow, Trade, Transaction};

pub const LEDGER_FX_ASSUMPTION: &str =
    "ledger FX field used directly as a multiplier into the home currency";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no usable transaction data in ledger")]
    NoUsableTransactions,
    #[error("failed to read ledger CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to open ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid vocabulary pattern: {0}")]
    Vocabulary(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    pub vocabulary: Vocabulary,
    pub home_currency: String,
    pub foreign_currency: String,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            home_currency: "EUR".to_string(),
            foreign_currency: "USD".to_string(),
        }
    }
}

/// Where a trade's home-currency amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeAmountSource {
    HomeCurrency,
    ConversionLeg,
    LedgerFx,
    FxSeries,
    DefaultRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeAmount {
    pub amount: Decimal,
    pub source: HomeAmountSource,
}

/// Immutable, classified ledger with side indices.
///
/// `records` keep file order; `entries` are chronological with ties broken by
/// file order (newest row last).
#[derive(Debug, Clone)]
pub struct Ledger {
    records: Vec<LedgerRecord>,
    entries: Vec<LedgerEntry>,
    by_order: HashMap<String, Vec<usize>>,
    by_product: BTreeMap<String, Vec<usize>>,
    home_currency: String,
    foreign_currency: String,
    vocabulary: Vocabulary,
}

impl Ledger {
    pub fn from_rows(
        rows: &[RawLedgerRow],
        options: &LedgerOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, LedgerError> {
        let records = normalize_rows(rows, &options.vocabulary, diagnostics);
        Self::from_records(records, options, diagnostics)
    }

    pub fn from_records(
        records: Vec<LedgerRecord>,
        options: &LedgerOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, LedgerError> {
        let classifier = Classifier::new(
            options.vocabulary.clone(),
            &options.home_currency,
            &options.foreign_currency,
        )?;
        let entries = classifier.classify_all(&records, diagnostics);

        if entries
            .iter()
            .all(|e| matches!(e.transaction, Transaction::Ignored))
        {
            return Err(LedgerError::NoUsableTransactions);
        }

        let mut by_order: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_product: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            let record = &records[entry.record];
            if let Some(order_id) = &record.order_id {
                by_order.entry(order_id.clone()).or_default().push(idx);
            }
            if let Some(trade) = entry.transaction.as_trade() {
                by_product.entry(trade.product.clone()).or_default().push(idx);
            }
        }

        info!(
            records = records.len(),
            entries = entries.len(),
            products = by_product.len(),
            "ledger loaded"
        );

        Ok(Self {
            records,
            entries,
            by_order,
            by_product,
            home_currency: options.home_currency.to_uppercase(),
            foreign_currency: options.foreign_currency.to_uppercase(),
            vocabulary: options.vocabulary.clone(),
        })
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn record(&self, entry: &LedgerEntry) -> &LedgerRecord {
        &self.records[entry.record]
    }

    pub fn home_currency(&self) -> &str {
        &self.home_currency
    }

    pub fn foreign_currency(&self) -> &str {
        &self.foreign_currency
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Traded products, sorted.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.by_product.keys().map(String::as_str)
    }

    /// Trades for one product in chronological order.
    pub fn trades_for<'a>(&'a self, product: &str) -> impl Iterator<Item = (&'a LedgerEntry, &'a Trade)> {
        self.by_product
            .get(product)
            .into_iter()
            .flatten()
            .filter_map(|&idx| {
                let entry = &self.entries[idx];
                entry.transaction.as_trade().map(|t| (entry, t))
            })
    }

    /// Every leg sharing an order id, chronological.
    pub fn order_legs<'a>(&'a self, order_id: &str) -> impl Iterator<Item = &'a LedgerEntry> {
        self.by_order
            .get(order_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.entries.first().map(|e| e.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.entries.last().map(|e| e.timestamp)
    }

    /// A trade is foreign when its movement is not in the home currency.
    pub fn is_foreign_trade(&self, entry: &LedgerEntry) -> bool {
        let record = self.record(entry);
        record.currency_moved.is_some() && !record.moved_in(&self.home_currency)
    }

    /// Home-currency value of a trade's cash leg.
    ///
    /// Foreign trades try, in order: the home-currency conversion leg with the
    /// same order id, the ledger's FX field, the FX series as of the trade, and
    /// finally `default_rate`, which is recorded as an FX fallback.
    pub fn trade_home_amount(
        &self,
        entry: &LedgerEntry,
        fx: Option<&TimeSeries>,
        default_rate: Decimal,
        diagnostics: &mut Diagnostics,
    ) -> Option<HomeAmount> {
        entry.transaction.as_trade()?;
        let record = self.record(entry);
        let amount = record.amount_moved?.abs();

        if !self.is_foreign_trade(entry) {
            return Some(HomeAmount {
                amount,
                source: HomeAmountSource::HomeCurrency,
            });
        }

        if let Some(leg) = self.home_conversion_leg(record) {
            return Some(HomeAmount {
                amount: leg,
                source: HomeAmountSource::ConversionLeg,
            });
        }

        if let Some(rate) = record.fx_rate.filter(|r| !r.is_zero()) {
            diagnostics.record_once(Issue::LedgerAssumption {
                note: LEDGER_FX_ASSUMPTION.to_string(),
            });
            return Some(HomeAmount {
                amount: amount * rate,
                source: HomeAmountSource::LedgerFx,
            });
        }

        match fx.and_then(|s| s.value_as_of(entry.timestamp)) {
            Some(rate) => Some(HomeAmount {
                amount: amount * rate,
                source: HomeAmountSource::FxSeries,
            }),
            None => {
                diagnostics.record_once(Issue::TradeFxFallback {
                    line: record.line,
                    rate: default_rate,
                });
                Some(HomeAmount {
                    amount: amount * default_rate,
                    source: HomeAmountSource::DefaultRate,
                })
            }
        }
    }

    /// Per-share price in the home currency.
    pub fn trade_home_price(
        &self,
        entry: &LedgerEntry,
        fx: Option<&TimeSeries>,
        default_rate: Decimal,
        diagnostics: &mut Diagnostics,
    ) -> Option<Decimal> {
        let trade = entry.transaction.as_trade()?;
        let home = self.trade_home_amount(entry, fx, default_rate, diagnostics);
        let price_in_home = trade
            .price_currency
            .as_deref()
            .map_or(!self.is_foreign_trade(entry), |c| {
                c.eq_ignore_ascii_case(&self.home_currency)
            });

        match trade.price_per_share {
            Some(price) if price_in_home => Some(price),
            Some(price) => {
                let record = self.record(entry);
                let rate = match (home, record.amount_moved) {
                    (Some(home), Some(amount)) if !amount.is_zero() => home.amount / amount.abs(),
                    _ => value_as_of_or(fx, entry.timestamp, default_rate),
                };
                Some(price * rate)
            }
            None => {
                let home = home?;
                if trade.share_delta.is_zero() {
                    None
                } else {
                    Some(home.amount / trade.share_delta.abs())
                }
            }
        }
    }

    fn home_conversion_leg(&self, record: &LedgerRecord) -> Option<Decimal> {
        let order_id = record.order_id.as_deref()?;
        self.order_legs(order_id).find_map(|leg| {
            let leg_record = self.record(leg);
            match &leg.transaction {
                Transaction::CurrencyConversion { amount, .. }
                    if leg_record.moved_in(&self.home_currency) =>
                {
                    Some(amount.abs())
                }
                _ => None,
            }
        })
    }
}
