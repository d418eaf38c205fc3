use std::cmp::Reverse;
use std::collections::HashMap;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use super::normalize::parse_decimal;
use super::Vocabulary;
use crate::diagnostics::{Diagnostics, Issue};
use crate::models::{
    CashMovementKind, ChargeKind, LedgerEntry, LedgerRecord, Trade, Transaction,
};

/// Maps normalised records to exactly one `Transaction` each.
#[derive(Debug, Clone)]
pub struct Classifier {
    vocabulary: Vocabulary,
    home_currency: String,
    foreign_currency: String,
    trade_pattern: Option<Regex>,
    price_pattern: Regex,
}

impl Classifier {
    pub fn new(
        vocabulary: Vocabulary,
        home_currency: &str,
        foreign_currency: &str,
    ) -> Result<Self, regex::Error> {
        let mut verbs: Vec<&str> = vocabulary
            .buy_verbs
            .iter()
            .chain(vocabulary.sell_verbs.iter())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        // Longest first so a verb that contains another still wins the alternation.
        verbs.sort_by_key(|v| Reverse(v.len()));

        let trade_pattern = if verbs.is_empty() {
            None
        } else {
            let alternation = verbs
                .iter()
                .map(|v| regex::escape(v))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(
                r"\b(?P<verb>{alternation})\b(?:\s+(?P<shares>\d+))?"
            ))?)
        };

        Ok(Self {
            vocabulary,
            home_currency: home_currency.to_uppercase(),
            foreign_currency: foreign_currency.to_uppercase(),
            trade_pattern,
            price_pattern: Regex::new(r"@\s*(?P<price>[\d.,]+)\s*(?P<currency>[A-Z]{3})?")?,
        })
    }

    /// A trade line without a share count is kept as a zero-share trade and
    /// recorded as a malformed `shares` field.
    pub fn classify(&self, record: &LedgerRecord, diagnostics: &mut Diagnostics) -> Transaction {
        if let Some(trade) = self.classify_trade(record, diagnostics) {
            return Transaction::Trade(trade);
        }

        let amount = match record.amount_moved {
            Some(amount) if !amount.is_zero() => amount,
            _ => return Transaction::Ignored,
        };
        let description = record.description.as_str();
        let vocab = &self.vocabulary;

        if vocab.is_conversion(description) {
            let moved = record
                .currency_moved
                .clone()
                .unwrap_or_else(|| self.home_currency.clone());
            let other = if moved == self.home_currency {
                self.foreign_currency.clone()
            } else {
                self.home_currency.clone()
            };
            let (from_currency, to_currency) = if amount.is_sign_negative() {
                (moved, other)
            } else {
                (other, moved)
            };
            return Transaction::CurrencyConversion {
                from_currency,
                to_currency,
                amount,
                counterpart_order_id: record.order_id.clone(),
            };
        }

        if vocab.is_fee(description) {
            return Transaction::FeeOrTax {
                kind: ChargeKind::Fee,
                amount,
            };
        }
        if vocab.is_tax(description) {
            return Transaction::FeeOrTax {
                kind: ChargeKind::Tax,
                amount,
            };
        }

        let kind = if vocab.is_transfer(description) {
            CashMovementKind::Transfer
        } else if vocab.is_withdrawal(description) {
            CashMovementKind::Withdrawal
        } else if vocab.is_deposit(description) {
            CashMovementKind::Deposit
        } else {
            CashMovementKind::Other
        };
        Transaction::CashMovement { kind, amount }
    }

    fn classify_trade(&self, record: &LedgerRecord, diagnostics: &mut Diagnostics) -> Option<Trade> {
        let product = record.product.as_ref()?;
        let captures = self.trade_pattern.as_ref()?.captures(&record.description)?;
        let verb = captures.name("verb")?.as_str();

        let shares = match captures
            .name("shares")
            .and_then(|m| Decimal::from_str(m.as_str()).ok())
        {
            Some(shares) => shares,
            None => {
                diagnostics.record(Issue::MalformedField {
                    line: record.line,
                    field: "shares".to_string(),
                    raw: record.description.clone(),
                });
                Decimal::ZERO
            }
        };
        let is_sell = self.vocabulary.sell_verbs.iter().any(|v| v.trim() == verb);
        let share_delta = if is_sell { -shares } else { shares };

        let (price_per_share, price_currency) = match self.stated_price(&record.description) {
            Some((price, currency)) => (Some(price), currency),
            None => (derived_price(record.amount_moved, share_delta), record.currency_moved.clone()),
        };

        Some(Trade {
            product: product.clone(),
            share_delta,
            price_per_share,
            price_currency,
            order_id: record.order_id.clone(),
        })
    }

    /// Price and currency from an `@ <price> [CCY]` token.
    pub fn stated_price(&self, description: &str) -> Option<(Decimal, Option<String>)> {
        let captures = self.price_pattern.captures(description)?;
        let raw = captures.name("price")?.as_str();
        let raw = raw.trim_end_matches(['.', ',']);
        let price = parse_decimal(raw).ok().flatten()?;
        let currency = captures.name("currency").map(|m| m.as_str().to_string());
        Some((price, currency))
    }

    /// Classify every record, collapse repeated trade confirmations and return
    /// entries in chronological order.
    ///
    /// Ties at equal timestamps resolve by original file order, most recent
    /// (lowest line) last, since the export lists newest rows first.
    pub fn classify_all(
        &self,
        records: &[LedgerRecord],
        diagnostics: &mut Diagnostics,
    ) -> Vec<LedgerEntry> {
        let entries: Vec<LedgerEntry> = records
            .iter()
            .enumerate()
            .map(|(idx, record)| LedgerEntry {
                record: idx,
                line: record.line,
                timestamp: record.timestamp,
                transaction: self.classify(record, diagnostics),
            })
            .collect();

        let mut entries = dedup_trade_confirmations(entries, records);
        entries.sort_by_key(|e| (e.timestamp, Reverse(e.line)));
        entries
    }
}

fn derived_price(amount: Option<Decimal>, share_delta: Decimal) -> Option<Decimal> {
    let amount = amount?;
    if share_delta.is_zero() {
        return None;
    }
    amount.abs().checked_div(share_delta.abs())
}

/// Keep the most recently reported trade row per `(order id, description)`.
fn dedup_trade_confirmations(
    entries: Vec<LedgerEntry>,
    records: &[LedgerRecord],
) -> Vec<LedgerEntry> {
    let mut winners: HashMap<(String, String), usize> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        let Some(key) = dedup_key(entry, records) else {
            continue;
        };
        match winners.get(&key) {
            Some(&current) if !supersedes(entry, &entries[current]) => {}
            _ => {
                winners.insert(key, idx);
            }
        }
    }

    let before = entries.len();
    let kept: Vec<LedgerEntry> = entries
        .into_iter()
        .enumerate()
        .filter(|(idx, entry)| match dedup_key(entry, records) {
            Some(key) => winners.get(&key) == Some(idx),
            None => true,
        })
        .map(|(_, entry)| entry)
        .collect();

    if kept.len() != before {
        debug!(removed = before - kept.len(), "collapsed repeated trade confirmations");
    }
    kept
}

fn dedup_key(entry: &LedgerEntry, records: &[LedgerRecord]) -> Option<(String, String)> {
    let trade = entry.transaction.as_trade()?;
    let order_id = trade.order_id.clone()?;
    let description = records.get(entry.record)?.description.clone();
    Some((order_id, description))
}

fn supersedes(candidate: &LedgerEntry, current: &LedgerEntry) -> bool {
    (candidate.timestamp, Reverse(candidate.line)) > (current.timestamp, Reverse(current.line))
}
