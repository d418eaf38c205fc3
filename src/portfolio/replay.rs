//! Point-in-time holdings, cash and deposits from a classified ledger.
//!
//! Everything is pre-sorted once into cumulative step series; each query is a
//! binary search for the last step at or before the query time.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::debug;

use crate::ledger::Ledger;
use crate::models::{CashMovementKind, Transaction};

type Steps = Vec<(NaiveDateTime, Decimal)>;

#[derive(Debug, Clone, Default)]
pub struct PositionReplay {
    holdings: BTreeMap<String, Steps>,
    cash: Steps,
    deposits: Steps,
}

impl PositionReplay {
    pub fn new(ledger: &Ledger) -> Self {
        let mut holdings = BTreeMap::new();
        for product in ledger.products() {
            let mut running = Decimal::ZERO;
            let steps: Steps = ledger
                .trades_for(product)
                .map(|(entry, trade)| {
                    running += trade.share_delta;
                    (entry.timestamp, running)
                })
                .collect();
            holdings.insert(product.to_string(), steps);
        }

        // The broker's own running balance is trusted rather than re-derived.
        // Only home-currency, non-transfer lines with a known balance qualify.
        let home = ledger.home_currency();
        let vocabulary = ledger.vocabulary();
        let mut cash: Vec<(NaiveDateTime, usize, Decimal)> = ledger
            .records()
            .iter()
            .filter(|r| r.balance_in(home) && !vocabulary.is_transfer(&r.description))
            .filter_map(|r| r.balance_amount.map(|b| (r.timestamp, r.line, b)))
            .collect();
        // Equal timestamps: the row nearest the top of the file is the newest.
        cash.sort_by_key(|(ts, line, _)| (*ts, Reverse(*line)));
        let cash: Steps = cash.into_iter().map(|(ts, _, b)| (ts, b)).collect();

        let mut running = Decimal::ZERO;
        let deposits: Steps = ledger
            .entries()
            .iter()
            .filter_map(|e| match &e.transaction {
                Transaction::CashMovement {
                    kind: CashMovementKind::Deposit,
                    amount,
                } => {
                    running += *amount;
                    Some((e.timestamp, running))
                }
                _ => None,
            })
            .collect();

        debug!(
            products = holdings.len(),
            cash_points = cash.len(),
            deposits = deposits.len(),
            "ledger replayed"
        );

        Self {
            holdings,
            cash,
            deposits,
        }
    }

    /// Products that were ever traded, sorted.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.holdings.keys().map(String::as_str)
    }

    /// Net shares of `product` traded at or before `t`. May be negative.
    pub fn holdings_as_of(&self, product: &str, t: NaiveDateTime) -> Decimal {
        self.holdings
            .get(product)
            .map_or(Decimal::ZERO, |steps| step_value(steps, t))
    }

    /// The ledger's stated home-currency balance at or before `t`.
    pub fn cash_as_of(&self, t: NaiveDateTime) -> Decimal {
        step_value(&self.cash, t)
    }

    /// Gross deposits at or before `t`. Withdrawals are not netted.
    pub fn cumulative_deposits_as_of(&self, t: NaiveDateTime) -> Decimal {
        step_value(&self.deposits, t)
    }
}

fn step_value(steps: &[(NaiveDateTime, Decimal)], t: NaiveDateTime) -> Decimal {
    let idx = steps.partition_point(|(ts, _)| *ts <= t);
    idx.checked_sub(1)
        .map_or(Decimal::ZERO, |i| steps[i].1)
}
