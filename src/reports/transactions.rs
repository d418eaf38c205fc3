use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{CASH_TICKER, UNMAPPED_TICKER};
use crate::diagnostics::Diagnostics;
use crate::ledger::Ledger;
use crate::market_data::TimeSeries;
use crate::models::{CashMovementKind, TickerMap, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
    CashTransfer,
}

/// One trade or cash movement, amounts in the home currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Transaction_Time")]
    pub time: String,
    #[serde(rename = "Type")]
    pub kind: TransactionKind,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Shares")]
    pub shares: Option<Decimal>,
    #[serde(rename = "Price_Per_Share")]
    pub price_per_share: Option<Decimal>,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "Cash_Balance")]
    pub cash_balance: Option<Decimal>,
}

/// Trades and product-less cash movements, oldest first.
///
/// Conversion legs, fees and taxes are left out; they are part of the
/// order they belong to.
pub fn transactions_eod(
    ledger: &Ledger,
    tickers: &TickerMap,
    fx: Option<&TimeSeries>,
    default_rate: Decimal,
    diagnostics: &mut Diagnostics,
) -> Vec<TransactionRow> {
    let mut rows = Vec::new();

    for entry in ledger.entries() {
        let record = ledger.record(entry);
        let base = |kind, ticker: String, name: String| TransactionRow {
            date: entry.timestamp.date(),
            time: entry.timestamp.format("%H:%M:%S").to_string(),
            kind,
            ticker,
            name,
            description: record.description.clone(),
            shares: None,
            price_per_share: None,
            amount: Decimal::ZERO,
            cash_balance: record.balance_amount.map(|b| b.round_dp(2)),
        };

        match &entry.transaction {
            Transaction::Trade(trade) => {
                let kind = if trade.is_sell() {
                    TransactionKind::Sell
                } else {
                    TransactionKind::Buy
                };
                let ticker = tickers
                    .symbol(&trade.product)
                    .unwrap_or(UNMAPPED_TICKER)
                    .to_string();
                let amount = ledger
                    .trade_home_amount(entry, fx, default_rate, diagnostics)
                    .map_or(Decimal::ZERO, |h| h.amount);
                let price = ledger.trade_home_price(entry, fx, default_rate, diagnostics);

                rows.push(TransactionRow {
                    shares: Some(trade.share_delta),
                    price_per_share: price.map(|p| p.round_dp(4)),
                    amount: amount.round_dp(2),
                    ..base(kind, ticker, trade.product.clone())
                });
            }
            Transaction::CashMovement { kind, amount } if record.product.is_none() => {
                let kind = match kind {
                    CashMovementKind::Deposit => TransactionKind::Deposit,
                    CashMovementKind::Withdrawal => TransactionKind::Withdrawal,
                    CashMovementKind::Transfer | CashMovementKind::Other => {
                        TransactionKind::CashTransfer
                    }
                };
                rows.push(TransactionRow {
                    amount: amount.round_dp(2),
                    ..base(kind, CASH_TICKER.to_string(), "Cash".to_string())
                });
            }
            _ => {}
        }
    }

    rows.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
    rows
}
