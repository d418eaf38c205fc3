use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::transactions::TransactionKind;
use super::UNMAPPED_TICKER;
use crate::diagnostics::Diagnostics;
use crate::ledger::Ledger;
use crate::market_data::TimeSeries;
use crate::models::{ChargeKind, TickerMap, Transaction};

/// Cost breakdown of one broker order, money in the home currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummaryRow {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Type")]
    pub kind: TransactionKind,
    #[serde(rename = "Shares")]
    pub shares: Decimal,
    /// As stated after `@`, in the quote currency.
    #[serde(rename = "Price_Per_Share")]
    pub price_per_share: Option<Decimal>,
    #[serde(rename = "Transaction_Amount")]
    pub transaction_amount: Decimal,
    #[serde(rename = "Transaction_Costs")]
    pub transaction_costs: Decimal,
    #[serde(rename = "Transaction_Tax")]
    pub transaction_tax: Decimal,
    /// Conversion cost is embedded in the applied rate, so this is always zero.
    #[serde(rename = "Currency_Costs")]
    pub currency_costs: Decimal,
    #[serde(rename = "Total_Costs")]
    pub total_costs: Decimal,
    #[serde(rename = "Total_Amount")]
    pub total_amount: Decimal,
    #[serde(rename = "Currency")]
    pub currency: String,
}

/// One row per order id with a trade leg, newest first.
pub fn order_summary(
    ledger: &Ledger,
    tickers: &TickerMap,
    fx: Option<&TimeSeries>,
    default_rate: Decimal,
    diagnostics: &mut Diagnostics,
) -> Vec<OrderSummaryRow> {
    let order_ids: BTreeSet<&str> = ledger
        .entries()
        .iter()
        .filter_map(|e| e.transaction.as_trade())
        .filter_map(|t| t.order_id.as_deref())
        .collect();

    let mut rows = Vec::with_capacity(order_ids.len());
    for order_id in order_ids {
        let Some((entry, trade)) = ledger
            .order_legs(order_id)
            .find_map(|e| e.transaction.as_trade().map(|t| (e, t)))
        else {
            continue;
        };

        let mut costs = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        for leg in ledger.order_legs(order_id) {
            if let Transaction::FeeOrTax { kind, amount } = &leg.transaction {
                match kind {
                    ChargeKind::Fee => costs += *amount,
                    ChargeKind::Tax => tax += *amount,
                }
            }
        }
        let costs = costs.abs();
        let tax = tax.abs();
        let total_costs = costs + tax;

        let amount = ledger
            .trade_home_amount(entry, fx, default_rate, diagnostics)
            .map_or(Decimal::ZERO, |h| h.amount);
        let (kind, total_amount) = if trade.is_sell() {
            (TransactionKind::Sell, amount - total_costs)
        } else {
            (TransactionKind::Buy, amount + total_costs)
        };

        let currency = ledger
            .record(entry)
            .currency_moved
            .clone()
            .unwrap_or_else(|| ledger.home_currency().to_string());

        rows.push(OrderSummaryRow {
            order_id: order_id.to_string(),
            date: entry.timestamp.date(),
            time: entry.timestamp.format("%H:%M").to_string(),
            ticker: tickers
                .symbol(&trade.product)
                .unwrap_or(UNMAPPED_TICKER)
                .to_string(),
            product: trade.product.clone(),
            kind,
            shares: trade.share_delta.abs(),
            price_per_share: trade.price_per_share,
            transaction_amount: amount.round_dp(2),
            transaction_costs: costs.round_dp(2),
            transaction_tax: tax.round_dp(2),
            currency_costs: Decimal::ZERO,
            total_costs: total_costs.round_dp(2),
            total_amount: total_amount.round_dp(2),
            currency,
        });
    }

    rows.sort_by_key(|r| Reverse((r.date, r.time.clone())));
    rows
}
