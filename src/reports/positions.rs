use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{CASH_TICKER, PORTFOLIO_TICKER, UNMAPPED_TICKER};
use crate::models::TickerMap;
use crate::portfolio::ValuationPoint;

/// Per-date holding value, plus cash and portfolio pseudo-rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Shares")]
    pub shares: Decimal,
    #[serde(rename = "Value_Per_Share")]
    pub value_per_share: Decimal,
    #[serde(rename = "Total_Value")]
    pub total_value: Decimal,
}

impl PositionRow {
    fn pseudo(date: NaiveDate, ticker: &str, name: &str, value: Decimal) -> Self {
        Self {
            date,
            ticker: ticker.to_string(),
            name: name.to_string(),
            shares: Decimal::ONE,
            value_per_share: value.round_dp(4),
            total_value: value.round_dp(2),
        }
    }
}

/// Expand valuation points into per-position rows.
///
/// Each point yields a `CASH` row, one row per held and priced product, then a
/// `PORTFOLIO` row carrying the point's total.
pub fn position_history(points: &[ValuationPoint], tickers: &TickerMap) -> Vec<PositionRow> {
    let mut rows = Vec::new();

    for point in points {
        let date = point.timestamp.date();
        rows.push(PositionRow::pseudo(date, CASH_TICKER, "Cash", point.cash_value));

        for (product, position) in &point.positions {
            let Some(unit_price) = position.unit_price else {
                continue;
            };
            if position.shares.is_zero() {
                continue;
            }
            let value = point
                .per_asset_value
                .get(product)
                .copied()
                .unwrap_or(position.shares * unit_price);
            rows.push(PositionRow {
                date,
                ticker: tickers
                    .symbol(product)
                    .unwrap_or(UNMAPPED_TICKER)
                    .to_string(),
                name: product.clone(),
                shares: position.shares,
                value_per_share: unit_price.round_dp(4),
                total_value: value.round_dp(2),
            });
        }

        rows.push(PositionRow::pseudo(
            date,
            PORTFOLIO_TICKER,
            "Total Portfolio",
            point.total_value(),
        ));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Position;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn point() -> ValuationPoint {
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let mut positions = BTreeMap::new();
        positions.insert(
            "ACME".to_string(),
            Position {
                shares: dec!(10),
                unit_price: Some(dec!(12)),
            },
        );
        positions.insert(
            "SOLD OUT".to_string(),
            Position {
                shares: Decimal::ZERO,
                unit_price: Some(dec!(5)),
            },
        );
        positions.insert(
            "NO QUOTE".to_string(),
            Position {
                shares: dec!(3),
                unit_price: None,
            },
        );
        let mut per_asset_value = BTreeMap::new();
        per_asset_value.insert("ACME".to_string(), dec!(120));

        ValuationPoint {
            timestamp,
            per_asset_value,
            positions,
            cash_value: dec!(900),
            total_deposits: dec!(1000),
        }
    }

    #[test]
    fn cash_first_then_priced_holdings_then_total() {
        let tickers = TickerMap::new().with("ACME", "ACME.AS", false);

        let rows = position_history(&[point()], &tickers);

        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["CASH", "ACME.AS", "PORTFOLIO"]);
        assert_eq!(rows[0].total_value, dec!(900));
        assert_eq!(rows[1].shares, dec!(10));
        assert_eq!(rows[1].total_value, dec!(120));
        assert_eq!(rows[2].name, "Total Portfolio");
        assert_eq!(rows[2].total_value, dec!(1020));
    }
}
