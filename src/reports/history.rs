use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::portfolio::ValuationPoint;

/// One line of the valuation timeline export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuationRow {
    #[serde(rename = "Timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Cash")]
    pub cash: Decimal,
    #[serde(rename = "Assets")]
    pub assets: Decimal,
    #[serde(rename = "Total")]
    pub total: Decimal,
    #[serde(rename = "Deposits")]
    pub deposits: Decimal,
    #[serde(rename = "Gain_Percent")]
    pub gain_percent: Decimal,
}

pub fn valuation_rows(points: &[ValuationPoint]) -> Vec<ValuationRow> {
    points
        .iter()
        .map(|p| ValuationRow {
            timestamp: p.timestamp,
            cash: p.cash_value.round_dp(2),
            assets: p.assets_value().round_dp(2),
            total: p.total_value().round_dp(2),
            deposits: p.total_deposits.round_dp(2),
            gain_percent: p.gain_percent().round_dp(2),
        })
        .collect()
}

fn serialize_timestamp<S: serde::Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format("%Y-%m-%d %H:%M:%S"))
}
