use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::diagnostics::Issue;
use crate::portfolio::ValuationPoint;

/// Headline figures of the last valuation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub as_of: NaiveDateTime,
    pub total_value: Decimal,
    pub cash_value: Decimal,
    pub assets_value: Decimal,
    pub total_deposits: Decimal,
    pub gain_percent: Decimal,
}

impl HistorySummary {
    pub fn from_point(point: &ValuationPoint) -> Self {
        Self {
            as_of: point.timestamp,
            total_value: point.total_value().round_dp(2),
            cash_value: point.cash_value.round_dp(2),
            assets_value: point.assets_value().round_dp(2),
            total_deposits: point.total_deposits.round_dp(2),
            gain_percent: point.gain_percent().round_dp(2),
        }
    }
}

/// Valuation timeline plus everything that degraded it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    pub currency: String,
    pub points: Vec<ValuationPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<HistorySummary>,
    pub issues: Vec<Issue>,
}

/// Rows of one tabular report and the issues met while building it.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput<T> {
    pub rows: Vec<T>,
    pub issues: Vec<Issue>,
}
