use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Holding of one product at a valuation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub shares: Decimal,
    /// Price per share in the home currency. None when unmapped or unpriced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

/// Valued portfolio state at one timestamp, in the home currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub timestamp: NaiveDateTime,
    /// Value per ledger product. Unmapped or unpriced products are zero.
    pub per_asset_value: BTreeMap<String, Decimal>,
    pub positions: BTreeMap<String, Position>,
    pub cash_value: Decimal,
    /// Gross capital contributed so far.
    pub total_deposits: Decimal,
}

impl ValuationPoint {
    pub fn assets_value(&self) -> Decimal {
        self.per_asset_value.values().copied().sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.cash_value + self.assets_value()
    }

    /// Return on deposited capital in percent; zero when nothing was deposited.
    pub fn gain_percent(&self) -> Decimal {
        if self.total_deposits <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.total_value() - self.total_deposits) / self.total_deposits * Decimal::ONE_HUNDRED
    }
}
