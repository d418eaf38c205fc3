use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashMovementKind {
    Deposit,
    Withdrawal,
    /// Internal transfer or money-market sweep.
    Transfer,
    /// Any other cash posting (dividends, interest, corrections).
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    Fee,
    Tax,
}

/// A buy or sell attributed to one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub product: String,
    /// Signed share count; negative for sells.
    pub share_delta: Decimal,
    /// Price per share in the quoted currency. Only used for per-trade reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_share: Option<Decimal>,
    /// Currency code following the `@ <price>` token, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl Trade {
    pub fn is_sell(&self) -> bool {
        self.share_delta.is_sign_negative() && !self.share_delta.is_zero()
    }
}

/// Typed interpretation of one ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transaction {
    Trade(Trade),
    CashMovement {
        kind: CashMovementKind,
        amount: Decimal,
    },
    FeeOrTax {
        kind: ChargeKind,
        amount: Decimal,
    },
    CurrencyConversion {
        from_currency: String,
        to_currency: String,
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        counterpart_order_id: Option<String>,
    },
    /// Zero-amount or unparsable noise.
    Ignored,
}

impl Transaction {
    pub fn as_trade(&self) -> Option<&Trade> {
        match self {
            Transaction::Trade(trade) => Some(trade),
            _ => None,
        }
    }

    pub fn is_deposit(&self) -> bool {
        matches!(
            self,
            Transaction::CashMovement {
                kind: CashMovementKind::Deposit,
                ..
            }
        )
    }
}

/// A classified transaction together with its source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Index into the ledger's records (file order).
    pub record: usize,
    /// Source line, kept for ordering ties and reporting.
    pub line: usize,
    pub timestamp: NaiveDateTime,
    pub transaction: Transaction,
}
