use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw ledger row as read from the broker export, before any parsing.
///
/// Columns are positional; the export's own header text is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLedgerRow {
    /// 1-based data line (header excluded), in original file order.
    pub line: usize,
    pub date: String,
    pub time: String,
    pub value_date: String,
    pub product: String,
    pub security_id: String,
    pub description: String,
    pub fx: String,
    pub currency_moved: String,
    pub amount_moved: String,
    pub balance_currency: String,
    pub balance_amount: String,
    pub order_id: String,
}

impl RawLedgerRow {
    /// Build a row from positional cells. Missing trailing cells are empty.
    pub fn from_fields<S: AsRef<str>>(line: usize, fields: &[S]) -> Self {
        let cell = |idx: usize| {
            fields
                .get(idx)
                .map(|s| s.as_ref().trim().to_string())
                .unwrap_or_default()
        };
        Self {
            line,
            date: cell(0),
            time: cell(1),
            value_date: cell(2),
            product: cell(3),
            security_id: cell(4),
            description: cell(5),
            fx: cell(6),
            currency_moved: cell(7),
            amount_moved: cell(8),
            balance_currency: cell(9),
            balance_amount: cell(10),
            order_id: cell(11),
        }
    }
}

/// A normalised ledger line. Immutable once produced by the normaliser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Position in the source file (1-based, newest first for this export).
    pub line: usize,
    /// Exchange-local date and time of the posting.
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<NaiveDate>,
    /// `None` for pure cash lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_id: Option<String>,
    pub description: String,
    /// Conversion rate stated by the broker on the line, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_moved: Option<String>,
    /// Signed amount in `currency_moved`; `None` when the source was unparsable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_moved: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_currency: Option<String>,
    /// The ledger's own running balance, as stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_amount: Option<Decimal>,
    /// Groups the legs of one broker execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl LedgerRecord {
    pub fn moved_in(&self, currency: &str) -> bool {
        self.currency_moved
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(currency))
    }

    pub fn balance_in(&self, currency: &str) -> bool {
        self.balance_currency
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(currency))
    }
}
