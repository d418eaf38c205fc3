//! Raw ledger rows to typed `LedgerRecord`s.
//!
//! The export uses `,` as decimal separator and `dd-mm-yyyy` dates. Numeric
//! cells that cannot be parsed become `None` and are reported; rows whose
//! timestamp cannot be built are dropped and reported. Output keeps file order.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::Vocabulary;
use crate::diagnostics::{Diagnostics, Issue};
use crate::models::{LedgerRecord, RawLedgerRow};

const DATE_FORMAT: &str = "%d-%m-%Y";

pub fn normalize_rows(
    rows: &[RawLedgerRow],
    vocabulary: &Vocabulary,
    diagnostics: &mut Diagnostics,
) -> Vec<LedgerRecord> {
    rows.iter()
        .filter_map(|row| normalize_row(row, vocabulary, diagnostics))
        .collect()
}

fn normalize_row(
    row: &RawLedgerRow,
    vocabulary: &Vocabulary,
    diagnostics: &mut Diagnostics,
) -> Option<LedgerRecord> {
    let amount_moved = decimal_field(row.line, "amount_moved", &row.amount_moved, diagnostics);

    if vocabulary.is_noise_description(&row.description) && amount_moved == Some(Decimal::ZERO) {
        diagnostics.record(Issue::NoiseFiltered { line: row.line });
        return None;
    }

    let timestamp = match parse_timestamp(&row.date, &row.time) {
        Some(ts) => ts,
        None => {
            diagnostics.record(Issue::DroppedRow {
                line: row.line,
                reason: format!("unparsable timestamp {:?} {:?}", row.date, row.time),
            });
            return None;
        }
    };

    Some(LedgerRecord {
        line: row.line,
        timestamp,
        value_date: parse_date(&row.value_date),
        product: non_empty(&row.product),
        security_id: non_empty(&row.security_id),
        description: row.description.trim().to_string(),
        fx_rate: decimal_field(row.line, "fx", &row.fx, diagnostics),
        currency_moved: non_empty(&row.currency_moved).map(|c| c.to_uppercase()),
        amount_moved,
        balance_currency: non_empty(&row.balance_currency).map(|c| c.to_uppercase()),
        balance_amount: decimal_field(row.line, "balance_amount", &row.balance_amount, diagnostics),
        order_id: non_empty(&row.order_id),
    })
}

/// Parse a comma-decimal cell. Empty cells are `None` without a report.
pub fn parse_decimal(raw: &str) -> Result<Option<Decimal>, rust_decimal::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(&raw.replace(',', ".")).map(Some)
}

fn decimal_field(
    line: usize,
    field: &str,
    raw: &str,
    diagnostics: &mut Diagnostics,
) -> Option<Decimal> {
    match parse_decimal(raw) {
        Ok(value) => value,
        Err(_) => {
            diagnostics.record(Issue::MalformedField {
                line,
                field: field.to_string(),
                raw: raw.to_string(),
            });
            None
        }
    }
}

/// Combine a `dd-mm-yyyy` date with an optional `HH:MM[:SS]` time (default 00:00).
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = parse_date(date)?;
    let time = time.trim();
    let time = if time.is_empty() {
        NaiveTime::MIN
    } else {
        NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .ok()?
    };
    Some(date.and_time(time))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
