//! Tabular projections over the ledger and valuation results.

mod history;
mod orders;
mod positions;
mod transactions;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

pub use history::{valuation_rows, ValuationRow};
pub use orders::{order_summary, OrderSummaryRow};
pub use positions::{position_history, PositionRow};
pub use transactions::{transactions_eod, TransactionKind, TransactionRow};

pub const CASH_TICKER: &str = "CASH";
pub const PORTFOLIO_TICKER: &str = "PORTFOLIO";
pub const UNMAPPED_TICKER: &str = "N/A";

/// Serialise rows as CSV with a header taken from the row type.
pub fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row).context("Failed to serialise report row")?;
    }
    csv.flush().context("Failed to flush report")?;
    Ok(())
}

pub fn write_csv_file<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    write_csv(rows, file)
}
