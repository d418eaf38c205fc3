use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use super::LedgerError;
use crate::models::RawLedgerRow;

/// Read the broker's account export.
///
/// The header row is skipped without being interpreted; columns are taken by
/// position. Rows may be shorter than the full column set.
pub fn read_ledger_csv<R: Read>(reader: R) -> Result<Vec<RawLedgerRow>, LedgerError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, record) in csv.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let fields: Vec<&str> = record.iter().collect();
        rows.push(RawLedgerRow::from_fields(idx + 1, &fields));
    }
    debug!(rows = rows.len(), "read ledger rows");
    Ok(rows)
}

pub fn read_ledger_file(path: &Path) -> Result<Vec<RawLedgerRow>, LedgerError> {
    let file = File::open(path)?;
    read_ledger_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_positional_columns_and_skips_blank_lines() -> anyhow::Result<()> {
        let data = "Datum,Tijd,Valutadatum,Product,ISIN,Omschrijving,FX,Mutatie,,Saldo,,Order Id\n\
                    02-01-2024,10:15,02-01-2024,ACME CORP,NL0000000001,\"Koop 2 @ 100,00 EUR\",,EUR,\"-200,00\",EUR,\"800,00\",abc-1\n\
                    ,,,,,,,,,,,\n\
                    01-01-2024,09:00,01-01-2024,,,iDEAL Deposit,,EUR,\"1000,00\",EUR,\"1000,00\"\n";
        let rows = read_ledger_csv(data.as_bytes())?;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[0].product, "ACME CORP");
        assert_eq!(rows[0].description, "Koop 2 @ 100,00 EUR");
        assert_eq!(rows[0].amount_moved, "-200,00");
        assert_eq!(rows[0].order_id, "abc-1");
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[1].balance_amount, "1000,00");
        assert_eq!(rows[1].order_id, "");
        Ok(())
    }
}
