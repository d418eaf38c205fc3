#![allow(dead_code)]

use std::path::Path;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use replaybook::diagnostics::Diagnostics;
use replaybook::ledger::{read_ledger_csv, Ledger, LedgerOptions};

pub const LEDGER_HEADER: &str =
    "Datum,Tijd,Valutadatum,Product,ISIN,Omschrijving,FX,Mutatie,,Saldo,,Order Id";

/// Deposit 1000, buy 10 ACME for 100.
pub const DEPOSIT_AND_BUY: &str = r#"02-01-2024,10:00,02-01-2024,ACME,NL0000000001,"Koop 10 @ 10,00 EUR",,EUR,"-100,00",EUR,"900,00",buy-1
01-01-2024,09:00,01-01-2024,,,iDEAL Deposit,,EUR,"1000,00",EUR,"1000,00",
"#;

/// Sells 4 of the 10 ACME bought in `DEPOSIT_AND_BUY`.
pub const SELL_FOUR: &str = r#"05-01-2024,11:00,05-01-2024,ACME,NL0000000001,"Verkoop 4 @ 13,00 EUR",,EUR,"52,00",EUR,"952,00",sell-1
"#;

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    d(day).and_hms_opt(hour, 0, 0).unwrap()
}

pub fn ledger_csv(bodies: &[&str]) -> String {
    let mut csv = format!("{LEDGER_HEADER}\n");
    for body in bodies {
        csv.push_str(body);
    }
    csv
}

pub fn load_ledger(bodies: &[&str]) -> Result<(Ledger, Diagnostics)> {
    let rows = read_ledger_csv(ledger_csv(bodies).as_bytes())?;
    let mut diagnostics = Diagnostics::new();
    let ledger = Ledger::from_rows(&rows, &LedgerOptions::default(), &mut diagnostics)?;
    Ok((ledger, diagnostics))
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<()> {
    std::fs::write(dir.join(name), content)?;
    Ok(())
}
