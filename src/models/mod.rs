mod ledger_record;
mod ticker;
mod transaction;

pub use ledger_record::{LedgerRecord, RawLedgerRow};
pub use ticker::{TickerMap, TickerMapping};
pub use transaction::{CashMovementKind, ChargeKind, LedgerEntry, Trade, Transaction};
