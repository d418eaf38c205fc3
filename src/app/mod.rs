mod config;
mod portfolio;
mod types;

pub use config::config_output;
pub use portfolio::{
    build_timeline, fetch_market_data, load_inputs, load_ledger, load_tickers, market_source,
    order_report, portfolio_history, position_report, transaction_report, RunInputs,
};
pub use types::{HistoryOutput, HistorySummary, ReportOutput};
