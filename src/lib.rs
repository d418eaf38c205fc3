pub mod app;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod ledger;
pub mod market_data;
pub mod models;
pub mod portfolio;
pub mod reports;
