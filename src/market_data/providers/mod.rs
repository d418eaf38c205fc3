pub mod yahoo;

pub use yahoo::{YahooChartSource, YAHOO_CHART_BASE_URL};
