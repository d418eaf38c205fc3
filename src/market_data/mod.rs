mod models;
mod provider;
#[cfg(feature = "market_data")]
pub mod providers;
mod series;
mod service;
mod store;

pub use models::{DateRange, MarketSnapshot, SeriesKey};
pub use provider::{MarketDataSource, NoopSource, StaticSource};
pub use series::{value_as_of_or, SeriesError, TimeSeries};
pub use service::MarketDataService;
pub use store::{MarketDataStore, MemoryMarketDataStore};
