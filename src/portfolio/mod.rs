mod models;
mod replay;
mod timeline;
mod valuation;

pub use models::{Position, ValuationPoint};
pub use replay::PositionReplay;
pub use timeline::{end_of_day_time, Granularity, Timeline, DEFAULT_INTRADAY_HOURS};
pub use valuation::{ValuationAggregator, DEFAULT_FX_RATE};
