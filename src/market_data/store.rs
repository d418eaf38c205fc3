use std::collections::HashMap;

use anyhow::Result;

use super::{DateRange, SeriesKey, TimeSeries};

/// Run-scoped cache of fetched series.
#[async_trait::async_trait]
pub trait MarketDataStore: Send + Sync {
    async fn get_series(&self, key: &SeriesKey, range: DateRange) -> Result<Option<TimeSeries>>;

    async fn put_series(&self, key: &SeriesKey, range: DateRange, series: &TimeSeries)
        -> Result<()>;
}

#[derive(Default)]
pub struct MemoryMarketDataStore {
    series: tokio::sync::Mutex<HashMap<(SeriesKey, DateRange), TimeSeries>>,
}

impl MemoryMarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MarketDataStore for MemoryMarketDataStore {
    async fn get_series(&self, key: &SeriesKey, range: DateRange) -> Result<Option<TimeSeries>> {
        let series = self.series.lock().await;
        Ok(series.get(&(key.clone(), range)).cloned())
    }

    async fn put_series(
        &self,
        key: &SeriesKey,
        range: DateRange,
        series: &TimeSeries,
    ) -> Result<()> {
        let mut store = self.series.lock().await;
        store.insert((key.clone(), range), series.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn memory_store_is_keyed_by_series_and_range() -> Result<()> {
        let store = MemoryMarketDataStore::new();
        let jan = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let feb = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        let key = SeriesKey::Price {
            symbol: "AAPL".to_string(),
        };
        let series = TimeSeries::new(vec![(jan.start, dec!(185))]).unwrap();

        store.put_series(&key, jan, &series).await?;

        assert_eq!(store.get_series(&key, jan).await?, Some(series));
        assert_eq!(store.get_series(&key, feb).await?, None);
        assert_eq!(
            store
                .get_series(
                    &SeriesKey::Price {
                        symbol: "MSFT".to_string()
                    },
                    jan
                )
                .await?,
            None
        );
        Ok(())
    }
}
