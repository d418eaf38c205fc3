//! Query timestamps for a valuation run.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::ledger::Ledger;
use crate::market_data::DateRange;

pub const DEFAULT_INTRADAY_HOURS: [u32; 5] = [9, 12, 15, 18, 21];

/// How many timestamps to produce per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One timestamp per listed hour.
    Intraday(Vec<u32>),
    /// One timestamp per day at 23:59:59.
    EndOfDay,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Intraday(DEFAULT_INTRADAY_HOURS.to_vec())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    points: Vec<NaiveDateTime>,
}

impl Timeline {
    pub fn build(start: NaiveDate, end: NaiveDate, granularity: &Granularity) -> Self {
        match granularity {
            Granularity::Intraday(hours) => Self::intraday(start, end, hours),
            Granularity::EndOfDay => Self::end_of_day(start, end),
        }
    }

    /// Hours outside 0..=23 are ignored.
    pub fn intraday(start: NaiveDate, end: NaiveDate, hours: &[u32]) -> Self {
        let mut times: Vec<NaiveTime> = hours
            .iter()
            .filter_map(|h| NaiveTime::from_hms_opt(*h, 0, 0))
            .collect();
        times.sort();
        times.dedup();

        let points = days(start, end)
            .flat_map(|day| times.iter().map(move |t| day.and_time(*t)))
            .collect();
        Self { points }
    }

    pub fn end_of_day(start: NaiveDate, end: NaiveDate) -> Self {
        let eod = end_of_day_time();
        Self {
            points: days(start, end).map(|day| day.and_time(eod)).collect(),
        }
    }

    /// From the first ledger entry's day through today.
    pub fn for_ledger(ledger: &Ledger, clock: &dyn Clock, granularity: &Granularity) -> Self {
        let Some(first) = ledger.first_timestamp() else {
            return Self::default();
        };
        let start = first.date();
        let last = ledger.last_timestamp().map_or(start, |t| t.date());
        let end = clock.today().max(last);
        Self::build(start, end, granularity)
    }

    pub fn points(&self) -> &[NaiveDateTime] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Calendar range spanned by the timeline, for market-data fetches.
    pub fn date_range(&self) -> Option<DateRange> {
        let start = self.points.iter().min()?.date();
        let end = self.points.iter().max()?.date();
        Some(DateRange::new(start, end))
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a NaiveDateTime;
    type IntoIter = std::slice::Iter<'a, NaiveDateTime>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

pub fn end_of_day_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = (end - start).num_days().max(-1) + 1;
    (0..count).map(move |offset| start + Duration::days(offset))
}
