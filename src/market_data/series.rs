use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("series dates must be strictly increasing: {previous} then {next}")]
    NotStrictlyIncreasing {
        previous: NaiveDate,
        next: NaiveDate,
    },
}

/// Daily closing values keyed by sample date, strictly increasing.
///
/// Gaps are expected (weekends, holidays, missing data) and are only ever
/// bridged by carrying the last observation forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: Vec<(NaiveDate, Decimal)>,
}

impl TimeSeries {
    pub fn new(samples: Vec<(NaiveDate, Decimal)>) -> Result<Self, SeriesError> {
        for pair in samples.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(SeriesError::NotStrictlyIncreasing {
                    previous: pair[0].0,
                    next: pair[1].0,
                });
            }
        }
        Ok(Self { samples })
    }

    /// Sort arbitrary samples by date. For repeated dates the last one given wins.
    pub fn from_unordered<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Decimal)>,
    {
        let mut input: Vec<(NaiveDate, Decimal)> = samples.into_iter().collect();
        input.sort_by_key(|(date, _)| *date);

        let mut samples: Vec<(NaiveDate, Decimal)> = Vec::with_capacity(input.len());
        for (date, value) in input {
            match samples.last_mut() {
                Some(last) if last.0 == date => last.1 = value,
                _ => samples.push((date, value)),
            }
        }
        Self { samples }
    }

    pub fn samples(&self) -> &[(NaiveDate, Decimal)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.samples.first().map(|(d, _)| *d)
    }

    /// The sample with the greatest date at or before `t`'s date.
    pub fn value_as_of(&self, t: NaiveDateTime) -> Option<Decimal> {
        let date = t.date();
        let idx = self.samples.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| self.samples[i].1)
    }

    pub fn value_as_of_or(&self, t: NaiveDateTime, fallback: Decimal) -> Decimal {
        self.value_as_of(t).unwrap_or(fallback)
    }

    /// Samples dated within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .filter(|(d, _)| *d >= start && *d <= end)
                .copied()
                .collect(),
        }
    }

    /// Reciprocal of every sample. Zero samples are dropped.
    pub fn inverted(&self) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .filter(|(_, v)| !v.is_zero())
                .filter_map(|(d, v)| Decimal::ONE.checked_div(*v).map(|inv| (*d, inv)))
                .collect(),
        }
    }
}

/// Backward-fill lookup that tolerates a missing series.
pub fn value_as_of_or(series: Option<&TimeSeries>, t: NaiveDateTime, fallback: Decimal) -> Decimal {
    series
        .and_then(|s| s.value_as_of(t))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        d(day).and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn rejects_unordered_or_duplicate_dates() {
        assert_eq!(
            TimeSeries::new(vec![(d(2), dec!(1)), (d(2), dec!(2))]),
            Err(SeriesError::NotStrictlyIncreasing {
                previous: d(2),
                next: d(2)
            })
        );
        assert!(TimeSeries::new(vec![(d(3), dec!(1)), (d(2), dec!(2))]).is_err());
    }

    #[test]
    fn from_unordered_sorts_and_keeps_last_duplicate() {
        let series = TimeSeries::from_unordered(vec![
            (d(5), dec!(5)),
            (d(2), dec!(2)),
            (d(5), dec!(6)),
        ]);
        assert_eq!(series.samples(), &[(d(2), dec!(2)), (d(5), dec!(6))]);
    }

    #[test]
    fn backward_fill_never_looks_ahead() {
        let series = TimeSeries::new(vec![(d(2), dec!(100)), (d(5), dec!(110))]).unwrap();

        assert_eq!(series.value_as_of(at(1, 23)), None);
        assert_eq!(series.value_as_of(at(2, 0)), Some(dec!(100)));
        // Weekend gap carries Friday's close.
        assert_eq!(series.value_as_of(at(4, 21)), Some(dec!(100)));
        assert_eq!(series.value_as_of(at(5, 9)), Some(dec!(110)));
        assert_eq!(series.value_as_of(at(31, 12)), Some(dec!(110)));
    }

    #[test]
    fn fallback_applies_to_missing_or_empty_series() {
        let empty = TimeSeries::default();
        assert_eq!(empty.value_as_of_or(at(3, 9), dec!(0.97)), dec!(0.97));
        assert_eq!(value_as_of_or(None, at(3, 9), dec!(0.97)), dec!(0.97));

        let series = TimeSeries::new(vec![(d(2), dec!(1.25))]).unwrap();
        assert_eq!(value_as_of_or(Some(&series), at(1, 9), dec!(0.97)), dec!(0.97));
        assert_eq!(value_as_of_or(Some(&series), at(3, 9), dec!(0.97)), dec!(1.25));
    }

    #[test]
    fn inverted_takes_reciprocals_and_skips_zero() {
        let series = TimeSeries::new(vec![(d(2), dec!(1.25)), (d(3), dec!(0)), (d(4), dec!(2))]).unwrap();
        let inv = series.inverted();
        assert_eq!(inv.samples(), &[(d(2), dec!(0.8)), (d(4), dec!(0.5))]);
    }
}
