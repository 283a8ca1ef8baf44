//! Fixed-frequency resampling of irregular series.

use crate::core::Series;
use crate::error::Result;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target resampling period. Weeks start on Monday (ISO); months on the
/// 1st. Periods are labeled by their start timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    /// Floor a timestamp to the start of its period.
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Weekly => {
                let days_into_week = ts.weekday().num_days_from_monday() as i64;
                let monday = ts.date_naive() - Duration::days(days_into_week);
                Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0).unwrap())
            }
            Period::Monthly => Utc
                .with_ymd_and_hms(ts.year(), ts.month(), 1, 0, 0, 0)
                .unwrap(),
        }
    }

    /// Start of the period immediately after the one containing `ts`.
    pub fn next(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let start = self.floor(ts);
        match self {
            Period::Weekly => start + Duration::weeks(1),
            Period::Monthly => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
            }
        }
    }

    /// Typical seasonal cycle length for this period, in periods per year.
    pub fn periods_per_year(&self) -> usize {
        match self {
            Period::Weekly => 52,
            Period::Monthly => 12,
        }
    }
}

/// Sum observations into fixed periods, emitting one entry per period.
///
/// The output is dense: every period between the first and last observed
/// period is present, with zero for periods that saw no activity. Model
/// fitting and the stationarity test both assume fixed-frequency input,
/// so gaps must be represented, not skipped.
pub fn resample(series: &Series, period: Period) -> Result<Series> {
    if series.is_empty() {
        return Series::new(vec![], vec![]);
    }

    let mut sums: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for (ts, quantity) in series.timestamps().iter().zip(series.quantities()) {
        *sums.entry(period.floor(*ts)).or_insert(0.0) += quantity;
    }

    let first = *sums.keys().next().unwrap();
    let last = *sums.keys().next_back().unwrap();

    let mut timestamps = Vec::new();
    let mut quantities = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        timestamps.push(cursor);
        quantities.push(sums.get(&cursor).copied().unwrap_or(0.0));
        cursor = period.next(cursor);
    }

    match series.entity() {
        Some(entity) => Series::with_entity(timestamps, quantities, entity),
        None => Series::new(timestamps, quantities),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn monthly_sums_within_month() {
        let series = Series::new(
            vec![ts(2023, 1, 5), ts(2023, 1, 20), ts(2023, 2, 3)],
            vec![10.0, 15.0, 7.0],
        )
        .unwrap();
        let out = resample(&series, Period::Monthly).unwrap();
        assert_eq!(out.timestamps(), &[ts(2023, 1, 1), ts(2023, 2, 1)]);
        assert_eq!(out.quantities(), &[25.0, 7.0]);
    }

    #[test]
    fn monthly_fills_gaps_with_zero() {
        let series =
            Series::new(vec![ts(2023, 1, 5), ts(2023, 4, 2)], vec![10.0, 4.0]).unwrap();
        let out = resample(&series, Period::Monthly).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.quantities(), &[10.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn monthly_crosses_year_boundary() {
        let series =
            Series::new(vec![ts(2022, 12, 15), ts(2023, 1, 15)], vec![1.0, 2.0]).unwrap();
        let out = resample(&series, Period::Monthly).unwrap();
        assert_eq!(out.timestamps(), &[ts(2022, 12, 1), ts(2023, 1, 1)]);
    }

    #[test]
    fn weekly_floors_to_monday() {
        // 2023-06-07 is a Wednesday; its week starts Monday 2023-06-05.
        let series = Series::new(vec![ts(2023, 6, 7)], vec![3.0]).unwrap();
        let out = resample(&series, Period::Weekly).unwrap();
        assert_eq!(out.timestamps(), &[ts(2023, 6, 5)]);
    }

    #[test]
    fn weekly_is_dense_across_quiet_weeks() {
        // Three weeks apart with nothing in between.
        let series = Series::new(vec![ts(2023, 6, 5), ts(2023, 6, 26)], vec![5.0, 9.0]).unwrap();
        let out = resample(&series, Period::Weekly).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.quantities(), &[5.0, 0.0, 0.0, 9.0]);
    }

    #[test]
    fn entity_tag_survives_resampling() {
        let series = Series::with_entity(vec![ts(2023, 1, 5)], vec![2.0], "widget").unwrap();
        let out = resample(&series, Period::Weekly).unwrap();
        assert_eq!(out.entity(), Some("widget"));
    }

    #[test]
    fn empty_series_resamples_to_empty() {
        let series = Series::new(vec![], vec![]).unwrap();
        let out = resample(&series, Period::Monthly).unwrap();
        assert!(out.is_empty());
    }
}
