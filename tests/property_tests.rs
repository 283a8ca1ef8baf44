//! Property-based tests for the invariants the pipeline promises.

use demandcast::core::Series;
use demandcast::forecast::forecast;
use demandcast::ingest::{
    resample, sanitize_records, ColumnConfig, Period, QuantityPolicy, RawTable, SanitizeOptions,
};
use demandcast::models::{Sarima, SarimaSpec};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn series_from_daily(quantities: Vec<f64>) -> Series {
    let start = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    let timestamps = (0..quantities.len())
        .map(|i| start + Duration::days(i as i64 * 3))
        .collect();
    Series::new(timestamps, quantities).unwrap()
}

fn quantity_vec(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1000.0, len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn resampling_is_dense_and_mass_preserving(quantities in quantity_vec(2..60)) {
        let series = series_from_daily(quantities.clone());
        for period in [Period::Weekly, Period::Monthly] {
            let resampled = resample(&series, period).unwrap();

            // Consecutive buckets with no gaps.
            for w in resampled.timestamps().windows(2) {
                prop_assert_eq!(period.next(w[0]), w[1]);
            }
            // Every timestamp sits on its bucket boundary.
            for &ts in resampled.timestamps() {
                prop_assert_eq!(period.floor(ts), ts);
            }
            // No quantity is created or destroyed.
            let input: f64 = quantities.iter().sum();
            let output: f64 = resampled.quantities().iter().sum();
            prop_assert!((input - output).abs() < 1e-6);
        }
    }

    #[test]
    fn forecasts_are_nonnegative_with_ordered_intervals(
        quantities in quantity_vec(20..50),
        horizon in 1usize..24,
    ) {
        let series = series_from_daily(quantities);
        let resampled = resample(&series, Period::Weekly).unwrap();
        let spec = SarimaSpec::new((1, 1, 1), (0, 0, 0, 1)).unwrap();
        let fitted = match Sarima::new(spec).fit(&resampled, Period::Weekly, false) {
            Ok(f) => f,
            // Short after resampling; nothing to check.
            Err(_) => return Ok(()),
        };
        let result = match forecast(&fitted, horizon, 0.95) {
            Ok(r) => r,
            Err(_) => return Ok(()),
        };

        prop_assert_eq!(result.horizon(), horizon);
        for i in 0..horizon {
            prop_assert!(result.point()[i] >= 0.0);
            prop_assert!(result.lower()[i] >= 0.0);
            prop_assert!(result.lower()[i] <= result.upper()[i]);
            prop_assert!(result.rounded()[i] >= 0);
        }
        // Timestamps strictly increase past the training window.
        prop_assert!(result.timestamps()[0] > fitted.last_timestamp());
        for w in result.timestamps().windows(2) {
            prop_assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn sanitization_is_idempotent(
        rows in prop::collection::vec(
            (0u32..720, 0i64..500, "[a-z]{3,8}"),
            1..40,
        ),
    ) {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let raw_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|(day, qty, name)| {
                let ts = start + Duration::days(*day as i64);
                vec![
                    ts.format("%Y-%m-%d").to_string(),
                    format!("Rp {qty}"),
                    name.clone(),
                ]
            })
            .collect();
        let table = RawTable::new(
            vec!["Date".into(), "Amount".into(), "Item Name".into()],
            raw_rows,
        );
        let columns = ColumnConfig::default();
        let options = SanitizeOptions {
            quantity_policy: QuantityPolicy::CoerceZero,
            excluded_label_substring: None,
        };

        let once = sanitize_records(&table, &columns, &options).unwrap();

        // Feed the cleaned records back through as a table; nothing should
        // change the second time.
        let again_rows: Vec<Vec<String>> = once
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.format("%Y-%m-%d").to_string(),
                    format!("{}", r.quantity as i64),
                    r.entity.clone().unwrap_or_default(),
                ]
            })
            .collect();
        let again_table = RawTable::new(
            vec!["Date".into(), "Amount".into(), "Item Name".into()],
            again_rows,
        );
        let twice = sanitize_records(&again_table, &columns, &options).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn growth_rate_sign_matches_endpoints(
        first in 1.0f64..500.0,
        last in 1.0f64..500.0,
    ) {
        let timestamps = (0..3)
            .map(|i| Utc.with_ymd_and_hms(2025, i + 1, 1, 0, 0, 0).unwrap())
            .collect();
        let points = vec![first, (first + last) / 2.0, last];
        let result = demandcast::core::ForecastResult::new(
            timestamps,
            points.clone(),
            points.iter().map(|p| p * 0.5).collect(),
            points.iter().map(|p| p * 1.5).collect(),
        )
        .unwrap();
        let summary = demandcast::analytics::summarize(&result);
        let rate = summary.growth_rate.unwrap();
        prop_assert!((rate - (last - first) / first * 100.0).abs() < 1e-6);
    }
}
