//! Derived figures over a finished forecast: totals, growth rate, and
//! calendar rollups.

use crate::core::ForecastResult;
use chrono::Datelike;
use std::collections::BTreeMap;

/// Summary statistics for one forecast. Rollup keys are calendar
/// buckets of the forecast timestamps, ordered chronologically.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    /// Sum of the unrounded point forecasts.
    pub total: f64,
    /// Mean of the unrounded point forecasts.
    pub mean: f64,
    /// Percentage change from the first non-zero point to the last
    /// non-zero point, e.g. 25.0 for 25% growth. `None` when every
    /// point is zero.
    pub growth_rate: Option<f64>,
    /// Point totals keyed by (year, month).
    pub monthly: BTreeMap<(i32, u32), f64>,
    /// Point totals keyed by (year, quarter 1..=4).
    pub quarterly: BTreeMap<(i32, u8), f64>,
    /// Point totals keyed by year.
    pub yearly: BTreeMap<i32, f64>,
}

/// Compute summary analytics from a forecast. Works on the unrounded
/// point values so rounding noise never leaks into the figures.
pub fn summarize(result: &ForecastResult) -> AnalyticsSummary {
    let point = result.point();
    let n = result.horizon();

    let total: f64 = point.iter().sum();
    let mean = if n == 0 { 0.0 } else { total / n as f64 };

    let first_nonzero = point.iter().copied().find(|&v| v != 0.0);
    let last_nonzero = point.iter().rev().copied().find(|&v| v != 0.0);
    let growth_rate = match (first_nonzero, last_nonzero) {
        (Some(first), Some(last)) => Some((last - first) / first * 100.0),
        _ => None,
    };

    let mut monthly = BTreeMap::new();
    let mut quarterly = BTreeMap::new();
    let mut yearly = BTreeMap::new();
    for (ts, value, _, _) in result.rows() {
        let year = ts.year();
        let month = ts.month();
        let quarter = ((month - 1) / 3 + 1) as u8;
        *monthly.entry((year, month)).or_insert(0.0) += value;
        *quarterly.entry((year, quarter)).or_insert(0.0) += value;
        *yearly.entry(year).or_insert(0.0) += value;
    }

    AnalyticsSummary {
        total,
        mean,
        growth_rate,
        monthly,
        quarterly,
        yearly,
    }
}
