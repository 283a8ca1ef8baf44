//! Forecast output structure.

use crate::error::{DemandError, Result};
use chrono::{DateTime, Utc};

/// A finished forecast: aligned future timestamps, point predictions in both
/// unrounded and display-rounded form, and two-sided interval bounds.
///
/// Invariants enforced at construction: all five vectors have equal length,
/// every value is non-negative, and `lower[i] <= upper[i]` for every step.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    timestamps: Vec<DateTime<Utc>>,
    point: Vec<f64>,
    rounded: Vec<i64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ForecastResult {
    /// Assemble a forecast from already-clipped components. Rounded points
    /// are derived here so the two views cannot drift apart.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        let n = timestamps.len();
        for len in [point.len(), lower.len(), upper.len()] {
            if len != n {
                return Err(DemandError::DimensionMismatch { expected: n, got: len });
            }
        }
        for i in 0..n {
            if point[i] < 0.0 || lower[i] < 0.0 {
                return Err(DemandError::Validation(
                    "forecast values must be non-negative".to_string(),
                ));
            }
            if lower[i] > upper[i] {
                return Err(DemandError::Validation(
                    "interval lower bound exceeds upper bound".to_string(),
                ));
            }
        }
        let rounded = point.iter().map(|v| v.round() as i64).collect();
        Ok(Self {
            timestamps,
            point,
            rounded,
            lower,
            upper,
        })
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Unrounded point forecasts, for consumers needing precision.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Point forecasts rounded to the nearest whole unit, for display.
    pub fn rounded(&self) -> &[i64] {
        &self.rounded
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Iterate (timestamp, point, lower, upper) rows.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, f64, f64, f64)> + '_ {
        (0..self.horizon())
            .map(|i| (self.timestamps[i], self.point[i], self.lower[i], self.upper[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamps(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn rounds_points_for_display() {
        let result = ForecastResult::new(
            stamps(3),
            vec![10.4, 10.5, 99.9],
            vec![5.0, 5.0, 5.0],
            vec![20.0, 20.0, 120.0],
        )
        .unwrap();
        assert_eq!(result.rounded(), &[10, 11, 100]);
        assert_eq!(result.point(), &[10.4, 10.5, 99.9]);
    }

    #[test]
    fn rejects_negative_values() {
        let result = ForecastResult::new(stamps(1), vec![-1.0], vec![0.0], vec![1.0]);
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn rejects_inverted_interval() {
        let result = ForecastResult::new(stamps(1), vec![1.0], vec![5.0], vec![2.0]);
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn rejects_misaligned_lengths() {
        let result = ForecastResult::new(stamps(2), vec![1.0], vec![0.0], vec![2.0]);
        assert!(matches!(result, Err(DemandError::DimensionMismatch { .. })));
    }

    #[test]
    fn rows_align_all_components() {
        let result = ForecastResult::new(
            stamps(2),
            vec![10.0, 20.0],
            vec![8.0, 15.0],
            vec![12.0, 25.0],
        )
        .unwrap();
        let rows: Vec<_> = result.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, 20.0);
        assert_eq!(rows[1].2, 15.0);
        assert_eq!(rows[1].3, 25.0);
    }
}
