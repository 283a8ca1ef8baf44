//! Turns a fitted model into a domain-ready forecast: future timestamps,
//! inverse transform, non-negativity clipping, and CSV export.

use crate::core::ForecastResult;
use crate::error::{DemandError, Result};
use crate::models::FittedSarima;
use std::path::Path;

/// Forecast `horizon` steps ahead with two-sided intervals at `level`.
///
/// Raw model output is mapped back to the quantity domain: log-space
/// models are inverted with expm1, every point and lower bound is clipped
/// to zero (demand cannot be negative), and future timestamps continue
/// the model's cadence from its last training period.
pub fn forecast(model: &FittedSarima, horizon: usize, level: f64) -> Result<ForecastResult> {
    if horizon == 0 {
        return Err(DemandError::InvalidParameter(
            "forecast horizon must be at least 1".to_string(),
        ));
    }

    let raw = model.forecast_raw(horizon, level)?;

    let invert = |v: f64| if model.is_log_space() { v.exp_m1() } else { v };
    let point: Vec<f64> = raw.point.iter().map(|&v| invert(v).max(0.0)).collect();
    let lower: Vec<f64> = raw.lower.iter().map(|&v| invert(v).max(0.0)).collect();
    let upper: Vec<f64> = raw
        .upper
        .iter()
        .map(|&v| invert(v).max(0.0))
        .zip(lower.iter())
        .map(|(u, &l)| u.max(l))
        .collect();

    let period = model.period();
    let mut timestamps = Vec::with_capacity(horizon);
    let mut cursor = model.last_timestamp();
    for _ in 0..horizon {
        cursor = period.next(cursor);
        timestamps.push(cursor);
    }

    tracing::debug!(horizon, level, "forecast assembled");
    ForecastResult::new(timestamps, point, lower, upper)
}

/// Write a forecast as CSV with columns `date,forecast,lower,upper`.
/// Dates are the period-start day; forecasts are the unrounded points.
pub fn write_csv(result: &ForecastResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| DemandError::Export(format!("create {}: {e}", path.display())))?;
    writer
        .write_record(["date", "forecast", "lower", "upper"])
        .map_err(|e| DemandError::Export(format!("write {}: {e}", path.display())))?;
    for (ts, point, lower, upper) in result.rows() {
        writer
            .write_record([
                ts.format("%Y-%m-%d").to_string(),
                format!("{point:.4}"),
                format!("{lower:.4}"),
                format!("{upper:.4}"),
            ])
            .map_err(|e| DemandError::Export(format!("write {}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| DemandError::Export(format!("flush {}: {e}", path.display())))?;
    Ok(())
}
