//! Augmented Dickey-Fuller unit-root test.
//!
//! Decides whether a series needs differencing before SARIMA modeling.

use crate::core::Series;
use crate::error::{DemandError, Result};

/// Minimum observations before the test runs. ADF asymptotics are
/// unreliable on shorter samples; callers get `InsufficientData` instead
/// of a misleading verdict.
pub const MIN_OBSERVATIONS: usize = 11;

/// Significance threshold for the stationarity verdict.
const SIGNIFICANCE: f64 = 0.05;

/// Stationarity verdict at the 5% significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Stationary,
    NonStationary,
}

/// Critical values of the ADF distribution with constant (MacKinnon).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

impl CriticalValues {
    /// Labeled (level, threshold) pairs for display.
    pub fn labeled(&self) -> [(&'static str, f64); 3] {
        [
            ("1%", self.one_pct),
            ("5%", self.five_pct),
            ("10%", self.ten_pct),
        ]
    }
}

/// Outcome of the unit-root test.
#[derive(Debug, Clone)]
pub struct StationarityReport {
    /// ADF t-statistic.
    pub statistic: f64,
    /// Approximate p-value, always in [0, 1]. Degenerate regressions
    /// (zero residual variance, e.g. an exactly linear series) report
    /// 1.0 together with a NaN statistic: no evidence against the unit
    /// root.
    pub p_value: f64,
    /// Lags included in the augmented regression.
    pub lags: usize,
    pub critical_values: CriticalValues,
    pub verdict: Verdict,
}

impl StationarityReport {
    pub fn is_stationary(&self) -> bool {
        self.verdict == Verdict::Stationary
    }
}

/// Run the ADF test on a resampled series.
///
/// Returns `InsufficientData` below [`MIN_OBSERVATIONS`]; this gates
/// whether per-entity forecasting proceeds automatically.
pub fn test_series(series: &Series) -> Result<StationarityReport> {
    let values = series.quantities();
    if values.len() < MIN_OBSERVATIONS {
        return Err(DemandError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: values.len(),
        });
    }
    Ok(adf(values))
}

/// The verdict rule applied to an approximate p-value. Rejecting the unit
/// root (p at or below the threshold) means the series is stationary; a
/// degenerate NaN p-value fails to reject.
fn verdict_from_p_value(p_value: f64) -> Verdict {
    if p_value <= SIGNIFICANCE {
        Verdict::Stationary
    } else {
        Verdict::NonStationary
    }
}

fn adf(values: &[f64]) -> StationarityReport {
    let critical_values = CriticalValues {
        one_pct: -3.43,
        five_pct: -2.86,
        ten_pct: -2.57,
    };

    let n = values.len();
    // Schwert-style default cap on lag order: (n-1)^(1/3).
    let max_lags = (((n - 1) as f64).powf(1.0 / 3.0).floor() as usize)
        .min(n / 2 - 1)
        .max(1);

    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let level = &values[..n - 1];

    let lags = select_lag(&diff, level, max_lags);
    let (beta, se) = level_coefficient(&diff, level, lags);

    if !se.is_finite() || se == 0.0 {
        return StationarityReport {
            statistic: f64::NAN,
            p_value: 1.0,
            lags,
            critical_values,
            verdict: Verdict::NonStationary,
        };
    }

    let statistic = beta / se;
    let p_value = approximate_p_value(statistic);

    StationarityReport {
        statistic,
        p_value,
        lags,
        critical_values,
        verdict: verdict_from_p_value(p_value),
    }
}

/// Pick the augmentation lag order by AIC over the candidate range.
fn select_lag(diff: &[f64], level: &[f64], max_lags: usize) -> usize {
    let mut best = (1usize, f64::INFINITY);
    for lag in 1..=max_lags {
        let aic = lag_aic(diff, level, lag);
        if aic < best.1 {
            best = (lag, aic);
        }
    }
    best.0
}

fn lag_aic(diff: &[f64], level: &[f64], lag: usize) -> f64 {
    let n = diff.len();
    if n <= lag + 1 || n - lag < 3 {
        return f64::INFINITY;
    }
    let rss = regression_rss(diff, level, lag);
    if !(rss > 0.0) {
        return f64::INFINITY;
    }
    let effective = (n - lag) as f64;
    let k = (lag + 2) as f64;
    effective * (rss / effective).ln() + 2.0 * k
}

/// Residual sum of squares for the Dickey-Fuller regression
/// Δy_t = α + β·y_{t-1} + ε, skipping the first `lag` observations.
fn regression_rss(diff: &[f64], level: &[f64], lag: usize) -> f64 {
    let n = diff.len();
    if n <= lag + 1 || level.len() < n {
        return f64::INFINITY;
    }
    let effective = (n - lag) as f64;

    let y_mean: f64 = diff[lag..].iter().sum::<f64>() / effective;
    let x_mean: f64 = level[lag..n].iter().sum::<f64>() / effective;

    let mut xx = 0.0;
    let mut xy = 0.0;
    for i in lag..n {
        let x = level[i] - x_mean;
        let y = diff[i] - y_mean;
        xx += x * x;
        xy += x * y;
    }
    if xx == 0.0 {
        return f64::INFINITY;
    }
    let beta = xy / xx;
    let alpha = y_mean - beta * x_mean;

    (lag..n)
        .map(|i| {
            let residual = diff[i] - (alpha + beta * level[i]);
            residual * residual
        })
        .sum()
}

/// OLS coefficient on the lagged level term and its standard error.
fn level_coefficient(diff: &[f64], level: &[f64], lag: usize) -> (f64, f64) {
    let n = diff.len();
    if n <= lag + 2 || level.len() < n {
        return (f64::NAN, f64::NAN);
    }
    let effective = (n - lag) as f64;

    let y_mean: f64 = diff[lag..].iter().sum::<f64>() / effective;
    let x_mean: f64 = level[lag..n].iter().sum::<f64>() / effective;

    let mut xx = 0.0;
    let mut xy = 0.0;
    let mut yy = 0.0;
    for i in lag..n {
        let x = level[i] - x_mean;
        let y = diff[i] - y_mean;
        xx += x * x;
        xy += x * y;
        yy += y * y;
    }
    if xx == 0.0 {
        return (f64::NAN, f64::NAN);
    }

    let beta = xy / xx;
    let rss = yy - beta * xy;
    let sigma_sq = rss / (effective - 2.0);
    if sigma_sq <= 0.0 {
        return (f64::NAN, f64::NAN);
    }

    (beta, (sigma_sq / xx).sqrt())
}

/// Piecewise p-value approximation from the MacKinnon tau table
/// (constant, no trend).
fn approximate_p_value(t_stat: f64) -> f64 {
    if t_stat.is_nan() {
        // No evidence against the unit root.
        return 1.0;
    }
    if t_stat < -4.0 {
        0.001
    } else if t_stat < -3.43 {
        0.01
    } else if t_stat < -2.86 {
        0.05
    } else if t_stat < -2.57 {
        0.10
    } else if t_stat < -1.94 {
        0.20
    } else if t_stat < -1.62 {
        0.30
    } else if t_stat < -1.28 {
        0.40
    } else if t_stat < -0.84 {
        0.50
    } else if t_stat < 0.0 {
        0.70
    } else {
        0.90 + 0.05 * (1.0 - (-t_stat).exp())
    }
}
