//! ACF/PACF profile for SARIMA order selection guidance.

use crate::core::Series;
use crate::error::{DemandError, Result};

/// Hard cap on the lag range; beyond this, estimates on typical demand
/// series are dominated by noise.
const MAX_LAG: usize = 40;

/// Autocorrelation and partial autocorrelation over a shared lag range.
///
/// Purely advisory: rendered for the analyst choosing (p, q) and (P, Q),
/// never fed back into the pipeline's control flow.
#[derive(Debug, Clone)]
pub struct CorrelationProfile {
    /// ACF for lags `0..=max_lag`, `acf[0] == 1`.
    pub acf: Vec<f64>,
    /// PACF for lags `0..=max_lag`, `pacf[0] == 1`.
    pub pacf: Vec<f64>,
}

impl CorrelationProfile {
    pub fn max_lag(&self) -> usize {
        self.acf.len().saturating_sub(1)
    }
}

/// Compute the profile up to `min(40, len / 2)` lags.
pub fn correlation_profile(series: &Series) -> Result<CorrelationProfile> {
    let values = series.quantities();
    if values.len() < 4 {
        return Err(DemandError::InsufficientData {
            needed: 4,
            got: values.len(),
        });
    }
    let max_lag = MAX_LAG.min(values.len() / 2);

    let acf: Vec<f64> = (0..=max_lag).map(|lag| acf_at(values, lag)).collect();
    let pacf = durbin_levinson(&acf);

    Ok(CorrelationProfile { acf, pacf })
}

/// Autocorrelation at a single lag, normalized by total variance.
fn acf_at(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &x) in values.iter().enumerate() {
        denominator += (x - mean).powi(2);
        if i >= lag {
            numerator += (x - mean) * (values[i - lag] - mean);
        }
    }
    if denominator < 1e-10 {
        return 0.0;
    }
    numerator / denominator
}

/// Partial autocorrelations from the ACF via the Durbin-Levinson recursion.
fn durbin_levinson(acf: &[f64]) -> Vec<f64> {
    let max_lag = acf.len() - 1;
    let mut pacf = vec![1.0];
    if max_lag == 0 {
        return pacf;
    }

    let mut phi = vec![vec![0.0; max_lag + 1]; max_lag + 1];
    phi[1][1] = acf[1];
    pacf.push(acf[1]);

    for k in 2..=max_lag {
        let mut numerator = acf[k];
        let mut denominator = 1.0;
        for j in 1..k {
            numerator -= phi[k - 1][j] * acf[k - j];
            denominator -= phi[k - 1][j] * acf[j];
        }
        if denominator.abs() < 1e-10 {
            // Recursion collapsed (near-deterministic series); the
            // remaining partials carry no information.
            pacf.resize(max_lag + 1, f64::NAN);
            break;
        }
        phi[k][k] = numerator / denominator;
        for j in 1..k {
            phi[k][j] = phi[k - 1][j] - phi[k][k] * phi[k - 1][k - j];
        }
        pacf.push(phi[k][k]);
    }
    pacf
}
