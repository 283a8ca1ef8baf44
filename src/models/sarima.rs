//! Seasonal ARIMA fitted by conditional least squares.

use crate::core::Series;
use crate::error::{DemandError, Result};
use crate::ingest::Period;
use crate::models::diff::{difference, integrate, seasonal_difference, seasonal_integrate};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::quantile_normal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SARIMA structure: non-seasonal order (p, d, q) and seasonal order
/// (P, D, Q, m). Fully determines a fitted model's shape; fitted
/// coefficients live in [`FittedSarima`].
///
/// Fields are private so every value passes the `m >= 1` check; a zero
/// period would make the seasonal lag arithmetic read past the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SpecFields")]
pub struct SarimaSpec {
    order: (usize, usize, usize),
    seasonal_order: (usize, usize, usize, usize),
}

/// Wire shape of [`SarimaSpec`]; deserialization funnels through
/// [`SarimaSpec::new`] so decoded artifacts honor the same checks.
#[derive(Deserialize)]
struct SpecFields {
    order: (usize, usize, usize),
    seasonal_order: (usize, usize, usize, usize),
}

impl TryFrom<SpecFields> for SarimaSpec {
    type Error = DemandError;

    fn try_from(fields: SpecFields) -> Result<Self> {
        Self::new(fields.order, fields.seasonal_order)
    }
}

impl SarimaSpec {
    /// Create a spec; the seasonal period `m` must be at least 1.
    pub fn new(order: (usize, usize, usize), seasonal_order: (usize, usize, usize, usize)) -> Result<Self> {
        if seasonal_order.3 < 1 {
            return Err(DemandError::InvalidParameter(
                "seasonal period m must be at least 1".to_string(),
            ));
        }
        Ok(Self { order, seasonal_order })
    }

    /// (p, d, q) with no seasonal terms.
    pub fn nonseasonal(order: (usize, usize, usize)) -> Self {
        Self {
            order,
            seasonal_order: (0, 0, 0, 1),
        }
    }

    /// (p, d, q)(P, D, Q, m) with `m` taken from the resampling period's
    /// yearly cycle length.
    pub fn with_yearly_cycle(
        order: (usize, usize, usize),
        seasonal: (usize, usize, usize),
        period: Period,
    ) -> Self {
        Self {
            order,
            seasonal_order: (seasonal.0, seasonal.1, seasonal.2, period.periods_per_year()),
        }
    }

    pub fn order(&self) -> (usize, usize, usize) {
        self.order
    }

    pub fn seasonal_order(&self) -> (usize, usize, usize, usize) {
        self.seasonal_order
    }

    pub fn p(&self) -> usize {
        self.order.0
    }
    pub fn d(&self) -> usize {
        self.order.1
    }
    pub fn q(&self) -> usize {
        self.order.2
    }
    pub fn seasonal_p(&self) -> usize {
        self.seasonal_order.0
    }
    pub fn seasonal_d(&self) -> usize {
        self.seasonal_order.1
    }
    pub fn seasonal_q(&self) -> usize {
        self.seasonal_order.2
    }
    pub fn period(&self) -> usize {
        self.seasonal_order.3
    }

    /// Coefficients plus intercept.
    pub fn num_params(&self) -> usize {
        self.p() + self.q() + self.seasonal_p() + self.seasonal_q() + 1
    }

    /// Earliest index of the differenced series with a full set of lags.
    fn recursion_start(&self) -> usize {
        let ar_span = self.p() + self.period() * self.seasonal_p();
        let ma_span = self.q() + self.period() * self.seasonal_q();
        ar_span.max(ma_span)
    }

    /// Observations consumed by differencing alone.
    fn differencing_span(&self) -> usize {
        self.d() + self.period() * self.seasonal_d()
    }

    /// Minimum training length for this spec.
    pub fn min_observations(&self) -> usize {
        self.differencing_span() + self.recursion_start() + 3
    }
}

impl std::fmt::Display for SarimaSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{},{})({},{},{},{})",
            self.p(),
            self.d(),
            self.q(),
            self.seasonal_p(),
            self.seasonal_d(),
            self.seasonal_q(),
            self.period()
        )
    }
}

/// Fitted coefficient set, shared by the CSS objective, the in-sample
/// pass, and the forecast recursion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Coefficients {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    fn from_params(params: &[f64], spec: &SarimaSpec) -> Self {
        let (p, q) = (spec.p(), spec.q());
        let (sp, sq) = (spec.seasonal_p(), spec.seasonal_q());
        Self {
            intercept: params[0],
            ar: params[1..1 + p].to_vec(),
            ma: params[1 + p..1 + p + q].to_vec(),
            seasonal_ar: params[1 + p + q..1 + p + q + sp].to_vec(),
            seasonal_ma: params[1 + p + q + sp..1 + p + q + sp + sq].to_vec(),
        }
    }

    /// One step of the multiplicative SARMA recursion: prediction for
    /// index `t` given centered history `z` and residuals `e`.
    ///
    /// AR side expands (1 - φ(B))(1 - Φ(B^m)) and MA side
    /// (1 + θ(B))(1 + Θ(B^m)), so seasonal and non-seasonal lags
    /// interact through the cross terms.
    fn predict_at(&self, t: usize, period: usize, z: &[f64], e: &[f64]) -> f64 {
        let mut pred = self.intercept;
        let centered = |idx: usize| z[idx] - self.intercept;

        for (i, &phi) in self.ar.iter().enumerate() {
            pred += phi * centered(t - 1 - i);
        }
        for (big_i, &sphi) in self.seasonal_ar.iter().enumerate() {
            let seasonal_lag = period * (big_i + 1);
            pred += sphi * centered(t - seasonal_lag);
            for (i, &phi) in self.ar.iter().enumerate() {
                pred -= phi * sphi * centered(t - seasonal_lag - 1 - i);
            }
        }

        for (j, &theta) in self.ma.iter().enumerate() {
            pred += theta * e[t - 1 - j];
        }
        for (big_j, &stheta) in self.seasonal_ma.iter().enumerate() {
            let seasonal_lag = period * (big_j + 1);
            pred += stheta * e[t - seasonal_lag];
            for (j, &theta) in self.ma.iter().enumerate() {
                pred += theta * stheta * e[t - seasonal_lag - 1 - j];
            }
        }

        pred
    }
}

/// Unfitted SARIMA model. `fit` produces the opaque [`FittedSarima`]
/// artifact; this type only carries the requested structure.
#[derive(Debug, Clone, Copy)]
pub struct Sarima {
    spec: SarimaSpec,
}

impl Sarima {
    pub fn new(spec: SarimaSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> SarimaSpec {
        self.spec
    }

    /// Fit by conditional least squares on the (seasonally) differenced
    /// series. With `log_space` set, fitting runs on log1p-transformed
    /// quantities and the artifact is tagged so the forecaster applies
    /// the inverse transform.
    pub fn fit(&self, series: &Series, period: Period, log_space: bool) -> Result<FittedSarima> {
        let spec = self.spec;
        let min_len = spec.min_observations();
        if series.len() < min_len {
            return Err(DemandError::InsufficientData {
                needed: min_len,
                got: series.len(),
            });
        }
        let last_timestamp = series
            .last_timestamp()
            .ok_or_else(|| DemandError::Validation("cannot fit an empty series".to_string()))?;

        let values = if log_space {
            series.log1p_quantities()
        } else {
            series.quantities().to_vec()
        };

        // Seasonal differencing first, then regular; the operators commute
        // but integration must unwind in the reverse order of this choice.
        let seasonal_diffed = seasonal_difference(&values, spec.seasonal_d(), spec.period());
        let diffed = difference(&seasonal_diffed, spec.d());

        let coefficients = estimate(&diffed, &spec)?;
        let (residuals, residual_variance, aic, bic) =
            in_sample(&diffed, &spec, &coefficients)?;

        Ok(FittedSarima {
            spec,
            period,
            coefficients,
            residuals,
            residual_variance,
            aic,
            bic,
            training: values,
            seasonal_diffed,
            diffed,
            last_timestamp,
            log_space,
        })
    }
}

/// Conditional sum of squares for a candidate parameter vector.
fn css(diffed: &[f64], spec: &SarimaSpec, params: &[f64]) -> f64 {
    let coefficients = Coefficients::from_params(params, spec);
    let start = spec.recursion_start();
    let n = diffed.len();
    if n <= start {
        return f64::MAX;
    }

    let mut residuals = vec![0.0; n];
    let mut total = 0.0;
    for t in start..n {
        let pred = coefficients.predict_at(t, spec.period(), diffed, &residuals);
        let error = diffed[t] - pred;
        residuals[t] = error;
        total += error * error;
    }
    if total.is_finite() {
        total
    } else {
        f64::MAX
    }
}

fn estimate(diffed: &[f64], spec: &SarimaSpec) -> Result<Coefficients> {
    if diffed.is_empty() {
        return Err(DemandError::Computation(
            "differencing consumed the entire series".to_string(),
        ));
    }
    let mean = diffed.iter().sum::<f64>() / diffed.len() as f64;
    let n_coeffs = spec.num_params() - 1;

    if n_coeffs == 0 {
        return Ok(Coefficients::from_params(&[mean], spec));
    }

    let mut initial = vec![0.0; spec.num_params()];
    initial[0] = mean;
    for (i, slot) in initial.iter_mut().enumerate().skip(1) {
        *slot = 0.1 / i as f64;
    }

    // Coefficients bounded inside the unit interval for stationarity and
    // invertibility; the intercept floats free.
    let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
    bounds.extend(std::iter::repeat((-0.99, 0.99)).take(n_coeffs));

    let config = NelderMeadConfig {
        max_iter: 1500,
        tolerance: 1e-8,
        ..Default::default()
    };
    let result = nelder_mead(
        |params| css(diffed, spec, params),
        &initial,
        Some(&bounds),
        config,
    );

    if !result.optimal_value.is_finite() {
        return Err(DemandError::Computation(
            "objective not finite at optimum".to_string(),
        ));
    }

    Ok(Coefficients::from_params(&result.optimal_point, spec))
}

/// One pass over the training data with the final coefficients: residuals,
/// residual variance, and information criteria.
fn in_sample(
    diffed: &[f64],
    spec: &SarimaSpec,
    coefficients: &Coefficients,
) -> Result<(Vec<f64>, f64, f64, f64)> {
    let start = spec.recursion_start();
    let n = diffed.len();
    let mut residuals = vec![0.0; n];
    for t in start..n {
        let pred = coefficients.predict_at(t, spec.period(), diffed, &residuals);
        residuals[t] = diffed[t] - pred;
    }

    let effective = n - start;
    if effective == 0 {
        return Err(DemandError::Computation(
            "no observations left after lag burn-in".to_string(),
        ));
    }
    let variance =
        residuals[start..].iter().map(|r| r * r).sum::<f64>() / effective as f64;
    if !variance.is_finite() {
        return Err(DemandError::Computation(
            "residual variance not finite".to_string(),
        ));
    }

    let n_eff = effective as f64;
    let k = spec.num_params() as f64;
    // Variance floored so a perfect fit still yields finite criteria
    // (the artifact must stay JSON-representable).
    let var_floor = variance.max(f64::MIN_POSITIVE);
    let log_likelihood =
        -0.5 * n_eff * (1.0 + var_floor.ln() + (2.0 * std::f64::consts::PI).ln());
    let aic = -2.0 * log_likelihood + 2.0 * k;
    let bic = -2.0 * log_likelihood + k * n_eff.ln();

    Ok((residuals, variance, aic, bic))
}

/// A trained SARIMA artifact: coefficients plus the training state needed
/// to continue the recursion into the future. Bound to exactly one spec
/// and one training series; never mutated after fitting.
///
/// Serializable so the model manager can persist and reload it; a reloaded
/// artifact forecasts identically to the freshly fit one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedSarima {
    spec: SarimaSpec,
    period: Period,
    coefficients: Coefficients,
    residuals: Vec<f64>,
    residual_variance: f64,
    aic: f64,
    bic: f64,
    /// Training values on the fitting scale (log1p-transformed when
    /// `log_space` is set).
    training: Vec<f64>,
    seasonal_diffed: Vec<f64>,
    diffed: Vec<f64>,
    last_timestamp: DateTime<Utc>,
    log_space: bool,
}

impl FittedSarima {
    pub fn spec(&self) -> SarimaSpec {
        self.spec
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.last_timestamp
    }

    /// Whether forecasts need the expm1 inverse transform.
    pub fn is_log_space(&self) -> bool {
        self.log_space
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// Forecast `horizon` steps with two-sided intervals at `level`
    /// (e.g. 0.95). Output is on the fitting scale: still log-space for
    /// log-space models, not yet clipped. The domain post-processing
    /// (inverse transform, clipping, rounding) belongs to the forecaster.
    pub fn forecast_raw(&self, horizon: usize, level: f64) -> Result<RawForecast> {
        if !(0.0..1.0).contains(&level) {
            return Err(DemandError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {level}"
            )));
        }

        // Continue the SARMA recursion on the differenced scale with
        // future shocks at their expectation of zero.
        let mut z = self.diffed.clone();
        let mut e = self.residuals.clone();
        let guard = self.spec.recursion_start();
        for _ in 0..horizon {
            let t = z.len();
            let pred = if t >= guard {
                self.coefficients.predict_at(t, self.spec.period(), &z, &e)
            } else {
                self.coefficients.intercept
            };
            z.push(pred);
            e.push(0.0);
        }
        let forecast_diffs = &z[self.diffed.len()..];

        // Unwind differencing: regular first (it was applied last), then
        // seasonal, anchored on the respective training histories.
        let undiffed = integrate(forecast_diffs, &self.seasonal_diffed, self.spec.d());
        let point = seasonal_integrate(
            &undiffed,
            &self.training,
            self.spec.seasonal_d(),
            self.spec.period(),
        );

        let z_score = quantile_normal((1.0 + level) / 2.0);
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, &p) in point.iter().enumerate() {
            // Variance accumulates with horizon on the differenced scale.
            let se = (self.residual_variance * (h + 1) as f64).sqrt();
            lower.push(p - z_score * se);
            upper.push(p + z_score * se);
        }

        Ok(RawForecast { point, lower, upper })
    }
}

/// Forecast on the fitting scale, before domain post-processing.
#[derive(Debug, Clone)]
pub struct RawForecast {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn monthly_series(values: Vec<f64>) -> Series {
        let timestamps = (0..values.len())
            .map(|i| {
                let month = (i % 12) as u32 + 1;
                let year = 2022 + (i / 12) as i32;
                Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
            })
            .collect();
        Series::new(timestamps, values).unwrap()
    }

    fn spec(order: (usize, usize, usize), seasonal: (usize, usize, usize, usize)) -> SarimaSpec {
        SarimaSpec::new(order, seasonal).unwrap()
    }

    #[test]
    fn spec_rejects_zero_period() {
        assert!(SarimaSpec::new((1, 1, 1), (0, 0, 0, 0)).is_err());
        // A seasonal AR term with no period would index off the end of
        // the series during forecasting; it must be unconstructible.
        assert!(SarimaSpec::new((0, 0, 0), (1, 0, 0, 0)).is_err());
    }

    #[test]
    fn decoded_spec_rejects_zero_period() {
        let json = r#"{"order":[0,0,0],"seasonal_order":[1,0,0,0]}"#;
        assert!(serde_json::from_str::<SarimaSpec>(json).is_err());
    }

    #[test]
    fn convenience_constructors_have_valid_periods() {
        assert_eq!(SarimaSpec::nonseasonal((1, 1, 1)).period(), 1);
        let weekly = SarimaSpec::with_yearly_cycle((1, 0, 1), (1, 0, 1), Period::Weekly);
        assert_eq!(weekly.seasonal_order(), (1, 0, 1, 52));
        assert_eq!(
            SarimaSpec::with_yearly_cycle((1, 0, 1), (1, 0, 1), Period::Monthly).period(),
            12
        );
    }

    #[test]
    fn spec_display_matches_convention() {
        let s = spec((1, 1, 1), (0, 1, 1, 12));
        assert_eq!(s.to_string(), "(1,1,1)(0,1,1,12)");
        assert_eq!(s.num_params(), 4);
    }

    #[test]
    fn fit_rejects_short_series() {
        let s = spec((2, 1, 1), (0, 0, 0, 1));
        let result = Sarima::new(s).fit(&monthly_series(vec![1.0, 2.0, 3.0]), Period::Monthly, false);
        assert!(matches!(result, Err(DemandError::InsufficientData { .. })));
    }

    #[test]
    fn linear_trend_continues_under_differencing() {
        // 24 months climbing by 100; d=1 turns this into a constant, so
        // forecasts should keep climbing by roughly 100 per step.
        let values: Vec<f64> = (1..=24).map(|i| (i * 100) as f64).collect();
        let series = monthly_series(values);
        let s = spec((1, 1, 1), (0, 0, 0, 1));
        let fitted = Sarima::new(s).fit(&series, Period::Monthly, false).unwrap();

        let raw = fitted.forecast_raw(12, 0.95).unwrap();
        assert_eq!(raw.point.len(), 12);
        assert!(
            (raw.point[0] - 2500.0).abs() < 200.0,
            "first step {} should continue the trend",
            raw.point[0]
        );
        assert!(
            (raw.point[11] - 3600.0).abs() < 600.0,
            "last step {} should continue the trend",
            raw.point[11]
        );
        for w in raw.point.windows(2) {
            assert!(w[1] > w[0], "trend forecast should keep increasing");
        }
    }

    #[test]
    fn seasonal_pattern_repeats_in_forecast() {
        // Three years of a fixed monthly profile plus a little level noise.
        let profile = [120.0, 90.0, 100.0, 130.0, 150.0, 170.0, 200.0, 180.0, 140.0, 110.0, 95.0, 160.0];
        let values: Vec<f64> = (0..36)
            .map(|i| profile[i % 12] + ((i * 7) % 5) as f64)
            .collect();
        let series = monthly_series(values.clone());
        let s = spec((0, 0, 0), (0, 1, 0, 12));
        let fitted = Sarima::new(s).fit(&series, Period::Monthly, false).unwrap();

        let raw = fitted.forecast_raw(12, 0.95).unwrap();
        // Forecast January should look like past Januaries, etc.
        for (i, &p) in raw.point.iter().enumerate() {
            assert!(
                (p - profile[i]).abs() < 30.0,
                "month {i} forecast {p} far from profile {}",
                profile[i]
            );
        }
    }

    #[test]
    fn intervals_bracket_the_point_forecast() {
        let values: Vec<f64> = (0..30)
            .map(|i| 50.0 + 10.0 * ((i % 6) as f64) + (i % 4) as f64)
            .collect();
        let series = monthly_series(values);
        let fitted = Sarima::new(spec((1, 0, 1), (0, 0, 0, 1)))
            .fit(&series, Period::Monthly, false)
            .unwrap();

        let raw = fitted.forecast_raw(6, 0.95).unwrap();
        for i in 0..6 {
            assert!(raw.lower[i] <= raw.point[i]);
            assert!(raw.point[i] <= raw.upper[i]);
        }
        // Interval width grows with horizon.
        let first_width = raw.upper[0] - raw.lower[0];
        let last_width = raw.upper[5] - raw.lower[5];
        assert!(last_width >= first_width);
    }

    #[test]
    fn log_space_tag_is_carried() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + (i * 13 % 17) as f64).collect();
        let series = monthly_series(values);
        let fitted = Sarima::new(spec((1, 0, 0), (0, 0, 0, 1)))
            .fit(&series, Period::Monthly, true)
            .unwrap();
        assert!(fitted.is_log_space());
        // Fitted on the log scale, so raw forecasts are small.
        let raw = fitted.forecast_raw(3, 0.95).unwrap();
        assert!(raw.point.iter().all(|&p| p < 10.0));
    }

    #[test]
    fn artifact_serialization_round_trips_forecasts() {
        let values: Vec<f64> = (0..30).map(|i| 200.0 + (i as f64) * 5.0 + (i % 3) as f64).collect();
        let series = monthly_series(values);
        let fitted = Sarima::new(spec((1, 1, 1), (0, 0, 0, 12)))
            .fit(&series, Period::Monthly, false)
            .unwrap();

        let json = serde_json::to_vec(&fitted).unwrap();
        let reloaded: FittedSarima = serde_json::from_slice(&json).unwrap();

        let a = fitted.forecast_raw(8, 0.95).unwrap();
        let b = reloaded.forecast_raw(8, 0.95).unwrap();
        assert_eq!(a.point, b.point);
        assert_eq!(a.lower, b.lower);
        assert_eq!(a.upper, b.upper);
    }

    #[test]
    fn rejects_bad_confidence_level() {
        let values: Vec<f64> = (0..24).map(|i| 10.0 + i as f64).collect();
        let fitted = Sarima::new(spec((1, 1, 0), (0, 0, 0, 1)))
            .fit(&monthly_series(values), Period::Monthly, false)
            .unwrap();
        assert!(fitted.forecast_raw(5, 1.5).is_err());
    }
}
