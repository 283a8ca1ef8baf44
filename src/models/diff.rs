//! Differencing and integration for SARIMA.

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `d` rounds of seasonal differencing at the given period.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            break;
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(current, previous)| current - previous)
            .collect();
    }
    result
}

/// Undo `d` rounds of first differencing on forecasted values, anchored
/// on the original (pre-differencing) training series.
pub fn integrate(forecast_diffs: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || forecast_diffs.is_empty() {
        return forecast_diffs.to_vec();
    }

    let mut result = forecast_diffs.to_vec();
    for level in (0..d).rev() {
        let anchor = if level == 0 {
            original.last().copied().unwrap_or(0.0)
        } else {
            difference(original, level).last().copied().unwrap_or(0.0)
        };
        let mut cumulative = anchor;
        for value in result.iter_mut() {
            cumulative += *value;
            *value = cumulative;
        }
    }
    result
}

/// Undo `d` rounds of seasonal differencing on forecasted values. Each
/// forecast step adds back the value one season earlier, drawing first
/// from the training tail and then from already-integrated forecasts.
pub fn seasonal_integrate(
    forecast_diffs: &[f64],
    original: &[f64],
    d: usize,
    period: usize,
) -> Vec<f64> {
    if d == 0 || period == 0 || forecast_diffs.is_empty() {
        return forecast_diffs.to_vec();
    }

    let mut result = forecast_diffs.to_vec();
    for level in (0..d).rev() {
        let mut extended = seasonal_difference(original, level, period);
        let mut integrated = Vec::with_capacity(result.len());
        for &diff in &result {
            let len = extended.len();
            let seasonal_base = if len >= period {
                extended[len - period]
            } else {
                0.0
            };
            let value = diff + seasonal_base;
            integrated.push(value);
            extended.push(value);
        }
        result = integrated;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_difference() {
        assert_eq!(
            difference(&[1.0, 3.0, 6.0, 10.0, 15.0], 1),
            vec![2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn second_difference() {
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0, 15.0], 2), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn difference_order_zero_is_identity() {
        let series = vec![4.0, 4.0, 5.0];
        assert_eq!(difference(&series, 0), series);
    }

    #[test]
    fn seasonal_difference_removes_stable_season() {
        let series = vec![
            100.0, 120.0, 80.0, 90.0, // year one
            110.0, 130.0, 90.0, 100.0, // year two, all +10
        ];
        assert_eq!(
            seasonal_difference(&series, 1, 4),
            vec![10.0, 10.0, 10.0, 10.0]
        );
    }

    #[test]
    fn integrate_reverses_difference() {
        let original = vec![10.0, 12.0, 15.0, 19.0, 24.0];
        let integrated = integrate(&[6.0, 7.0], &original, 1);
        assert_relative_eq!(integrated[0], 30.0, epsilon = 1e-12);
        assert_relative_eq!(integrated[1], 37.0, epsilon = 1e-12);
    }

    #[test]
    fn seasonal_integrate_reverses_seasonal_difference() {
        let original = vec![100.0, 120.0, 80.0, 90.0, 110.0, 130.0, 90.0, 100.0];
        // Forecasting constant seasonal diffs of +10 continues the pattern.
        let integrated = seasonal_integrate(&[10.0, 10.0, 10.0, 10.0, 10.0], &original, 1, 4);
        assert_eq!(integrated, vec![120.0, 140.0, 100.0, 110.0, 130.0]);
    }

    #[test]
    fn seasonal_integrate_feeds_forecasts_forward() {
        // Fifth forecast step must anchor on the first forecast, not history.
        let original = vec![1.0, 2.0, 3.0, 4.0];
        let integrated = seasonal_integrate(&[0.5; 8], &original, 1, 4);
        assert_relative_eq!(integrated[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(integrated[4], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn second_order_integration_continues_a_quadratic() {
        // y = i^2 has constant second differences of 2; continuing them
        // must reproduce the next squares.
        let original: Vec<f64> = (0..12).map(|i| (i * i) as f64).collect();
        let integrated = integrate(&[2.0, 2.0], &original, 2);
        assert_relative_eq!(integrated[0], 144.0, epsilon = 1e-12);
        assert_relative_eq!(integrated[1], 169.0, epsilon = 1e-12);
    }
}
