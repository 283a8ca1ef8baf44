//! Basic statistics.

/// Mean of a slice; NaN when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 denominator); NaN below two elements.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Standard normal quantile via the Abramowitz & Stegun rational
/// approximation (26.2.23). Accurate to about 4.5e-4, plenty for
/// prediction-interval widths.
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = p.min(1.0 - p);
    let t = (-2.0 * tail.ln()).sqrt();

    let numerator = 2.515517 + 0.802853 * t + 0.010328 * t * t;
    let denominator = 1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t;
    let z = t - numerator / denominator;

    if p < 0.5 {
        -z
    } else {
        z
    }
}
