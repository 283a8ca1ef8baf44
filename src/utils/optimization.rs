//! Derivative-free minimization for coefficient estimation.

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub optimal_point: Vec<f64>,
    pub optimal_value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder-Mead tuning knobs. Defaults are the textbook coefficients.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative step used to seed the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Minimize `objective` with the Nelder-Mead simplex method, optionally
/// clamping every candidate point into `bounds`.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let clamp = |point: &[f64]| -> Vec<f64> {
        match bounds {
            Some(bounds) => point
                .iter()
                .zip(bounds)
                .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
                .collect(),
            None => point.to_vec(),
        }
    };

    // Seed a simplex of n+1 vertices around the initial point.
    let mut simplex: Vec<Vec<f64>> = vec![clamp(initial)];
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(clamp(&vertex));
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        // Order vertices best-to-worst.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        if (values[n] - values[0]).abs() <= config.tolerance {
            converged = true;
            break;
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; n];
        for vertex in &simplex[..n] {
            for (c, &x) in centroid.iter_mut().zip(vertex) {
                *c += x / n as f64;
            }
        }

        let worst = simplex[n].clone();
        let blend = |coeff: f64| -> Vec<f64> {
            let point: Vec<f64> = centroid
                .iter()
                .zip(&worst)
                .map(|(&c, &w)| c + coeff * (c - w))
                .collect();
            clamp(&point)
        };

        let reflected = blend(config.alpha);
        let f_reflected = objective(&reflected);

        if f_reflected < values[0] {
            // Try to expand further along the same direction.
            let expanded = blend(config.gamma);
            let f_expanded = objective(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
        } else if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
        } else {
            // Contract toward the centroid.
            let contracted = blend(-config.rho);
            let f_contracted = objective(&contracted);
            if f_contracted < values[n] {
                simplex[n] = contracted;
                values[n] = f_contracted;
            } else {
                // Shrink everything toward the best vertex.
                let best = simplex[0].clone();
                for vertex in simplex.iter_mut().skip(1) {
                    for (x, &b) in vertex.iter_mut().zip(&best) {
                        *x = b + config.sigma * (*x - b);
                    }
                    *vertex = clamp(vertex);
                }
                for i in 1..=n {
                    values[i] = objective(&simplex[i]);
                }
            }
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
    }
}
