pub fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

pub fn compute_max(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Index of the first value equal to the maximum.
pub fn first_argmax(vals: &[f64]) -> Option<usize> {
    let max = compute_max(vals);
    vals.iter().position(|&val| val == max)
}

/// Compute the trailing rolling mean over `window` values.
///
/// Positions with fewer than `window` values up to and including them have no mean.
pub fn rolling_mean(vals: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; vals.len()];
    }
    (0..vals.len())
        .map(|idx| {
            if idx + 1 < window {
                None
            } else {
                Some(compute_mean(&vals[idx + 1 - window..=idx]))
            }
        })
        .collect()
}
