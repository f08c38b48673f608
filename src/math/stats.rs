//! Small numeric helpers shared by the warper, extractor and scorer.
//!
//! All functions are pure and allocation-light. Statistics follow the usual
//! array-library conventions: population standard deviation, `NaN` for empty
//! input rather than an error.

use std::cmp::Ordering;

/// Index of the element of `sorted` closest to `target`.
///
/// `sorted` must be ascending. Ties resolve to the lower index. Returns `None`
/// for an empty slice.
pub fn nearest_index(sorted: &[f64], target: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let upper = sorted.partition_point(|&x| x < target);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted.len() {
        return Some(sorted.len() - 1);
    }
    let lower = upper - 1;
    if (target - sorted[lower]).abs() <= (sorted[upper] - target).abs() {
        Some(lower)
    } else {
        Some(upper)
    }
}

/// Resample `values` to `len` points, mapping first to first and last to last
/// and interpolating linearly in between.
pub fn resample_linear(values: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || values.is_empty() {
        return Vec::new();
    }
    if len == 1 || values.len() == 1 {
        return vec![values[0]; len];
    }
    if len == values.len() {
        return values.to_vec();
    }

    let ratio = (values.len() - 1) as f64 / (len - 1) as f64;
    (0..len)
        .map(|j| {
            let x = j as f64 * ratio;
            let i0 = (x.floor() as usize).min(values.len() - 1);
            let i1 = (i0 + 1).min(values.len() - 1);
            let u = x - i0 as f64;
            values[i0] + u * (values[i1] - values[i0])
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Pearson correlation of two equal-length series.
///
/// `NaN` with fewer than two points, mismatched lengths, or zero variance in
/// either series.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Root mean squared difference of two equal-length series.
pub fn rmse(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return f64::NAN;
    }
    let mse = x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum::<f64>() / x.len() as f64;
    mse.sqrt()
}

/// Round half to even at `decimals` places (array-library `round` semantics).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_index_breaks_ties_low() {
        let d = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&d, 1.5), Some(1));
        assert_eq!(nearest_index(&d, 1.6), Some(2));
        assert_eq!(nearest_index(&d, -4.0), Some(0));
        assert_eq!(nearest_index(&d, 10.0), Some(3));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn resample_keeps_endpoints_and_is_identity_at_same_length() {
        let v = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(resample_linear(&v, 4), v.to_vec());

        let up = resample_linear(&v, 7);
        assert_eq!(up.len(), 7);
        assert!((up[0] - 0.0).abs() < 1e-12);
        assert!((up[6] - 30.0).abs() < 1e-12);
        assert!((up[1] - 5.0).abs() < 1e-12);

        let down = resample_linear(&v, 2);
        assert_eq!(down, vec![0.0, 30.0]);
    }

    #[test]
    fn summary_stats_match_population_conventions() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        assert!((std_dev(&v) - 2.0).abs() < 1e-12);
        assert!((median(&v) - 4.5).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn pearson_and_rmse_on_identical_series() {
        let x = [1.0, 2.0, 3.5, 7.0];
        assert!((pearson(&x, &x) - 1.0).abs() < 1e-12);
        assert_eq!(rmse(&x, &x), 0.0);
        assert!(pearson(&[1.0, 1.0], &[2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn round_to_uses_half_even() {
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_to(1.26, 1), 1.3);
        assert_eq!(round_to(-7.45678, 2), -7.46);
    }
}
