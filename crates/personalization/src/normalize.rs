//! Numeric rescaling used by the scorers.

/// Map each value to `(v - min) / (max - min)`.
///
/// When every value is equal the result is uniformly 0.5, so ties land in
/// the middle of the range instead of on the floor.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![0.5; values.len()];
    }
    let range = max - min;
    values.iter().map(|v| (v - min) / range).collect()
}

/// Map each value to `min(|v| / max|v|, 1)`.
///
/// Lossy on purpose: the sign is dropped, so `-x` and `x` normalize to the
/// same value. An all-zero input is returned unchanged.
pub fn max_by_magnitude(values: &[f64]) -> Vec<f64> {
    let max_abs = values.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
    if max_abs == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| (v.abs() / max_abs).min(1.0)).collect()
}

/// Exponential normalization into a probability distribution. The maximum
/// is subtracted first so large inputs do not overflow.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_scales_to_unit_range() {
        assert_eq!(min_max(&[1.0, 2.0, 3.0, 4.0, 5.0]), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_min_max_ties_map_to_half() {
        assert!(min_max(&[]).is_empty());
        assert_eq!(min_max(&[5.0]), vec![0.5]);
        assert_eq!(min_max(&[3.0, 3.0, 3.0]), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_max_by_magnitude() {
        assert_eq!(max_by_magnitude(&[10.0, 20.0, 30.0, 40.0]), vec![0.25, 0.5, 0.75, 1.0]);
        // Sign is discarded.
        assert_eq!(max_by_magnitude(&[-10.0, -5.0, 0.0, 5.0]), vec![1.0, 0.5, 0.0, 0.5]);
        assert_eq!(max_by_magnitude(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(max_by_magnitude(&[]).is_empty());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let result = softmax(&[1.0, 2.0, 3.0]);
        assert_eq!(result.len(), 3);
        assert!((result.iter().sum::<f64>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_large_values_stay_finite() {
        let result = softmax(&[100.0, 200.0, 300.0]);
        assert!(result.iter().all(|p| p.is_finite()));
        assert!((result.iter().sum::<f64>() - 1.0).abs() < 1e-5);
        assert!(result[2] > result[1] && result[2] > result[0]);
    }
}
