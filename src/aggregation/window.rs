/// Reductions over consecutive, non-overlapping windows of `n` samples.
///
/// Sums and counts propagate NaN within a window. Maxima and minima skip NaN and give NaN only
/// when the whole window is missing.
pub trait WindowedReduce {
    fn sum_by(&self, n: usize) -> Vec<f32>;
    fn max_by(&self, n: usize) -> Vec<f32>;
    fn min_by(&self, n: usize) -> Vec<f32>;
    /// Number of samples above `threshold`.
    fn count_above_by(&self, n: usize, threshold: f32) -> Vec<f32>;
}

impl WindowedReduce for [f32] {
    fn sum_by(&self, n: usize) -> Vec<f32> {
        windows(self, n).map(|w| w.iter().sum()).collect()
    }

    fn max_by(&self, n: usize) -> Vec<f32> {
        windows(self, n)
            .map(|w| w.iter().copied().filter(|v| !v.is_nan()).reduce(f32::max).unwrap_or(f32::NAN))
            .collect()
    }

    fn min_by(&self, n: usize) -> Vec<f32> {
        windows(self, n)
            .map(|w| w.iter().copied().filter(|v| !v.is_nan()).reduce(f32::min).unwrap_or(f32::NAN))
            .collect()
    }

    fn count_above_by(&self, n: usize, threshold: f32) -> Vec<f32> {
        windows(self, n)
            .map(|w| {
                if w.iter().any(|v| v.is_nan()) {
                    return f32::NAN;
                }
                w.iter().filter(|v| **v > threshold).count() as f32
            })
            .collect()
    }
}

fn windows(data: &[f32], n: usize) -> std::slice::ChunksExact<'_, f32> {
    assert!(
        n > 0 && data.len() % n == 0,
        "{} samples do not split into windows of {}",
        data.len(),
        n
    );
    data.chunks_exact(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f32 = f32::NAN;

    #[test]
    fn test_sum_propagates_nan() {
        let data = [1.0, 2.0, 3.0, NAN, 5.0, 6.0];
        let sums = data.sum_by(3);
        assert_eq!(sums[0], 6.0);
        assert!(sums[1].is_nan());
    }

    #[test]
    fn test_extremes_skip_nan() {
        let data = [1.0, NAN, 3.0, NAN, NAN, NAN];
        assert_eq!(data.max_by(3)[0], 3.0);
        assert_eq!(data.min_by(3)[0], 1.0);
        assert!(data.max_by(3)[1].is_nan());
        assert!(data.min_by(3)[1].is_nan());
    }

    #[test]
    fn test_count_above() {
        let data = [0.0, 0.001, 0.002, 1.0, 0.0, 0.0];
        assert_eq!(data.count_above_by(3, 0.001), vec![1.0, 1.0]);
        assert!([0.5, NAN].count_above_by(2, 0.001)[0].is_nan());
    }

    #[test]
    #[should_panic]
    fn test_partial_window_is_a_contract_violation() {
        [1.0f32; 25].sum_by(24);
    }
}
