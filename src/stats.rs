//! Descriptive statistics over millisecond samples.

use serde::{Deserialize, Serialize};

/// Reduced view of a sample set. All values are milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub total: f64,
}

impl Summary {
    /// Reduce `samples`; an empty slice gives an all-zero summary.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let total: f64 = samples.iter().sum();
        let mean = total / samples.len() as f64;

        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median: median_sorted(&sorted),
            stddev: population_stddev(samples, mean),
            total,
        }
    }
}

/// Median of an already sorted, non-empty slice.
fn median_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation: divides by `n`, not `n - 1`.
fn population_stddev(samples: &[f64], mean: f64) -> f64 {
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn three_samples() {
        let s = Summary::from_samples(&[10.0, 20.0, 30.0]);
        assert!(close(s.mean, 20.0));
        assert!(close(s.median, 20.0));
        assert!(close(s.min, 10.0));
        assert!(close(s.max, 30.0));
        assert!(close(s.total, 60.0));
        assert!((s.stddev - 8.1650).abs() < 1e-4);
    }

    #[test]
    fn even_count_median_averages_central_pair() {
        let s = Summary::from_samples(&[15.0, 5.0]);
        assert!(close(s.median, 10.0));
    }

    #[test]
    fn unsorted_input_uses_sorted_boundaries() {
        let s = Summary::from_samples(&[3.0, 1.0, 4.0, 1.5, 9.0]);
        assert!(close(s.min, 1.0));
        assert!(close(s.max, 9.0));
        assert!(close(s.median, 3.0));
    }

    #[test]
    fn empty_is_all_zero() {
        assert_eq!(Summary::from_samples(&[]), Summary::default());
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let s = Summary::from_samples(&[4.2]);
        assert!(close(s.stddev, 0.0));
        assert!(close(s.median, 4.2));
    }

    proptest! {
        #[test]
        fn mean_times_len_is_sum(samples in prop::collection::vec(0.0f64..10_000.0, 1..200)) {
            let s = Summary::from_samples(&samples);
            let n = samples.len() as f64;
            let sum: f64 = samples.iter().sum();
            prop_assert!((s.mean * n - sum).abs() <= 1e-9 * sum.abs().max(1.0));
        }

        #[test]
        fn ordering_invariants_hold(samples in prop::collection::vec(0.0f64..10_000.0, 1..200)) {
            let s = Summary::from_samples(&samples);
            prop_assert!(s.min <= s.median && s.median <= s.max);
            prop_assert!(s.min <= s.mean + 1e-9 && s.mean <= s.max + 1e-9);
            prop_assert!(s.stddev >= 0.0);
        }
    }
}
