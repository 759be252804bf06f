//! Statistical reductions over a sample window
//!
//! Three policies, selected per metric:
//!
//! - **Mean** for the per-zone temperature/humidity slots and pressure.
//! - **Median** for CO₂, which sees occasional single-frame spikes the
//!   median shrugs off.
//! - **Trimmed mean** for PM2.5, whose optical sensor produces fat-tailed
//!   noise; 10% is cut from each end of the sorted window by count (floor
//!   rounding) before averaging.
//!
//! Every reduction is gated by a minimum sample count: below it the result
//! is `None` ("unavailable") rather than a number computed from an
//! under-filled window. All results are rounded to 2 decimal places.

use crate::metrics::{MIN_SAMPLES_FOR_TRIM, TRIM_FRACTION};

/// Rounds to 2 decimal places, matching the wire format's precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Arithmetic mean, gated by `min_samples`.
pub fn gated_mean(values: &[f64], min_samples: usize) -> Option<f64> {
    if values.len() < min_samples {
        return None;
    }
    Some(round2(mean(values)))
}

/// Median of the sorted window, gated by `min_samples`.
///
/// Even-count windows interpolate between the two central values.
pub fn gated_median(values: &[f64], min_samples: usize) -> Option<f64> {
    if values.len() < min_samples || values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    Some(round2(median))
}

/// Trimmed mean, gated by `min_samples`.
///
/// Sorts the window and discards `floor(n * 0.10)` samples from each end
/// before averaging. Falls back to a plain mean when the window holds fewer
/// than 5 samples, when the trim count floors to zero, or when trimming
/// would discard everything (degenerate small windows).
pub fn gated_trimmed_mean(values: &[f64], min_samples: usize) -> Option<f64> {
    if values.len() < min_samples || values.is_empty() {
        return None;
    }

    let n = values.len();
    if n < MIN_SAMPLES_FOR_TRIM {
        return Some(round2(mean(values)));
    }

    let k = (n as f64 * TRIM_FRACTION) as usize;
    if k == 0 || n - 2 * k == 0 {
        return Some(round2(mean(values)));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(round2(mean(&sorted[k..n - k])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mean_rounds_to_two_decimals() {
        assert_eq!(gated_mean(&[20.0, 21.0], 2), Some(20.5));
        assert_eq!(gated_mean(&[19.5, 19.7], 2), Some(19.6));
        assert_eq!(gated_mean(&[1.0, 2.0, 2.0], 2), Some(1.67));
    }

    #[test]
    fn under_filled_windows_are_unavailable() {
        assert_eq!(gated_mean(&[20.0], 2), None);
        assert_eq!(gated_median(&[400.0], 2), None);
        assert_eq!(gated_trimmed_mean(&[1.0, 2.0, 3.0, 4.0], 5), None);
        assert_eq!(gated_mean(&[], 2), None);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(gated_median(&[400.0, 420.0, 440.0], 2), Some(420.0));
        assert_eq!(gated_median(&[400.0, 420.0, 440.0, 460.0], 2), Some(430.0));
        // Order of arrival must not matter
        assert_eq!(gated_median(&[440.0, 400.0, 420.0], 2), Some(420.0));
    }

    #[test]
    fn trimmed_mean_five_samples_trims_nothing() {
        // floor(5 * 0.10) = 0, so this is a plain mean
        let values = [100.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(gated_trimmed_mean(&values, 5), Some(22.0));
    }

    #[test]
    fn trimmed_mean_ten_samples_drops_one_per_side() {
        // floor(10 * 0.10) = 1: drop the 1000 and the 0, average the rest
        let values = [5.0, 5.0, 1000.0, 5.0, 5.0, 0.0, 5.0, 5.0, 5.0, 5.0];
        assert_eq!(gated_trimmed_mean(&values, 5), Some(5.0));
    }

    #[test]
    fn trimmed_mean_below_five_is_plain_mean() {
        assert_eq!(gated_trimmed_mean(&[2.0, 4.0], 2), Some(3.0));
    }

    proptest! {
        /// The trimmed mean always lies within the sample range, so no
        /// amount of trimming can invent a value outside the window.
        #[test]
        fn trimmed_mean_is_bounded(values in proptest::collection::vec(0.0f64..500.0, 5..40)) {
            let result = gated_trimmed_mean(&values, 5).unwrap();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= round2(min) - 0.01);
            prop_assert!(result <= round2(max) + 0.01);
        }

        /// The median never exceeds the sample range either.
        #[test]
        fn median_is_bounded(values in proptest::collection::vec(0.0f64..5000.0, 2..40)) {
            let result = gated_median(&values, 2).unwrap();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= round2(min) - 0.01);
            prop_assert!(result <= round2(max) + 0.01);
        }
    }
}
