//! Rainfall aggregation for yearly, monthly and seasonal slices.
//!
//! This crate turns a raw monthly table into per-slice working tables and
//! exposes the metrics and annotations computed over them.

pub mod aggregator;
pub mod all_rainfall;
pub mod kmeans;
pub mod regression;
pub mod working_table;

pub use aggregator::{Aggregator, MonthSpan, SliceTag};
pub use all_rainfall::{AllRainfall, BarData, NormalComparison, SliceSelector};
pub use working_table::{ColumnValues, DerivedColumn, WorkingTable};

/// Small numeric helpers shared by the aggregator and its annotations.
pub mod stats {
    /// Round half to even after scaling by `10^precision`.
    pub fn round_to(value: f64, precision: u32) -> f64 {
        let factor = 10f64.powi(precision as i32);
        (value * factor).round_ties_even() / factor
    }

    /// Arithmetic mean, or `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Sample standard deviation (n - 1 in the denominator).
    pub fn sample_std(values: &[f64]) -> Option<f64> {
        if values.len() < 2 {
            return None;
        }
        let mean = mean(values)?;
        let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((sum_sq / (values.len() - 1) as f64).sqrt())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_round_to_half_even() {
            assert_eq!(round_to(2.345, 0), 2.0);
            assert_eq!(round_to(2.5, 0), 2.0);
            assert_eq!(round_to(3.5, 0), 4.0);
            assert_eq!(round_to(12.34, 1), 12.3);
            assert_eq!(round_to(-7.26, 1), -7.3);
        }

        #[test]
        fn test_mean() {
            assert_eq!(mean(&[]), None);
            assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        }

        #[test]
        fn test_sample_std() {
            assert_eq!(sample_std(&[4.0]), None);
            let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
            assert!((std - 2.138_089_935).abs() < 1e-9);
        }
    }
}
