//! Descriptive statistics over one numeric series

use genbench_core::record::round_to;
use serde::{Deserialize, Serialize};

/// Decimal places kept in aggregates
pub const STAT_PRECISION: u32 = 4;

/// `avg`/`min`/`max`/`std_dev` are `None` when the series has no valid values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; 0 for a single value
    pub std_dev: Option<f64>,
    pub count: usize,
}

impl Stats {
    /// Summarise the finite values of `values`; NaN and infinities are skipped
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let n = values.len();
        if n == 0 {
            return Self::default();
        }

        let avg = values.iter().sum::<f64>() / n as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if n > 1 {
            let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Self {
            avg: Some(round_to(avg, STAT_PRECISION)),
            min: Some(round_to(min, STAT_PRECISION)),
            max: Some(round_to(max, STAT_PRECISION)),
            std_dev: Some(round_to(std_dev, STAT_PRECISION)),
            count: n,
        }
    }

    /// Like [`Stats::of`] for a series whose entries may be unavailable
    pub fn of_available<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Self::of(values.into_iter().flatten())
    }

    pub fn is_available(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series_is_unavailable() {
        let stats = Stats::of(Vec::new());
        assert_eq!(stats.avg, None);
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.count, 0);
        assert!(!stats.is_available());

        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"avg":null,"min":null,"max":null,"std_dev":null,"count":0}"#);
    }

    #[test]
    fn test_single_value() {
        let stats = Stats::of([72.25]);
        assert_eq!(stats.avg, Some(72.25));
        assert_eq!(stats.min, Some(72.25));
        assert_eq!(stats.max, Some(72.25));
        assert_eq!(stats.std_dev, Some(0.0));
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_sample_std_dev_and_rounding() {
        let stats = Stats::of([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.avg, Some(5.0));
        // sqrt(32 / 7)
        assert_eq!(stats.std_dev, Some(2.1381));
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(9.0));
    }

    #[test]
    fn test_unavailable_entries_skipped() {
        let stats = Stats::of_available([Some(0.5), None, Some(0.75), None]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.avg, Some(0.625));

        let stats = Stats::of_available([None, None]);
        assert_eq!(stats.avg, None);
    }
}
