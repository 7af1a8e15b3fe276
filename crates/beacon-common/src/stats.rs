//! Nearest-rank percentile helpers shared by the aggregator and the alert
//! history.

use serde::{Deserialize, Serialize};

/// Returns the nearest-rank percentile of an ascending slice.
///
/// The index is `floor(n * p / 100)`, clamped to `n - 1`. `p` is clamped to
/// `[0, 100]`. An empty slice yields `0.0`.
///
/// # Examples
///
/// ```
/// use beacon_common::stats::nearest_rank;
///
/// let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
/// assert_eq!(nearest_rank(&sorted, 95.0), 50.0);
/// assert_eq!(nearest_rank(&sorted, 50.0), 30.0);
/// assert_eq!(nearest_rank(&[], 99.0), 0.0);
/// ```
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let n = sorted.len();
    let idx = ((n as f64 * p) / 100.0).floor() as usize;
    sorted[idx.min(n - 1)]
}

/// Sorts values ascending. NaN samples sort last.
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Summary statistics over a set of observed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Summary {
    /// Computes the summary, or `None` when there are no values.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        sort_values(&mut values);
        let count = values.len();
        let sum: f64 = values.iter().sum();
        Some(Self {
            count,
            min: values[0],
            max: values[count - 1],
            avg: sum / count as f64,
            p95: nearest_rank(&values, 95.0),
            p99: nearest_rank(&values, 99.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_clamps_at_hundred() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(nearest_rank(&sorted, 100.0), 3.0);
        assert_eq!(nearest_rank(&sorted, 250.0), 3.0);
        assert_eq!(nearest_rank(&sorted, 0.0), 1.0);
        assert_eq!(nearest_rank(&sorted, -5.0), 1.0);
    }

    #[test]
    fn nearest_rank_single_sample() {
        assert_eq!(nearest_rank(&[7.0], 50.0), 7.0);
        assert_eq!(nearest_rank(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn summary_over_unsorted_values() {
        let s = Summary::from_values(vec![30.0, 10.0, 50.0, 20.0, 40.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 50.0);
        assert_eq!(s.avg, 30.0);
        assert_eq!(s.p95, 50.0);
        assert_eq!(s.p99, 50.0);
    }

    #[test]
    fn summary_empty_is_none() {
        assert!(Summary::from_values(Vec::new()).is_none());
    }
}
