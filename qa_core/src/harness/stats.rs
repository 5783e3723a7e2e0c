//! Latency statistics.

use serde::{Deserialize, Serialize};

/// Value at percentile `p` (0..=100) by linear interpolation between the two
/// nearest ranks, with rank index `p / 100 * (n - 1)`. Empty input gives 0.
///
/// ```rust
/// use qa_core::harness::stats::percentile;
///
/// let samples = [50.0, 10.0, 40.0, 20.0, 30.0];
/// assert_eq!(percentile(&samples, 50.0), 30.0);
/// assert!((percentile(&samples, 99.0) - 49.6).abs() < 1e-9);
/// ```
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let idx = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let (lo, hi) = (sorted[lower], sorted[upper]);
    let weight = idx - lower as f64;
    (lo + (hi - lo) * weight).clamp(lo, hi)
}

/// Summary of a latency sample set, all times in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    /// Calculations per second over the summed sample time
    pub throughput: f64,
}

impl LatencyStats {
    pub fn from_samples(samples_ms: &[f64]) -> Self {
        if samples_ms.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = samples_ms.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let total: f64 = sorted.iter().sum();
        let mean = total / count as f64;
        let variance = sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;

        LatencyStats {
            count,
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
            p50: percentile_sorted(&sorted, 50.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
            throughput: if total > 0.0 { count as f64 * 1000.0 / total } else { 0.0 },
        }
    }

    /// Standard deviation relative to the mean; 0 for an empty or all-zero set.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean > 0.0 {
            self.std_dev / self.mean
        } else {
            0.0
        }
    }
}
