//! # Engine Configuration
//!
//! Thresholds that drive classification, certification and the harnesses.
//! Every field has a default matching the reference release bar, so an empty
//! JSON object is a valid configuration file.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::config::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{ "default_tolerance": 0.005 }"#).unwrap();
//! assert_eq!(config.default_tolerance, 0.005);
//! assert_eq!(config.certification.pass_success_rate, 95.0);
//! config.validate().unwrap();
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{QaError, QaResult};

/// Root configuration for an [`EngineContext`](crate::context::EngineContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fractional tolerance applied when a test case does not set one
    pub default_tolerance: f64,

    /// A single test case slower than this gets a warning on its result (ms)
    pub slow_case_warning_ms: f64,

    /// Cases slower than this are counted in the "optimize" recommendation (ms)
    pub slow_case_recommendation_ms: f64,

    /// Per-case compute timeout for accuracy runs. `None` runs compute inline
    /// with no timeout.
    pub compute_timeout_ms: Option<u64>,

    /// Certification bar for accuracy reports
    pub certification: CertificationThresholds,

    /// Performance harness budget
    pub performance: PerformanceBudget,

    /// Pass-rate bands for performance and accessibility ratings
    pub rating: RatingBands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_tolerance: 0.01,
            slow_case_warning_ms: 5000.0,
            slow_case_recommendation_ms: 1000.0,
            compute_timeout_ms: None,
            certification: CertificationThresholds::default(),
            performance: PerformanceBudget::default(),
            rating: RatingBands::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: &Path) -> QaResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| QaError::file_error("read config", path.display().to_string(), e.to_string()))?;

        let config: EngineConfig = serde_json::from_str(&contents).map_err(|e| QaError::SerializationError {
            reason: format!("Invalid config in {}: {}", path.display(), e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that all thresholds are usable.
    pub fn validate(&self) -> QaResult<()> {
        if !(self.default_tolerance >= 0.0 && self.default_tolerance.is_finite()) {
            return Err(QaError::config("default_tolerance", "must be a finite, non-negative fraction"));
        }
        if self.slow_case_warning_ms < 0.0 || self.slow_case_recommendation_ms < 0.0 {
            return Err(QaError::config("slow_case_*_ms", "thresholds cannot be negative"));
        }
        if self.compute_timeout_ms == Some(0) {
            return Err(QaError::config("compute_timeout_ms", "timeout must be at least 1 ms"));
        }
        self.certification.validate()?;
        self.performance.validate()?;
        self.rating.validate()?;
        Ok(())
    }
}

/// Success-rate bands (percent) that decide a certification verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificationThresholds {
    /// Minimum test success rate for `passed`
    pub pass_success_rate: f64,
    /// Minimum benchmark success rate for `passed`
    pub pass_benchmark_rate: f64,
    /// Below this test success rate the verdict is `failed`
    pub fail_success_rate: f64,
    /// Below this benchmark success rate the verdict is `failed`
    pub fail_benchmark_rate: f64,
}

impl Default for CertificationThresholds {
    fn default() -> Self {
        CertificationThresholds {
            pass_success_rate: 95.0,
            pass_benchmark_rate: 90.0,
            fail_success_rate: 80.0,
            fail_benchmark_rate: 70.0,
        }
    }
}

impl CertificationThresholds {
    fn validate(&self) -> QaResult<()> {
        let rates = [
            ("pass_success_rate", self.pass_success_rate),
            ("pass_benchmark_rate", self.pass_benchmark_rate),
            ("fail_success_rate", self.fail_success_rate),
            ("fail_benchmark_rate", self.fail_benchmark_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=100.0).contains(&rate) {
                return Err(QaError::config(name, "must be a percentage between 0 and 100"));
            }
        }
        if self.fail_success_rate > self.pass_success_rate || self.fail_benchmark_rate > self.pass_benchmark_rate {
            return Err(QaError::config("certification", "fail bands must not exceed pass bands"));
        }
        Ok(())
    }
}

/// Iteration counts and pass thresholds for the performance harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceBudget {
    /// Measured iterations for the single-calculation test
    pub iterations: usize,
    /// Unmeasured warm-up iterations
    pub warmup_iterations: usize,
    /// Rounds over the whole suite for the suite-latency test
    pub suite_rounds: usize,
    /// Timeout for one compute invocation (ms)
    pub call_timeout_ms: u64,
    /// p95 budget for the single-calculation test (ms)
    pub single_p95_ms: f64,
    /// Minimum calculations per second
    pub min_throughput_per_sec: f64,
    /// p99 budget for the suite-latency test (ms)
    pub suite_p99_ms: f64,
    /// Maximum coefficient of variation before a consistency warning
    pub max_latency_cv: f64,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        PerformanceBudget {
            iterations: 1000,
            warmup_iterations: 10,
            suite_rounds: 10,
            call_timeout_ms: 1000,
            single_p95_ms: 10.0,
            min_throughput_per_sec: 100.0,
            suite_p99_ms: 50.0,
            max_latency_cv: 1.0,
        }
    }
}

impl PerformanceBudget {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    fn validate(&self) -> QaResult<()> {
        if self.iterations == 0 {
            return Err(QaError::config("performance.iterations", "must be at least 1"));
        }
        if self.suite_rounds == 0 {
            return Err(QaError::config("performance.suite_rounds", "must be at least 1"));
        }
        if self.call_timeout_ms == 0 {
            return Err(QaError::config("performance.call_timeout_ms", "must be at least 1 ms"));
        }
        if self.single_p95_ms <= 0.0 || self.suite_p99_ms <= 0.0 || self.min_throughput_per_sec <= 0.0 {
            return Err(QaError::config("performance", "latency and throughput thresholds must be positive"));
        }
        Ok(())
    }
}

/// Pass-rate bands (percent) for the excellent/good/acceptable/poor rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatingBands {
    /// Excellent also requires zero warnings
    pub excellent_pass_rate: f64,
    pub good_pass_rate: f64,
    pub good_max_warnings: usize,
    pub acceptable_pass_rate: f64,
}

impl Default for RatingBands {
    fn default() -> Self {
        RatingBands {
            excellent_pass_rate: 95.0,
            good_pass_rate: 85.0,
            good_max_warnings: 2,
            acceptable_pass_rate: 70.0,
        }
    }
}

impl RatingBands {
    fn validate(&self) -> QaResult<()> {
        let ordered = self.acceptable_pass_rate <= self.good_pass_rate && self.good_pass_rate <= self.excellent_pass_rate;
        if !ordered || self.acceptable_pass_rate < 0.0 || self.excellent_pass_rate > 100.0 {
            return Err(QaError::config("rating", "bands must satisfy 0 <= acceptable <= good <= excellent <= 100"));
        }
        Ok(())
    }
}
