//! # Reports
//!
//! Shared verdict types for accuracy, performance and accessibility reports,
//! plus rendering of an accuracy report for export.
//!
//! ## Modules
//!
//! - [`export`] - The interchange document and its atomic file write
//! - [`markdown`] - Human-readable markdown rendering

pub mod export;
pub mod markdown;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{CertificationThresholds, RatingBands};

/// Release verdict for a calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationStatus {
    Passed,
    Failed,
    Pending,
}

impl CertificationStatus {
    /// Verdict for an accuracy run.
    ///
    /// ```rust
    /// use qa_core::config::CertificationThresholds;
    /// use qa_core::report::CertificationStatus;
    ///
    /// let bands = CertificationThresholds::default();
    /// assert_eq!(CertificationStatus::from_rates(95.0, 90.0, &bands), CertificationStatus::Passed);
    /// assert_eq!(CertificationStatus::from_rates(79.0, 100.0, &bands), CertificationStatus::Failed);
    /// assert_eq!(CertificationStatus::from_rates(85.0, 100.0, &bands), CertificationStatus::Pending);
    /// ```
    pub fn from_rates(success_rate: f64, benchmark_success_rate: f64, bands: &CertificationThresholds) -> Self {
        if success_rate >= bands.pass_success_rate && benchmark_success_rate >= bands.pass_benchmark_rate {
            CertificationStatus::Passed
        } else if success_rate < bands.fail_success_rate || benchmark_success_rate < bands.fail_benchmark_rate {
            CertificationStatus::Failed
        } else {
            CertificationStatus::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertificationStatus::Passed => "passed",
            CertificationStatus::Failed => "failed",
            CertificationStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality band for performance and accessibility reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl Rating {
    pub fn from_pass_rate(pass_rate: f64, warnings: usize, bands: &RatingBands) -> Self {
        if pass_rate >= bands.excellent_pass_rate && warnings == 0 {
            Rating::Excellent
        } else if pass_rate >= bands.good_pass_rate && warnings <= bands.good_max_warnings {
            Rating::Good
        } else if pass_rate >= bands.acceptable_pass_rate {
            Rating::Acceptable
        } else {
            Rating::Poor
        }
    }

    /// Excellent and good certify; poor fails; acceptable stays pending.
    pub fn certification(self) -> CertificationStatus {
        match self {
            Rating::Excellent | Rating::Good => CertificationStatus::Passed,
            Rating::Acceptable => CertificationStatus::Pending,
            Rating::Poor => CertificationStatus::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Acceptable => "acceptable",
            Rating::Poor => "poor",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `passed / total * 100`, or 0 when nothing ran.
pub fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}
