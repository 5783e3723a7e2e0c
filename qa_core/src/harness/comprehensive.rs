//! Platform-wide runner.
//!
//! Runs accuracy, performance and accessibility for a list of calculators
//! and rolls the results up into platform statistics. A harness that cannot
//! run for one calculator (no suite, compute wiring missing) is logged and
//! left out of that calculator's score; it never aborts the batch. Only
//! cancellation does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::accessibility::AccessibilityReport;
use super::executor::CancellationToken;
use super::performance::PerformanceReport;
use crate::benchmark::{RunOptions, ValidationReport};
use crate::context::EngineContext;
use crate::errors::{QaError, QaResult};
use crate::report::{CertificationStatus, Rating};

const ACCURACY_WEIGHT: f64 = 0.6;
const PERFORMANCE_WEIGHT: f64 = 0.4;

/// Industry reference points with the band counted as "at".
pub const INDUSTRY_ACCURACY: (f64, f64) = (95.0, 2.0);
pub const INDUSTRY_PERFORMANCE: (f64, f64) = (85.0, 5.0);
pub const INDUSTRY_ACCESSIBILITY: (f64, f64) = (80.0, 5.0);

#[derive(Debug, Clone)]
pub struct ComprehensiveOptions {
    pub accuracy: bool,
    pub performance: bool,
    pub accessibility: bool,
    pub cancel: Option<CancellationToken>,
}

impl Default for ComprehensiveOptions {
    fn default() -> Self {
        ComprehensiveOptions {
            accuracy: true,
            performance: true,
            accessibility: true,
            cancel: None,
        }
    }
}

/// Everything measured for one calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorOutcome {
    pub calculator_id: String,
    /// Weighted accuracy/performance score, 0-100
    pub overall_score: u32,
    pub certification: CertificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<AccessibilityReport>,
    /// Harnesses that could not run, with the reason
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CalculatorOutcome {
    fn ran_anything(&self) -> bool {
        self.accuracy.is_some() || self.performance.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndustryStanding {
    Above,
    At,
    Below,
}

impl IndustryStanding {
    /// Above `reference + band`, below `reference - band`, else at.
    pub fn compare(value: f64, (reference, band): (f64, f64)) -> Self {
        if value > reference + band {
            IndustryStanding::Above
        } else if value < reference - band {
            IndustryStanding::Below
        } else {
            IndustryStanding::At
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndustryStanding::Above => "above",
            IndustryStanding::At => "at",
            IndustryStanding::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryComparison {
    pub accuracy: IndustryStanding,
    pub performance: IndustryStanding,
    pub accessibility: IndustryStanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatistics {
    pub average_accuracy_score: f64,
    pub average_performance_score: f64,
    pub average_accessibility_score: f64,
    /// Share of calculators certified, 0-100
    pub certification_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveReport {
    pub timestamp: DateTime<Utc>,
    pub calculators: Vec<CalculatorOutcome>,
    pub statistics: PlatformStatistics,
    pub industry_comparison: IndustryComparison,
    pub recommendations: Vec<String>,
}

/// Weighted score over whichever of the two reports ran.
pub fn overall_score(accuracy: Option<&ValidationReport>, performance: Option<&PerformanceReport>) -> u32 {
    let mut total = 0.0;
    let mut weights = 0.0;
    if let Some(report) = accuracy {
        total += report.success_rate * ACCURACY_WEIGHT;
        weights += ACCURACY_WEIGHT;
    }
    if let Some(report) = performance {
        total += report.success_rate * PERFORMANCE_WEIGHT;
        weights += PERFORMANCE_WEIGHT;
    }
    if weights > 0.0 {
        (total / weights).round() as u32
    } else {
        0
    }
}

/// Accuracy must not fail and performance must not be poor.
pub fn combined_certification(
    accuracy: Option<&ValidationReport>,
    performance: Option<&PerformanceReport>,
) -> CertificationStatus {
    let accuracy_status = accuracy.map(|r| r.certification_status);
    let performance_poor = performance.is_some_and(|r| r.rating == Rating::Poor);

    if accuracy_status == Some(CertificationStatus::Failed) || performance_poor {
        CertificationStatus::Failed
    } else if accuracy_status == Some(CertificationStatus::Passed) {
        CertificationStatus::Passed
    } else {
        CertificationStatus::Pending
    }
}

/// Keep a harness report, or record why it is missing. Cancellation propagates.
fn keep<T>(calculator_id: &str, harness: &str, result: QaResult<T>, errors: &mut Vec<String>) -> QaResult<Option<T>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(e @ QaError::Cancelled { .. }) => Err(e),
        Err(e) => {
            warn!(calculator_id, harness, error = %e, "harness skipped");
            errors.push(format!("{} tests unavailable: {}", harness, e));
            Ok(None)
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn statistics(outcomes: &[CalculatorOutcome]) -> PlatformStatistics {
    let certified = outcomes
        .iter()
        .filter(|o| o.certification == CertificationStatus::Passed)
        .count();
    PlatformStatistics {
        average_accuracy_score: mean(outcomes.iter().filter_map(|o| o.accuracy.as_ref()).map(|r| r.success_rate)),
        average_performance_score: mean(outcomes.iter().filter_map(|o| o.performance.as_ref()).map(|r| r.success_rate)),
        average_accessibility_score: mean(
            outcomes
                .iter()
                .filter_map(|o| o.accessibility.as_ref())
                .map(|r| f64::from(r.overall_score)),
        ),
        certification_rate: crate::report::success_rate(certified, outcomes.len()),
    }
}

fn platform_recommendations(outcomes: &[CalculatorOutcome], stats: &PlatformStatistics) -> Vec<String> {
    let mut out = Vec::new();
    let count = |status| outcomes.iter().filter(|o| o.certification == status).count();

    let failed = count(CertificationStatus::Failed);
    if failed > 0 {
        out.push(format!("{} calculator(s) failed certification - immediate attention required", failed));
    }
    let pending = count(CertificationStatus::Pending);
    if pending > 0 {
        out.push(format!("{} calculator(s) pending certification - review and improvements needed", pending));
    }

    let ran_accuracy = outcomes.iter().any(|o| o.accuracy.is_some());
    if ran_accuracy && stats.average_accuracy_score < INDUSTRY_ACCURACY.0 {
        out.push("Overall accuracy below industry standard (95%) - focus on calculation precision".to_string());
    }
    let ran_accessibility = outcomes.iter().any(|o| o.accessibility.is_some());
    if ran_accessibility && stats.average_accessibility_score < INDUSTRY_ACCESSIBILITY.0 {
        out.push("Accessibility score below target (80%) - improve WCAG compliance".to_string());
    }

    if !outcomes.is_empty() {
        if stats.certification_rate >= 90.0 {
            out.push("Excellent certification rate - platform meets professional standards".to_string());
        } else if stats.certification_rate < 70.0 {
            out.push("Low certification rate - comprehensive review and improvements needed".to_string());
        }
    }
    out
}

impl EngineContext {
    /// Run every enabled harness for each of `calculator_ids`.
    ///
    /// # Errors
    ///
    /// Only `Cancelled`; per-calculator failures are recorded on the
    /// calculator's outcome.
    pub fn run_comprehensive(&self, calculator_ids: &[String], options: &ComprehensiveOptions) -> QaResult<ComprehensiveReport> {
        let run_options = RunOptions {
            cancel: options.cancel.clone(),
        };
        let mut outcomes = Vec::with_capacity(calculator_ids.len());

        for calculator_id in calculator_ids {
            if options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(QaError::Cancelled {
                    context: format!("comprehensive run before {}", calculator_id),
                });
            }
            let outcome = self.run_calculator(calculator_id, options, &run_options)?;
            info!(
                calculator_id = %calculator_id,
                score = outcome.overall_score,
                certification = %outcome.certification,
                "calculator testing complete"
            );
            outcomes.push(outcome);
        }

        let stats = statistics(&outcomes);
        let industry_comparison = IndustryComparison {
            accuracy: IndustryStanding::compare(stats.average_accuracy_score, INDUSTRY_ACCURACY),
            performance: IndustryStanding::compare(stats.average_performance_score, INDUSTRY_PERFORMANCE),
            accessibility: IndustryStanding::compare(stats.average_accessibility_score, INDUSTRY_ACCESSIBILITY),
        };
        let recommendations = platform_recommendations(&outcomes, &stats);

        info!(
            calculators = outcomes.len(),
            certification_rate = stats.certification_rate,
            "comprehensive run finished"
        );

        Ok(ComprehensiveReport {
            timestamp: Utc::now(),
            calculators: outcomes,
            statistics: stats,
            industry_comparison,
            recommendations,
        })
    }

    fn run_calculator(
        &self,
        calculator_id: &str,
        options: &ComprehensiveOptions,
        run_options: &RunOptions,
    ) -> QaResult<CalculatorOutcome> {
        let mut errors = Vec::new();

        let accuracy = if options.accuracy {
            keep(calculator_id, "Accuracy", self.run_tests_with(calculator_id, run_options), &mut errors)?
        } else {
            None
        };
        let performance = if options.performance {
            keep(
                calculator_id,
                "Performance",
                self.run_performance_tests_with(calculator_id, run_options),
                &mut errors,
            )?
        } else {
            None
        };
        let accessibility = if options.accessibility {
            let report = self.ui_snapshot(calculator_id).map(|ui| self.run_accessibility_tests(&ui));
            keep(calculator_id, "Accessibility", report, &mut errors)?
        } else {
            None
        };

        let mut outcome = CalculatorOutcome {
            calculator_id: calculator_id.to_string(),
            overall_score: overall_score(accuracy.as_ref(), performance.as_ref()),
            certification: combined_certification(accuracy.as_ref(), performance.as_ref()),
            recommendations: accuracy
                .iter()
                .flat_map(|r| r.recommendations.iter())
                .chain(performance.iter().flat_map(|r| r.recommendations.iter()))
                .cloned()
                .collect(),
            accuracy,
            performance,
            accessibility,
            errors,
        };
        if !outcome.ran_anything() && (options.accuracy || options.performance) {
            outcome.certification = CertificationStatus::Failed;
            outcome
                .recommendations
                .extend(outcome.errors.iter().map(|e| format!("Testing failed: {}", e)));
        }
        Ok(outcome)
    }
}
