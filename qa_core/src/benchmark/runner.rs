//! Suite execution and the accuracy report.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::compare::{compare_field, FieldComparison};
use super::{TestCase, TestStatus, TestSuite};
use crate::calculator::Calculator;
use crate::context::EngineContext;
use crate::errors::{ComputeError, QaError, QaResult};
use crate::harness::executor::{BoundedExecutor, CancellationToken};
use crate::report::{success_rate, CertificationStatus};
use crate::values::{as_number, FieldMap};

/// Success rate at or above which the report praises the suite.
const EXCELLENT_SUCCESS_RATE: f64 = 98.0;

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: String,
    pub status: TestStatus,
    pub passed: bool,
    pub comparisons: Vec<FieldComparison>,
    pub actual_outputs: FieldMap,
    pub execution_time_ms: f64,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl TestResult {
    /// Number of comparisons outside tolerance.
    pub fn outside_tolerance(&self) -> usize {
        self.comparisons.iter().filter(|c| !c.within_tolerance).count()
    }
}

/// Cross-check of one test case against a reference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub test_id: String,
    pub source: String,
    pub passed: bool,
    /// Absolute difference from the reference; `None` when no numeric
    /// primary output was produced.
    pub variance: Option<f64>,
}

/// Aggregate accuracy report for one calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub calculator_id: String,
    pub suite_name: String,
    pub timestamp: DateTime<Utc>,
    /// Cases that ran
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    /// Cases not run because the run was cancelled
    pub skipped_tests: usize,
    pub success_rate: f64,
    pub average_execution_time_ms: f64,
    pub benchmark_success_rate: f64,
    pub results: Vec<TestResult>,
    pub benchmarks: Vec<BenchmarkResult>,
    pub certification_status: CertificationStatus,
    pub recommendations: Vec<String>,
}

/// Per-run options for [`EngineContext::run_tests_with`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_cancel(token: CancellationToken) -> Self {
        RunOptions { cancel: Some(token) }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl EngineContext {
    /// Run the registered suite for `calculator_id`.
    ///
    /// # Errors
    ///
    /// `SuiteNotFound` or `CalculatorNotRegistered` for wiring problems and
    /// `HookFailed` when setup fails. Failures inside a case are recorded on
    /// its [`TestResult`] instead.
    pub fn run_tests(&self, calculator_id: &str) -> QaResult<ValidationReport> {
        self.run_tests_with(calculator_id, &RunOptions::default())
    }

    pub fn run_tests_with(&self, calculator_id: &str, options: &RunOptions) -> QaResult<ValidationReport> {
        let suite = self
            .test_suite(calculator_id)
            .ok_or_else(|| QaError::suite_not_found(calculator_id))?;
        let calculator = self
            .calculator(calculator_id)
            .ok_or_else(|| QaError::calculator_not_registered(calculator_id))?;

        if let Some(setup) = suite.setup_hook() {
            setup().map_err(|reason| QaError::hook_failed(calculator_id, "setup", reason))?;
        }

        let outcome = self.run_cases(suite, calculator, options);

        if let Some(teardown) = suite.teardown_hook() {
            if let Err(reason) = teardown() {
                warn!(calculator_id, %reason, "suite teardown failed");
            }
        }

        let (results, skipped) = outcome?;
        let report = self.build_report(suite, calculator, results, skipped);
        info!(
            calculator_id,
            total = report.total_tests,
            passed = report.passed_tests,
            skipped = report.skipped_tests,
            certification = %report.certification_status,
            "test suite finished"
        );
        Ok(report)
    }

    fn run_cases(
        &self,
        suite: &TestSuite,
        calculator: &Calculator,
        options: &RunOptions,
    ) -> QaResult<(Vec<TestResult>, usize)> {
        let mut executor = self
            .config()
            .compute_timeout_ms
            .map(|ms| BoundedExecutor::new(calculator.clone(), Duration::from_millis(ms)));

        let mut results = Vec::with_capacity(suite.test_cases.len());
        for (index, case) in suite.test_cases.iter().enumerate() {
            if options.is_cancelled() {
                let skipped = suite.test_cases.len() - index;
                warn!(calculator_id = %suite.calculator_id, skipped, "test run cancelled");
                return Ok((results, skipped));
            }
            results.push(self.run_case(calculator, case, executor.as_mut())?);
        }
        Ok((results, 0))
    }

    fn run_case(
        &self,
        calculator: &Calculator,
        case: &TestCase,
        executor: Option<&mut BoundedExecutor>,
    ) -> QaResult<TestResult> {
        let config = self.config();
        let mut status = TestStatus::Pending.transition(TestStatus::Running)?;

        let (outputs, elapsed_ms) = match executor {
            Some(executor) => match executor.call(&case.inputs) {
                Ok(call) => {
                    let elapsed_ms = call.elapsed_ms();
                    (call.outputs, elapsed_ms)
                }
                Err(e) => (
                    Err(ComputeError::Failed(e.to_string())),
                    executor.timeout().as_secs_f64() * 1000.0,
                ),
            },
            None => {
                let start = Instant::now();
                let outputs = calculator.compute(&case.inputs);
                (outputs, start.elapsed().as_secs_f64() * 1000.0)
            }
        };

        let mut warnings = Vec::new();
        if elapsed_ms > config.slow_case_warning_ms {
            warnings.push(format!(
                "Calculation took longer than {} seconds",
                config.slow_case_warning_ms / 1000.0
            ));
        }

        let outputs = match outputs {
            Ok(outputs) => outputs,
            Err(e) => {
                warn!(calculator_id = %calculator.id, test_id = %case.id, error = %e, "compute failed");
                status = status.transition(TestStatus::Errored)?;
                return Ok(TestResult {
                    test_id: case.id.clone(),
                    status,
                    passed: false,
                    comparisons: Vec::new(),
                    actual_outputs: FieldMap::new(),
                    execution_time_ms: elapsed_ms,
                    error: Some(e.to_string()),
                    warnings,
                });
            }
        };

        let tolerance = case.effective_tolerance(config.default_tolerance);
        let comparisons: Vec<FieldComparison> = case
            .expected_outputs
            .iter()
            .map(|(field, expected)| compare_field(field, expected, outputs.get(field), tolerance))
            .collect();

        let outside = comparisons.iter().filter(|c| !c.within_tolerance).count();
        if outside > 0 {
            warnings.push(format!("{} outputs outside tolerance", outside));
        }

        let passed = outside == 0;
        status = status.transition(if passed { TestStatus::Passed } else { TestStatus::Failed })?;
        debug!(
            calculator_id = %calculator.id,
            test_id = %case.id,
            passed,
            elapsed_ms,
            "test case finished"
        );

        Ok(TestResult {
            test_id: case.id.clone(),
            status,
            passed,
            comparisons,
            actual_outputs: outputs,
            execution_time_ms: elapsed_ms,
            error: None,
            warnings,
        })
    }

    /// Reference checks for every result that has a benchmark, in run order.
    fn check_benchmarks(&self, suite: &TestSuite, calculator: &Calculator, results: &[TestResult]) -> Vec<BenchmarkResult> {
        let default_tolerance = self.config().default_tolerance;

        results
            .iter()
            .zip(&suite.test_cases)
            .filter_map(|(result, case)| {
                let actual = primary_value(calculator, result);

                if let Some(entry) = self.benchmarks().lookup(&calculator.id, &result.test_id) {
                    let (passed, variance) = entry.check(actual);
                    return Some(BenchmarkResult {
                        test_id: result.test_id.clone(),
                        source: entry.source.clone(),
                        passed,
                        variance,
                    });
                }

                let reference = case.benchmark_ref.as_ref()?;
                let expected = as_number(&reference.expected_value)?;
                let tolerance = case.effective_tolerance(default_tolerance) * expected.abs();
                let variance = actual.map(|a| (a - expected).abs());
                Some(BenchmarkResult {
                    test_id: result.test_id.clone(),
                    source: reference.source.clone(),
                    passed: variance.is_some_and(|v| v <= tolerance),
                    variance,
                })
            })
            .collect()
    }

    fn build_report(
        &self,
        suite: &TestSuite,
        calculator: &Calculator,
        results: Vec<TestResult>,
        skipped: usize,
    ) -> ValidationReport {
        let config = self.config();
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let rate = success_rate(passed, total);

        let benchmarks = self.check_benchmarks(suite, calculator, &results);
        let benchmark_rate = if benchmarks.is_empty() {
            100.0
        } else {
            success_rate(benchmarks.iter().filter(|b| b.passed).count(), benchmarks.len())
        };

        let average = if total == 0 {
            0.0
        } else {
            results.iter().map(|r| r.execution_time_ms).sum::<f64>() / total as f64
        };

        let recommendations = recommendations(
            &results,
            &benchmarks,
            rate,
            config.slow_case_recommendation_ms,
            config.certification.pass_success_rate,
        );

        ValidationReport {
            calculator_id: calculator.id.clone(),
            suite_name: suite.name.clone(),
            timestamp: Utc::now(),
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            skipped_tests: skipped,
            success_rate: rate,
            average_execution_time_ms: average,
            benchmark_success_rate: benchmark_rate,
            certification_status: CertificationStatus::from_rates(rate, benchmark_rate, &config.certification),
            results,
            benchmarks,
            recommendations,
        }
    }
}

/// Numeric primary output of an executed case: the calculator's first
/// declared output, else the first output it produced.
fn primary_value(calculator: &Calculator, result: &TestResult) -> Option<f64> {
    if result.error.is_some() {
        return None;
    }
    let value = match calculator.primary_output() {
        Some(field) => result.actual_outputs.get(field),
        None => result.actual_outputs.values().next(),
    };
    value.and_then(as_number)
}

fn recommendations(
    results: &[TestResult],
    benchmarks: &[BenchmarkResult],
    success_rate: f64,
    slow_ms: f64,
    target_rate: f64,
) -> Vec<String> {
    let mut out = Vec::new();

    let failing = results.iter().filter(|r| !r.passed).count();
    if failing > 0 {
        out.push(format!("Address {} failing test(s) to improve accuracy", failing));
    }

    let slow = results.iter().filter(|r| r.execution_time_ms > slow_ms).count();
    if slow > 0 {
        out.push(format!("Optimize performance for {} slow test(s)", slow));
    }

    let failed_benchmarks = benchmarks.iter().filter(|b| !b.passed).count();
    if failed_benchmarks > 0 {
        out.push(format!(
            "Review {} benchmark failure(s) against industry standards",
            failed_benchmarks
        ));
    }

    if success_rate < target_rate {
        out.push(format!(
            "Improve test success rate to meet industry standards ({}%+)",
            target_rate
        ));
    }

    if success_rate >= EXCELLENT_SUCCESS_RATE {
        out.push("Excellent test coverage - calculator meets professional standards".to_string());
    }

    out
}
