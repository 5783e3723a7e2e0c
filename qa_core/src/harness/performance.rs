//! Performance harness.
//!
//! Measures a calculator on its own test suite through a
//! [`BoundedExecutor`]: a warm-up, then a fixed catalog of latency and
//! throughput checks. Every compute call is bounded by the configured
//! timeout, and the cancellation token is checked between iterations.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::executor::{BoundedExecutor, CancellationToken, ExecError};
use super::stats::LatencyStats;
use crate::benchmark::RunOptions;
use crate::config::PerformanceBudget;
use crate::context::EngineContext;
use crate::errors::{QaError, QaResult};
use crate::report::{success_rate, CertificationStatus, Rating};
use crate::values::FieldMap;

pub const SINGLE_CALCULATION_LATENCY: &str = "single-calculation-latency";
pub const SUSTAINED_THROUGHPUT: &str = "sustained-throughput";
pub const SUITE_LATENCY: &str = "suite-latency";
pub const LATENCY_CONSISTENCY: &str = "latency-consistency";

/// One entry of the performance catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTest {
    pub id: String,
    pub name: String,
    pub passed: bool,
    /// Value compared against the threshold
    pub measured: f64,
    pub threshold: f64,
    pub stats: LatencyStats,
    pub warnings: Vec<String>,
}

/// Aggregate performance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub calculator_id: String,
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub success_rate: f64,
    pub warning_count: usize,
    pub rating: Rating,
    pub certification_status: CertificationStatus,
    pub tests: Vec<PerformanceTest>,
    pub recommendations: Vec<String>,
}

#[derive(Default)]
struct Sampling {
    samples: Vec<f64>,
    errors: usize,
    timeouts: usize,
    wall_secs: f64,
}

impl Sampling {
    fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.errors > 0 {
            out.push(format!("{} calculation(s) failed", self.errors));
        }
        if self.timeouts > 0 {
            out.push(format!("{} calculation(s) timed out", self.timeouts));
        }
        out
    }

    fn is_clean(&self) -> bool {
        self.errors == 0 && self.timeouts == 0 && !self.samples.is_empty()
    }
}

struct Sampler<'a> {
    executor: BoundedExecutor,
    cancel: Option<&'a CancellationToken>,
    calculator_id: &'a str,
}

impl Sampler<'_> {
    fn check_cancelled(&self, stage: &str) -> QaResult<()> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            warn!(calculator_id = self.calculator_id, stage, "performance run cancelled");
            return Err(QaError::Cancelled {
                context: format!("performance tests for {} during {}", self.calculator_id, stage),
            });
        }
        Ok(())
    }

    /// Returns false when the call timed out and the worker was abandoned.
    fn measure(&mut self, inputs: &FieldMap, into: &mut Sampling) -> bool {
        match self.executor.call(inputs) {
            Ok(call) if call.outputs.is_ok() => into.samples.push(call.elapsed_ms()),
            Ok(_) => into.errors += 1,
            Err(ExecError::TimedOut(_)) => {
                into.timeouts += 1;
                return false;
            }
            Err(_) => into.errors += 1,
        }
        true
    }

    /// Measure `total` calls. The first timeout ends the stage and the
    /// calls not yet made count as timeouts, so a hung compute costs one
    /// abandoned worker per stage.
    fn sample<'i>(
        &mut self,
        inputs: impl Iterator<Item = &'i FieldMap>,
        total: usize,
        stage: &str,
    ) -> QaResult<Sampling> {
        let mut sampling = Sampling::default();
        let start = Instant::now();
        for (done, inputs) in inputs.take(total).enumerate() {
            self.check_cancelled(stage)?;
            if !self.measure(inputs, &mut sampling) {
                let remaining = total - done - 1;
                sampling.timeouts += remaining;
                warn!(calculator_id = self.calculator_id, stage, remaining, "stage stalled; skipping remaining calls");
                break;
            }
        }
        sampling.wall_secs = start.elapsed().as_secs_f64();
        Ok(sampling)
    }

    fn repeat(&mut self, inputs: &FieldMap, iterations: usize, stage: &str) -> QaResult<Sampling> {
        self.sample(std::iter::repeat(inputs), iterations, stage)
    }

    fn rounds(&mut self, cases: &[&FieldMap], rounds: usize, stage: &str) -> QaResult<Sampling> {
        self.sample(cases.iter().copied().cycle(), rounds * cases.len(), stage)
    }
}

impl EngineContext {
    pub fn run_performance_tests(&self, calculator_id: &str) -> QaResult<PerformanceReport> {
        self.run_performance_tests_with(calculator_id, &RunOptions::default())
    }

    /// Run the performance catalog for `calculator_id`.
    ///
    /// # Errors
    ///
    /// `SuiteNotFound` / `CalculatorNotRegistered` for wiring problems,
    /// `InvalidTestCase` for a suite without cases, `Cancelled` when the
    /// token fires.
    pub fn run_performance_tests_with(&self, calculator_id: &str, options: &RunOptions) -> QaResult<PerformanceReport> {
        let suite = self
            .test_suite(calculator_id)
            .ok_or_else(|| QaError::suite_not_found(calculator_id))?;
        let calculator = self
            .calculator(calculator_id)
            .ok_or_else(|| QaError::calculator_not_registered(calculator_id))?;
        let first = suite.test_cases.first().ok_or_else(|| {
            QaError::invalid_test_case(calculator_id, "", "suite has no test cases to measure")
        })?;

        let budget = &self.config().performance;
        let mut sampler = Sampler {
            executor: BoundedExecutor::new(calculator.clone(), budget.call_timeout()),
            cancel: options.cancel.as_ref(),
            calculator_id,
        };

        sampler.repeat(&first.inputs, budget.warmup_iterations, "warm-up")?;
        debug!(calculator_id, iterations = budget.warmup_iterations, "warm-up complete");

        let single = sampler.repeat(&first.inputs, budget.iterations, SINGLE_CALCULATION_LATENCY)?;
        let cases: Vec<&FieldMap> = suite.test_cases.iter().map(|c| &c.inputs).collect();
        let suite_run = sampler.rounds(&cases, budget.suite_rounds, SUITE_LATENCY)?;

        let tests = catalog(&single, &suite_run, budget);
        let report = self.performance_report(calculator_id, tests);
        info!(
            calculator_id,
            rating = %report.rating,
            success_rate = report.success_rate,
            workers = sampler.executor.workers_spawned(),
            "performance tests finished"
        );
        Ok(report)
    }

    fn performance_report(&self, calculator_id: &str, tests: Vec<PerformanceTest>) -> PerformanceReport {
        let total = tests.len();
        let passed = tests.iter().filter(|t| t.passed).count();
        let warning_count = tests.iter().map(|t| t.warnings.len()).sum();
        let rate = success_rate(passed, total);
        let rating = Rating::from_pass_rate(rate, warning_count, &self.config().rating);

        PerformanceReport {
            calculator_id: calculator_id.to_string(),
            timestamp: Utc::now(),
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            success_rate: rate,
            warning_count,
            rating,
            certification_status: rating.certification(),
            recommendations: performance_recommendations(&tests, rating),
            tests,
        }
    }
}

fn catalog(single: &Sampling, suite_run: &Sampling, budget: &PerformanceBudget) -> Vec<PerformanceTest> {
    let single_stats = LatencyStats::from_samples(&single.samples);
    let suite_stats = LatencyStats::from_samples(&suite_run.samples);

    let throughput = if single.wall_secs > 0.0 {
        single.samples.len() as f64 / single.wall_secs
    } else {
        0.0
    };

    let cv = single_stats.coefficient_of_variation();
    let mut consistency_warnings = single.problems();
    if cv > budget.max_latency_cv {
        consistency_warnings.push(format!(
            "Latency varies widely (coefficient of variation {:.2} exceeds {:.2})",
            cv, budget.max_latency_cv
        ));
    }

    vec![
        PerformanceTest {
            id: SINGLE_CALCULATION_LATENCY.into(),
            name: "Single calculation latency".into(),
            passed: single.is_clean() && single_stats.p95 <= budget.single_p95_ms,
            measured: single_stats.p95,
            threshold: budget.single_p95_ms,
            stats: single_stats.clone(),
            warnings: single.problems(),
        },
        PerformanceTest {
            id: SUSTAINED_THROUGHPUT.into(),
            name: "Sustained throughput".into(),
            passed: single.is_clean() && throughput >= budget.min_throughput_per_sec,
            measured: throughput,
            threshold: budget.min_throughput_per_sec,
            stats: single_stats.clone(),
            warnings: single.problems(),
        },
        PerformanceTest {
            id: SUITE_LATENCY.into(),
            name: "Suite latency".into(),
            passed: suite_run.is_clean() && suite_stats.p99 <= budget.suite_p99_ms,
            measured: suite_stats.p99,
            threshold: budget.suite_p99_ms,
            stats: suite_stats,
            warnings: suite_run.problems(),
        },
        PerformanceTest {
            id: LATENCY_CONSISTENCY.into(),
            name: "Latency consistency".into(),
            passed: single.is_clean(),
            measured: cv,
            threshold: budget.max_latency_cv,
            stats: single_stats,
            warnings: consistency_warnings,
        },
    ]
}

fn performance_recommendations(tests: &[PerformanceTest], rating: Rating) -> Vec<String> {
    let mut out = Vec::new();

    for test in tests.iter().filter(|t| !t.passed) {
        let advice = match test.id.as_str() {
            SINGLE_CALCULATION_LATENCY => format!(
                "Reduce single calculation latency: p95 {:.2}ms exceeds {}ms",
                test.measured, test.threshold
            ),
            SUSTAINED_THROUGHPUT => format!(
                "Increase throughput: {:.0} calculations/s is below {}",
                test.measured, test.threshold
            ),
            SUITE_LATENCY => format!(
                "Reduce worst-case latency across test cases: p99 {:.2}ms exceeds {}ms",
                test.measured, test.threshold
            ),
            _ => format!("Fix failing calculations measured by {}", test.name.to_lowercase()),
        };
        out.push(advice);
    }

    if tests.iter().any(|t| t.id == LATENCY_CONSISTENCY && t.measured > t.threshold) {
        out.push("Investigate sources of latency variance such as allocation or caching".to_string());
    }

    match rating {
        Rating::Excellent => out.push("Performance meets professional standards".to_string()),
        Rating::Poor => out.push("Profile the calculation path; performance is below the release bar".to_string()),
        Rating::Good | Rating::Acceptable => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{TestCase, TestSuite};
    use crate::calculator::Calculator;
    use crate::config::EngineConfig;
    use crate::errors::ComputeError;
    use crate::values::{field_map, number_field};
    use std::time::Duration;

    fn context(calculator: Calculator, budget: PerformanceBudget) -> EngineContext {
        let id = calculator.id.clone();
        let config = EngineConfig {
            performance: budget,
            ..EngineConfig::default()
        };
        let mut ctx = EngineContext::new(config);
        ctx.register_calculator(calculator);
        ctx.register_test_suite(TestSuite::new(&id, "Perf").with_cases([
            TestCase::new("a", "a").with_inputs(field_map([("x", 1)])),
            TestCase::new("b", "b").with_inputs(field_map([("x", 2)])),
        ]))
        .unwrap();
        ctx
    }

    fn fast() -> Calculator {
        Calculator::new("fast", |inputs| {
            let x = number_field(inputs, "x").ok_or_else(|| ComputeError::MissingInput("x".into()))?;
            Ok(field_map([("y", x * x)]))
        })
    }

    fn small_budget() -> PerformanceBudget {
        PerformanceBudget {
            iterations: 50,
            warmup_iterations: 2,
            suite_rounds: 3,
            ..PerformanceBudget::default()
        }
    }

    #[test]
    fn test_fast_calculator_is_certified() {
        let report = context(fast(), small_budget()).run_performance_tests("fast").unwrap();
        assert_eq!(report.total_tests, 4);
        let ids: Vec<_> = report.tests.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![SINGLE_CALCULATION_LATENCY, SUSTAINED_THROUGHPUT, SUITE_LATENCY, LATENCY_CONSISTENCY]
        );
        assert!(report.tests[0].passed);
        assert_eq!(report.tests[0].stats.count, 50);
        assert_eq!(report.tests[2].stats.count, 6);
        assert_eq!(report.certification_status, CertificationStatus::Passed);
    }

    #[test]
    fn test_timeouts_fail_tests() {
        let slow = Calculator::new("slow", |_| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(FieldMap::new())
        });
        let budget = PerformanceBudget {
            iterations: 2,
            warmup_iterations: 0,
            suite_rounds: 1,
            call_timeout_ms: 5,
            ..PerformanceBudget::default()
        };
        let report = context(slow, budget).run_performance_tests("slow").unwrap();
        assert_eq!(report.passed_tests, 0);
        assert_eq!(report.tests[0].warnings, vec!["2 calculation(s) timed out".to_string()]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["successRate"].as_f64(), Some(0.0));
        assert!(json.get("passRate").is_none());
        assert_eq!(report.rating, Rating::Poor);
        assert_eq!(report.certification_status, CertificationStatus::Failed);
    }

    #[test]
    fn test_hung_compute_abandons_one_worker_per_stage() {
        let hung = Calculator::new("hung", |_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(FieldMap::new())
        });
        let mut sampler = Sampler {
            executor: BoundedExecutor::new(hung, Duration::from_millis(5)),
            cancel: None,
            calculator_id: "hung",
        };
        let inputs = field_map([("x", 1)]);

        let single = sampler.repeat(&inputs, 30, SINGLE_CALCULATION_LATENCY).unwrap();
        assert_eq!(single.timeouts, 30);
        assert!(single.samples.is_empty());
        assert_eq!(sampler.executor.workers_spawned(), 1);

        let suite_run = sampler.rounds(&[&inputs, &inputs], 3, SUITE_LATENCY).unwrap();
        assert_eq!(suite_run.timeouts, 6);
        assert_eq!(sampler.executor.workers_spawned(), 2);
    }

    #[test]
    fn test_cancelled_run() {
        let token = CancellationToken::new();
        token.cancel();
        let err = context(fast(), small_budget())
            .run_performance_tests_with("fast", &RunOptions::with_cancel(token))
            .unwrap_err();
        assert_eq!(err.error_code(), "CANCELLED");
    }

    #[test]
    fn test_requires_suite() {
        let mut ctx = EngineContext::default();
        ctx.register_calculator(fast());
        assert_eq!(ctx.run_performance_tests("fast").unwrap_err().error_code(), "SUITE_NOT_FOUND");
    }

    #[test]
    fn test_consistency_warning_is_not_failure() {
        let single = Sampling {
            samples: vec![1.0, 1.0, 1.0, 1.0, 20.0],
            wall_secs: 0.024,
            ..Sampling::default()
        };
        let suite_run = Sampling {
            samples: vec![1.0, 1.0],
            wall_secs: 0.002,
            ..Sampling::default()
        };
        let tests = catalog(&single, &suite_run, &PerformanceBudget::default());
        let consistency = &tests[3];
        assert!(consistency.passed);
        assert_eq!(consistency.warnings.len(), 1);
        assert!(consistency.measured > 1.0);
    }
}
