//! # Benchmark / Test Engine
//!
//! Labeled test cases are grouped into a [`TestSuite`] per calculator. A run
//! invokes the calculator's compute function for each case in order,
//! compares every expected output within a percentage tolerance, checks the
//! primary output against the industry benchmark table and aggregates the
//! results into a [`ValidationReport`](runner::ValidationReport).
//!
//! ## Modules
//!
//! - [`compare`] - Tolerance comparison of one expected/actual output pair
//! - [`industry`] - Built-in industry benchmark catalog
//! - [`runner`] - Suite execution, certification and recommendations
//!
//! ## Example
//!
//! ```rust
//! use qa_core::benchmark::{TestCase, TestSuite};
//! use qa_core::calculator::Calculator;
//! use qa_core::context::EngineContext;
//! use qa_core::errors::ComputeError;
//! use qa_core::values::{field_map, number_field};
//!
//! let mut ctx = EngineContext::default();
//! ctx.register_calculator(
//!     Calculator::new("sum", |inputs| {
//!         let a = number_field(inputs, "a").ok_or_else(|| ComputeError::MissingInput("a".into()))?;
//!         let b = number_field(inputs, "b").ok_or_else(|| ComputeError::MissingInput("b".into()))?;
//!         Ok(field_map([("sum", a + b)]))
//!     })
//!     .with_outputs(["sum"]),
//! );
//! ctx.register_test_suite(
//!     TestSuite::new("sum", "Sum").with_case(
//!         TestCase::new("one-plus-two", "1 + 2")
//!             .with_inputs(field_map([("a", 1), ("b", 2)]))
//!             .with_expected(field_map([("sum", 3)])),
//!     ),
//! )
//! .unwrap();
//!
//! let report = ctx.run_tests("sum").unwrap();
//! assert_eq!(report.success_rate, 100.0);
//! ```

pub mod compare;
pub mod industry;
pub mod runner;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{QaError, QaResult};
use crate::values::FieldMap;

pub use compare::{compare_field, FieldComparison};
pub use industry::{BenchmarkCategory, BenchmarkEntry, BenchmarkTable};
pub use runner::{BenchmarkResult, RunOptions, TestResult, ValidationReport};

/// Suite setup/teardown hook.
pub type Hook = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestCategory {
    Unit,
    Integration,
    Performance,
    #[default]
    Accuracy,
    EdgeCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// External reference value a test case was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRef {
    /// Publisher of the reference value (e.g. "Freddie Mac PMMS")
    pub source: String,
    /// Tool used to produce the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub expected_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BenchmarkRef {
    pub fn new(source: impl Into<String>, expected_value: impl Into<Value>) -> Self {
        BenchmarkRef {
            source: source.into(),
            tool: None,
            expected_value: expected_value.into(),
            notes: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One labeled test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub inputs: FieldMap,
    pub expected_outputs: FieldMap,
    /// Fractional tolerance (0.01 = 1%). `None` uses the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub category: TestCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_ref: Option<BenchmarkRef>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        TestCase {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            inputs: FieldMap::new(),
            expected_outputs: FieldMap::new(),
            tolerance: None,
            category: TestCategory::default(),
            priority: Priority::default(),
            benchmark_ref: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_inputs(mut self, inputs: FieldMap) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_expected(mut self, expected: FieldMap) -> Self {
        self.expected_outputs = expected;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_category(mut self, category: TestCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_benchmark_ref(mut self, benchmark_ref: BenchmarkRef) -> Self {
        self.benchmark_ref = Some(benchmark_ref);
        self
    }

    /// Tolerance to apply, falling back to `default`.
    pub fn effective_tolerance(&self, default: f64) -> f64 {
        self.tolerance.unwrap_or(default)
    }

    /// Check the case against the calculator's declared outputs (empty means
    /// undeclared, which accepts any key).
    pub fn check(&self, calculator_id: &str, declared_outputs: &[String]) -> QaResult<()> {
        if let Some(tolerance) = self.tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(QaError::invalid_test_case(
                    calculator_id,
                    &self.id,
                    format!("tolerance must be a finite, non-negative fraction (got {})", tolerance),
                ));
            }
        }
        if !declared_outputs.is_empty() {
            if let Some(unknown) = self.expected_outputs.keys().find(|k| !declared_outputs.contains(k)) {
                return Err(QaError::invalid_test_case(
                    calculator_id,
                    &self.id,
                    format!("expected output '{}' is not a declared output", unknown),
                ));
            }
        }
        Ok(())
    }
}

/// Ordered test cases for one calculator, with optional hooks.
#[derive(Clone)]
pub struct TestSuite {
    pub calculator_id: String,
    pub name: String,
    pub description: String,
    pub test_cases: Vec<TestCase>,
    setup: Option<Hook>,
    teardown: Option<Hook>,
}

impl TestSuite {
    pub fn new(calculator_id: impl Into<String>, name: impl Into<String>) -> Self {
        TestSuite {
            calculator_id: calculator_id.into(),
            name: name.into(),
            description: String::new(),
            test_cases: Vec::new(),
            setup: None,
            teardown: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_case(mut self, case: TestCase) -> Self {
        self.test_cases.push(case);
        self
    }

    pub fn with_cases(mut self, cases: impl IntoIterator<Item = TestCase>) -> Self {
        self.test_cases.extend(cases);
        self
    }

    pub fn with_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(hook));
        self
    }

    pub fn with_teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(hook));
        self
    }

    pub(crate) fn setup_hook(&self) -> Option<&Hook> {
        self.setup.as_ref()
    }

    pub(crate) fn teardown_hook(&self) -> Option<&Hook> {
        self.teardown.as_ref()
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("calculator_id", &self.calculator_id)
            .field("name", &self.name)
            .field("test_cases", &self.test_cases.len())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// Lifecycle of one test case within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
    Errored,
}

impl TestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Failed | TestStatus::Errored)
    }

    /// Move to `next`. Allowed: Pending -> Running -> {Passed, Failed, Errored}.
    pub fn transition(self, next: TestStatus) -> QaResult<TestStatus> {
        let allowed = matches!(
            (self, next),
            (TestStatus::Pending, TestStatus::Running)
                | (TestStatus::Running, TestStatus::Passed)
                | (TestStatus::Running, TestStatus::Failed)
                | (TestStatus::Running, TestStatus::Errored)
        );
        if allowed {
            Ok(next)
        } else {
            Err(QaError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Pending => "pending",
            TestStatus::Running => "running",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Errored => "errored",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::field_map;

    #[test]
    fn test_status_machine() {
        let running = TestStatus::Pending.transition(TestStatus::Running).unwrap();
        assert_eq!(running.transition(TestStatus::Passed).unwrap(), TestStatus::Passed);
        assert!(TestStatus::Passed.transition(TestStatus::Failed).is_err());
        assert!(TestStatus::Pending.transition(TestStatus::Passed).is_err());
        assert!(TestStatus::Errored.is_terminal());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = TestStatus::Failed.transition(TestStatus::Running).unwrap_err();
        assert_eq!(
            err,
            QaError::InvalidTransition {
                from: "failed".into(),
                to: "running".into()
            }
        );
    }

    #[test]
    fn test_case_check_tolerance() {
        let case = TestCase::new("t", "t").with_tolerance(-0.1);
        assert!(matches!(case.check("calc", &[]), Err(QaError::InvalidTestCase { .. })));
        let case = TestCase::new("t", "t").with_tolerance(f64::NAN);
        assert!(case.check("calc", &[]).is_err());
        assert!(TestCase::new("t", "t").with_tolerance(0.0).check("calc", &[]).is_ok());
    }

    #[test]
    fn test_case_check_declared_outputs() {
        let case = TestCase::new("t", "t").with_expected(field_map([("payment", 1)]));
        assert!(case.check("calc", &["payment".to_string()]).is_ok());
        assert!(case.check("calc", &["total".to_string()]).is_err());
        assert!(case.check("calc", &[]).is_ok());
    }

    #[test]
    fn test_case_json_uses_camel_case() {
        let case = TestCase::new("conventional-30-year", "30-year fixed")
            .with_expected(field_map([("monthlyPayment", 2129.21)]))
            .with_category(TestCategory::EdgeCase)
            .with_benchmark_ref(BenchmarkRef::new("Freddie Mac PMMS", 2129.21));
        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["expectedOutputs"]["monthlyPayment"], 2129.21);
        assert_eq!(json["category"], "edge-case");
        assert_eq!(json["benchmarkRef"]["expectedValue"], 2129.21);
        assert!(json.get("tolerance").is_none());
    }
}
