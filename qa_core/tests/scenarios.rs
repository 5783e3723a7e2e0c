//! End-to-end runs through the public API.

use qa_core::benchmark::{BenchmarkRef, TestCase, TestStatus, TestSuite};
use qa_core::calculator::{Calculator, FieldDescriptor};
use qa_core::report::export::{load_report_document, save_report};
use qa_core::report::markdown::render_markdown;
use qa_core::rules::factory::{range, required};
use qa_core::rules::Domain;
use qa_core::values::{field_map, number_field};
use qa_core::{CertificationStatus, ComputeError, EngineContext};
use serde_json::json;

fn sum_calculator() -> Calculator {
    Calculator::new("sum", |inputs| {
        let a = number_field(inputs, "a").ok_or_else(|| ComputeError::MissingInput("a".into()))?;
        let b = number_field(inputs, "b").ok_or_else(|| ComputeError::MissingInput("b".into()))?;
        Ok(field_map([("sum", a + b)]))
    })
    .with_field(FieldDescriptor::new("a", "First addend"))
    .with_field(FieldDescriptor::new("b", "Second addend"))
    .with_outputs(["sum"])
}

#[test]
fn test_rate_range_validation() {
    let mut ctx = EngineContext::default();
    ctx.register_rules(
        "savings-calculator",
        vec![
            required("rate", "Rate is required"),
            range("rate", 0.0, 20.0, "Rate must be between 0% and 20%"),
        ],
    );

    let verdict = ctx.validate("savings-calculator", &field_map([("rate", 25)]));
    assert!(!verdict.is_valid);
    assert_eq!(verdict.errors.get("rate").map(String::as_str), Some("Rate must be between 0% and 20%"));

    let verdict = ctx.validate("savings-calculator", &field_map([("rate", 10)]));
    assert!(verdict.is_valid);
    assert!(verdict.errors.is_empty());
}

#[test]
fn test_sum_suite_passes_with_zero_variance() {
    let mut ctx = EngineContext::default();
    ctx.register_calculator(sum_calculator());
    ctx.register_test_suite(
        TestSuite::new("sum", "Sum").with_case(
            TestCase::new("one-plus-two", "1 + 2")
                .with_inputs(field_map([("a", 1), ("b", 2)]))
                .with_expected(field_map([("sum", 3)]))
                .with_tolerance(0.01),
        ),
    )
    .unwrap();

    let report = ctx.run_tests("sum").unwrap();
    assert_eq!(report.total_tests, 1);
    assert_eq!(report.passed_tests, 1);
    assert_eq!(report.success_rate, 100.0);

    let result = &report.results[0];
    assert!(result.passed);
    assert_eq!(result.status, TestStatus::Passed);
    assert_eq!(result.comparisons[0].variance_percent, Some(0.0));
}

#[test]
fn test_one_failing_compute_in_five() {
    let mut ctx = EngineContext::default();
    ctx.register_calculator(
        Calculator::new("fragile", |inputs| {
            let x = number_field(inputs, "x").ok_or_else(|| ComputeError::MissingInput("x".into()))?;
            if x == 3.0 {
                return Err(ComputeError::Failed("division by zero".into()));
            }
            Ok(field_map([("y", x * 2.0)]))
        })
        .with_outputs(["y"]),
    );
    let cases = (1..=5).map(|x| {
        TestCase::new(format!("x-{}", x), format!("x = {}", x))
            .with_inputs(field_map([("x", x)]))
            .with_expected(field_map([("y", x * 2)]))
    });
    ctx.register_test_suite(TestSuite::new("fragile", "Fragile").with_cases(cases)).unwrap();

    let report = ctx.run_tests("fragile").unwrap();
    assert_eq!(report.total_tests, 5);
    assert_eq!(report.passed_tests, 4);
    assert_eq!(report.failed_tests, 1);
    assert_eq!(report.success_rate, 80.0);

    let failing = report.results.iter().find(|r| r.test_id == "x-3").unwrap();
    assert!(!failing.passed);
    assert_eq!(failing.status, TestStatus::Errored);
    assert_eq!(failing.error.as_deref(), Some("division by zero"));

    // 80% sits between the fail and pass bands
    assert_eq!(report.certification_status, CertificationStatus::Pending);
}

#[test]
fn test_mortgage_round_trip_through_export() {
    let mut ctx = EngineContext::default();
    ctx.register_calculator(
        Calculator::new("mortgage-calculator", |inputs| {
            let field = |name: &str| number_field(inputs, name).ok_or_else(|| ComputeError::MissingInput(name.into()));
            let principal = field("homePrice")? - field("downPayment")?;
            let r = field("interestRate")? / 1200.0;
            let n = field("loanTerm")? * 12.0;
            let growth = (1.0 + r).powf(n);
            Ok(field_map([("monthlyPayment", principal * r * growth / (growth - 1.0))]))
        })
        .with_field(FieldDescriptor::new("homePrice", "Home price"))
        .with_field(FieldDescriptor::new("downPayment", "Down payment"))
        .with_field(FieldDescriptor::new("interestRate", "Interest rate"))
        .with_field(FieldDescriptor::new("loanTerm", "Loan term"))
        .with_outputs(["monthlyPayment"]),
    );
    ctx.register_calculator_rules("mortgage-calculator", Vec::new(), &[Domain::Financial])
        .unwrap();
    ctx.register_test_suite(
        TestSuite::new("mortgage-calculator", "Mortgage").with_case(
            TestCase::new("conventional-30-year", "Conventional")
                .with_inputs(field_map([
                    ("homePrice", json!(400_000)),
                    ("downPayment", json!(80_000)),
                    ("interestRate", json!(7.0)),
                    ("loanTerm", json!(30)),
                ]))
                .with_expected(field_map([("monthlyPayment", 2128.97)]))
                .with_benchmark_ref(BenchmarkRef::new("Freddie Mac PMMS", 2129.21)),
        ),
    )
    .unwrap();

    let verdict = ctx.validate(
        "mortgage-calculator",
        &field_map([("homePrice", json!(100)), ("downPayment", json!(200))]),
    );
    assert_eq!(
        verdict.errors.get("downPayment").map(String::as_str),
        Some("Down payment cannot exceed home price")
    );

    let report = ctx.run_tests("mortgage-calculator").unwrap();
    assert_eq!(report.benchmarks.len(), 1);
    assert!(report.benchmarks[0].passed);
    assert_eq!(report.certification_status, CertificationStatus::Passed);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mortgage.json");
    save_report(&report, &path).unwrap();
    let document = load_report_document(&path).unwrap();
    assert_eq!(document.calculator_id, "mortgage-calculator");
    assert_eq!(document.summary.certification_status, CertificationStatus::Passed);

    let markdown = render_markdown(&report);
    assert!(markdown.contains("- **conventional-30-year** (Freddie Mac PMMS): PASS"));
}

#[test]
fn test_unknown_ids_propagate() {
    let ctx = EngineContext::default();
    assert_eq!(ctx.run_tests("nope").unwrap_err().error_code(), "SUITE_NOT_FOUND");
    assert_eq!(
        ctx.validate_field("nope", "x", &json!(1), &Default::default())
            .unwrap_err()
            .error_code(),
        "CALCULATOR_NOT_REGISTERED"
    );
    assert!(ctx.validate("nope", &Default::default()).is_valid);
}
