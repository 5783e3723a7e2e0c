//! Sample calculators with their rules, help and test suites.
//!
//! These stand in for a real calculator catalog so every subcommand has
//! something to run against.

use qa_core::benchmark::{BenchmarkRef, Priority, TestCase, TestCategory, TestSuite};
use qa_core::calculator::{Calculator, FieldDescriptor, InputKind};
use qa_core::errors::{ComputeError, QaResult};
use qa_core::rules::factory::{range, required};
use qa_core::rules::Domain;
use qa_core::validation::ContextualHelp;
use qa_core::values::{field_map, number_field, FieldMap};
use qa_core::EngineContext;
use serde_json::json;

pub const MORTGAGE: &str = "mortgage-calculator";
pub const BMI: &str = "bmi-calculator";
pub const SUM: &str = "sum";

fn input(inputs: &FieldMap, field: &str) -> Result<f64, ComputeError> {
    number_field(inputs, field).ok_or_else(|| ComputeError::MissingInput(field.to_string()))
}

fn mortgage() -> Calculator {
    Calculator::new(MORTGAGE, |inputs| {
        let price = input(inputs, "homePrice")?;
        let down = input(inputs, "downPayment")?;
        let rate = input(inputs, "interestRate")?;
        let years = input(inputs, "loanTerm")?;
        if years <= 0.0 {
            return Err(ComputeError::invalid_input("loanTerm", "must be positive"));
        }

        let principal = price - down;
        let n = years * 12.0;
        let monthly_rate = rate / 100.0 / 12.0;
        let payment = if monthly_rate == 0.0 {
            principal / n
        } else {
            let growth = (1.0 + monthly_rate).powf(n);
            principal * monthly_rate * growth / (growth - 1.0)
        };

        Ok(field_map([
            ("monthlyPayment", json!(payment)),
            ("loanAmount", json!(principal)),
            ("totalInterest", json!(payment * n - principal)),
        ]))
    })
    .with_field(FieldDescriptor::new("homePrice", "Home price").with_unit("$").with_kind(InputKind::Currency))
    .with_field(
        FieldDescriptor::new("downPayment", "Down payment")
            .with_unit("$")
            .with_kind(InputKind::Currency)
            .with_help("Cash paid up front"),
    )
    .with_field(
        FieldDescriptor::new("interestRate", "Interest rate")
            .with_unit("%")
            .with_kind(InputKind::Percentage),
    )
    .with_field(FieldDescriptor::new("loanTerm", "Loan term").with_unit("years"))
    .with_outputs(["monthlyPayment", "loanAmount", "totalInterest"])
}

fn mortgage_suite() -> TestSuite {
    let case = |price: i64, down: i64, rate: f64, years: i64| {
        field_map([
            ("homePrice", json!(price)),
            ("downPayment", json!(down)),
            ("interestRate", json!(rate)),
            ("loanTerm", json!(years)),
        ])
    };

    TestSuite::new(MORTGAGE, "Mortgage payment")
        .with_description("Amortized monthly payment against published references")
        .with_cases([
            TestCase::new("conventional-30-year", "Conventional 30-year, 20% down")
                .with_inputs(case(400_000, 80_000, 7.0, 30))
                .with_expected(field_map([("monthlyPayment", 2128.97), ("loanAmount", 320_000.0)]))
                .with_priority(Priority::Critical),
            TestCase::new("fha-loan", "FHA 3.5% down")
                .with_inputs(case(300_000, 10_500, 6.75, 30))
                .with_expected(field_map([("monthlyPayment", 1877.69)]))
                .with_priority(Priority::High),
            TestCase::new("fifteen-year", "15-year fixed")
                .with_inputs(case(250_000, 50_000, 6.0, 15))
                .with_expected(field_map([("monthlyPayment", 1687.71)]))
                .with_benchmark_ref(BenchmarkRef::new("Amortization table", 1687.71).with_tool("spreadsheet PMT")),
            TestCase::new("zero-interest", "Zero interest")
                .with_inputs(case(120_000, 0, 0.0, 10))
                .with_expected(field_map([("monthlyPayment", 1000.0), ("totalInterest", 0.0)]))
                .with_tolerance(0.0)
                .with_category(TestCategory::EdgeCase),
        ])
}

fn bmi() -> Calculator {
    Calculator::new(BMI, |inputs| {
        let weight = input(inputs, "weight")?;
        let height_m = input(inputs, "height")? / 100.0;
        if height_m <= 0.0 {
            return Err(ComputeError::invalid_input("height", "must be positive"));
        }
        Ok(field_map([("bmi", weight / (height_m * height_m))]))
    })
    .with_field(FieldDescriptor::new("weight", "Weight").with_unit("kg"))
    .with_field(FieldDescriptor::new("height", "Height").with_unit("cm"))
    .with_field(FieldDescriptor::new("age", "Age").with_unit("years"))
    .with_outputs(["bmi"])
}

fn bmi_suite() -> TestSuite {
    TestSuite::new(BMI, "Body mass index").with_cases([
        TestCase::new("average-adult", "70 kg, 175 cm")
            .with_inputs(field_map([("weight", 70), ("height", 175), ("age", 35)]))
            .with_expected(field_map([("bmi", 22.86)])),
        TestCase::new("obese-range", "120 kg, 180 cm")
            .with_inputs(field_map([("weight", 120), ("height", 180), ("age", 50)]))
            .with_expected(field_map([("bmi", 37.04)])),
    ])
}

fn sum() -> Calculator {
    Calculator::new(SUM, |inputs| {
        Ok(field_map([("sum", input(inputs, "a")? + input(inputs, "b")?)]))
    })
    .with_field(FieldDescriptor::new("a", "First addend").with_help("Any number"))
    .with_field(FieldDescriptor::new("b", "Second addend").with_help("Any number"))
    .with_outputs(["sum"])
}

fn sum_suite() -> TestSuite {
    TestSuite::new(SUM, "Addition").with_cases([
        TestCase::new("one-plus-two", "1 + 2")
            .with_inputs(field_map([("a", 1), ("b", 2)]))
            .with_expected(field_map([("sum", 3)]))
            .with_category(TestCategory::Unit),
        TestCase::new("negatives", "-5 + -7")
            .with_inputs(field_map([("a", -5), ("b", -7)]))
            .with_expected(field_map([("sum", -12)]))
            .with_tolerance(0.0)
            .with_category(TestCategory::Unit),
    ])
}

/// Context with every sample calculator registered.
pub fn sample_context(mut ctx: EngineContext) -> QaResult<EngineContext> {
    ctx.register_calculator(mortgage());
    ctx.register_calculator_rules(
        MORTGAGE,
        vec![
            required("homePrice", "Home price is required"),
            required("downPayment", "Down payment is required"),
            required("interestRate", "Interest rate is required"),
            required("loanTerm", "Loan term is required"),
        ],
        &[Domain::Financial],
    )?;
    ctx.register_help(
        MORTGAGE,
        ContextualHelp::new("interestRate", "Interest rate", "Annual percentage rate quoted by the lender")
            .with_example("6.5")
            .with_tip("Compare APR rather than the headline rate"),
    );
    ctx.register_help(
        MORTGAGE,
        ContextualHelp::new("loanTerm", "Loan term", "Years until the loan is paid off")
            .with_example("30")
            .with_tip("Shorter terms cost more per month but far less in interest"),
    );
    ctx.register_test_suite(mortgage_suite())?;

    ctx.register_calculator(bmi());
    ctx.register_calculator_rules(
        BMI,
        vec![required("weight", "Weight is required"), required("height", "Height is required")],
        &[Domain::Health],
    )?;
    ctx.register_help(BMI, ContextualHelp::new("weight", "Weight", "Body weight in kilograms"));
    ctx.register_help(BMI, ContextualHelp::new("height", "Height", "Standing height in centimeters"));
    ctx.register_help(BMI, ContextualHelp::new("age", "Age", "Age in whole years"));
    ctx.register_test_suite(bmi_suite())?;

    ctx.register_calculator(sum());
    ctx.register_rules(
        SUM,
        vec![
            required("a", "First addend is required"),
            required("b", "Second addend is required"),
            range("a", -1e9, 1e9, "Addends must be between -1e9 and 1e9"),
        ],
    );
    ctx.register_test_suite(sum_suite())?;

    Ok(ctx)
}
