//! Law-style properties of validation, comparison and statistics.

use proptest::prelude::*;
use qa_core::benchmark::compare_field;
use qa_core::calculator::{Calculator, FieldDescriptor};
use qa_core::harness::stats::percentile;
use qa_core::rules::factory::{business_rule, range, required};
use qa_core::rules::Rule;
use qa_core::values::{as_number, field_map, FieldMap};
use qa_core::EngineContext;
use serde_json::json;

fn rate_rules() -> Vec<Rule> {
    vec![
        required("rate", "Rate is required"),
        range("rate", 0.0, 20.0, "Rate must be between 0% and 20%"),
        business_rule(
            "rate",
            |value, _| Ok(as_number(value).map_or(true, |r| r <= 15.0)),
            "Warning: rates above 15% are unusual",
        ),
        range("term", 1.0, 50.0, "Term must be between 1 and 50 years"),
    ]
}

fn context() -> EngineContext {
    let mut ctx = EngineContext::default();
    ctx.register_calculator(
        Calculator::new("savings-calculator", |_| Ok(FieldMap::new()))
            .with_field(FieldDescriptor::new("rate", "Rate"))
            .with_field(FieldDescriptor::new("term", "Term")),
    );
    ctx.register_rules("savings-calculator", rate_rules());
    ctx
}

proptest! {
    #[test]
    fn test_validate_field_agrees_with_validate(rate in -50.0f64..50.0, term in -10i64..80) {
        let ctx = context();
        let inputs = field_map([("rate", json!(rate)), ("term", json!(term))]);

        let verdict = ctx.validate("savings-calculator", &inputs);
        let feedback = ctx.validate_field("savings-calculator", "rate", &json!(rate), &inputs).unwrap();

        prop_assert_eq!(verdict.errors.get("rate"), feedback.error.as_ref());
        if feedback.error.is_none() {
            prop_assert_eq!(verdict.warnings.get("rate"), feedback.warning.as_ref());
        }
    }

    #[test]
    fn test_validation_is_deterministic(rate in -50.0f64..50.0, term in -10i64..80) {
        let ctx = context();
        let inputs = field_map([("rate", json!(rate)), ("term", json!(term))]);
        prop_assert_eq!(
            ctx.validate("savings-calculator", &inputs),
            ctx.validate("savings-calculator", &inputs)
        );
    }

    #[test]
    fn test_reregistration_is_idempotent(rate in -50.0f64..50.0) {
        let mut ctx = context();
        let inputs = field_map([("rate", json!(rate)), ("term", json!(30))]);
        let before = ctx.validate("savings-calculator", &inputs);

        ctx.register_rules("savings-calculator", rate_rules());
        prop_assert_eq!(ctx.validate("savings-calculator", &inputs), before);
    }

    #[test]
    fn test_zero_tolerance_means_exact(expected in -1e6f64..1e6, actual in -1e6f64..1e6) {
        let cmp = compare_field("x", &json!(expected), Some(&json!(actual)), 0.0);
        prop_assert_eq!(cmp.within_tolerance, expected == actual);

        let same = compare_field("x", &json!(expected), Some(&json!(expected)), 0.0);
        prop_assert!(same.within_tolerance);
    }

    #[test]
    fn test_percentile_stays_within_samples(
        mut samples in prop::collection::vec(0.0f64..1000.0, 1..50),
        p in 0.0f64..=100.0,
    ) {
        samples.sort_by(|a, b| a.total_cmp(b));
        let value = percentile(&samples, p);
        prop_assert!(value >= samples[0] && value <= samples[samples.len() - 1]);
    }
}

#[test]
fn test_percentile_law() {
    let samples = [10.0, 20.0, 30.0, 40.0, 50.0];
    assert_eq!(percentile(&samples, 50.0), 30.0);
    let p99 = percentile(&samples, 99.0);
    assert!(p99 > 40.0 && p99 < 50.0);
}

#[test]
fn test_valid_inputs_have_no_errors() {
    let verdict = context().validate("savings-calculator", &field_map([("rate", 10), ("term", 30)]));
    assert!(verdict.is_valid);
    assert!(verdict.errors.is_empty());
    assert!(verdict.warnings.is_empty());
}
