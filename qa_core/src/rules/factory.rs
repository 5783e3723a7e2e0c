//! # Rule Factory
//!
//! Constructors for the common rule shapes. All predicates are pure.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::rules::factory::{cross_field, range, required};
//! use qa_core::values::{as_number, field_map};
//!
//! let rules = vec![
//!     required("loanAmount", "Loan amount is required"),
//!     range("rate", 0.0, 20.0, "Rate must be between 0% and 20%"),
//!     cross_field("loanAmount", "homeValue", |loan, home| {
//!         matches!((as_number(loan), as_number(home)), (Some(l), Some(h)) if l <= h)
//!     }, "Loan amount cannot exceed home value"),
//! ];
//!
//! let inputs = field_map([("loanAmount", 250_000), ("rate", 25), ("homeValue", 300_000)]);
//! let failing: Vec<_> = rules.iter().filter(|r| !r.evaluate(&inputs).is_pass()).collect();
//! assert_eq!(failing.len(), 1);
//! assert_eq!(failing[0].target_field(), "rate");
//! ```

use serde_json::Value;

use super::{Rule, RuleKind};
use crate::values::{as_number, is_blank, FieldMap};

/// Fails when the value is absent, null or an empty string.
pub fn required(field: impl Into<String>, message: impl Into<String>) -> Rule {
    Rule::new(field, RuleKind::Required, message, |value, _| Ok(!is_blank(Some(value))))
}

/// Fails when the value is absent, non-numeric, or outside `[min, max]`.
pub fn range(field: impl Into<String>, min: f64, max: f64, message: impl Into<String>) -> Rule {
    Rule::new(field, RuleKind::Range, message, move |value, _| {
        Ok(matches!(as_number(value), Some(n) if n >= min && n <= max))
    })
}

/// Compares the field with another field. Passes while either side is
/// missing, so a half-filled form does not show false errors.
pub fn cross_field<P>(field: impl Into<String>, other_field: impl Into<String>, predicate: P, message: impl Into<String>) -> Rule
where
    P: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
{
    let other_field = other_field.into();
    Rule::new(field, RuleKind::CrossField, message, move |value, inputs: &FieldMap| {
        let other = inputs.get(&other_field);
        if is_blank(Some(value)) || is_blank(other) {
            return Ok(true);
        }
        Ok(other.is_some_and(|other| predicate(value, other)))
    })
}

/// General escape hatch. An `Err` from the predicate (or a panic) counts as
/// a failure with the synthetic "Validation error occurred" message.
pub fn business_rule<P>(field: impl Into<String>, predicate: P, message: impl Into<String>) -> Rule
where
    P: Fn(&Value, &FieldMap) -> Result<bool, String> + Send + Sync + 'static,
{
    Rule::new(field, RuleKind::Business, message, predicate)
}

/// `value <= other` when both are numeric. Non-numeric pairs fail.
pub fn at_most(value: &Value, other: &Value) -> bool {
    matches!((as_number(value), as_number(other)), (Some(a), Some(b)) if a <= b)
}

/// `value > other` when both are numeric. Non-numeric pairs fail.
pub fn greater_than(value: &Value, other: &Value) -> bool {
    matches!((as_number(value), as_number(other)), (Some(a), Some(b)) if a > b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleOutcome, Severity, RULE_FAILURE_MESSAGE};
    use crate::values::field_map;
    use serde_json::json;

    #[test]
    fn test_required() {
        let rule = required("name", "Name is required");
        assert!(!rule.evaluate(&FieldMap::new()).is_pass());
        assert!(!rule.evaluate(&field_map([("name", "")])).is_pass());
        assert!(!rule.evaluate(&field_map([("name", Value::Null)])).is_pass());
        assert!(rule.evaluate(&field_map([("name", 0)])).is_pass());
        assert_eq!(rule.kind(), RuleKind::Required);
        assert_eq!(rule.severity(), Severity::Error);
    }

    #[test]
    fn test_range_scenario() {
        let rule = range("rate", 0.0, 20.0, "Rate must be between 0% and 20%");
        match rule.evaluate(&field_map([("rate", 25)])) {
            RuleOutcome::Failed { severity, message } => {
                assert_eq!(severity, Severity::Error);
                assert!(message.ends_with("must be between 0% and 20%"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(rule.evaluate(&field_map([("rate", 10)])).is_pass());
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let rule = range("rate", 0.0, 20.0, "out of range");
        assert!(rule.evaluate(&field_map([("rate", 0)])).is_pass());
        assert!(rule.evaluate(&field_map([("rate", 20)])).is_pass());
        assert!(rule.evaluate(&field_map([("rate", "20")])).is_pass());
    }

    #[test]
    fn test_range_fails_closed() {
        let rule = range("rate", 0.0, 20.0, "out of range");
        assert!(!rule.evaluate(&FieldMap::new()).is_pass());
        assert!(!rule.evaluate(&field_map([("rate", "ten")])).is_pass());
        assert!(!rule.evaluate(&field_map([("rate", json!([5]))])).is_pass());
    }

    #[test]
    fn test_cross_field_skips_incomplete_forms() {
        let rule = cross_field("loanAmount", "homeValue", at_most, "Loan cannot exceed home value");
        assert!(rule.evaluate(&field_map([("loanAmount", 500)])).is_pass());
        assert!(rule.evaluate(&field_map([("homeValue", 500)])).is_pass());
        assert!(rule.evaluate(&field_map([("loanAmount", 400), ("homeValue", 500)])).is_pass());
        assert!(!rule.evaluate(&field_map([("loanAmount", 600), ("homeValue", 500)])).is_pass());
    }

    #[test]
    fn test_business_rule_error_is_failure() {
        let rule = business_rule(
            "ratio",
            |_, inputs| {
                let d = inputs.get("denominator").and_then(as_number).ok_or("no denominator")?;
                Ok(d != 0.0)
            },
            "Denominator may not be zero",
        );
        assert_eq!(rule.severity(), Severity::Warning);
        let outcome = rule.evaluate(&FieldMap::new());
        assert_eq!(outcome.report(), Some((Severity::Error, RULE_FAILURE_MESSAGE)));
        assert!(rule.evaluate(&field_map([("denominator", 2)])).is_pass());
    }

    #[test]
    fn test_comparators() {
        assert!(at_most(&json!(1), &json!("1")));
        assert!(!at_most(&json!("x"), &json!(1)));
        assert!(greater_than(&json!(2), &json!(1)));
        assert!(!greater_than(&json!(1), &json!(1)));
    }
}
