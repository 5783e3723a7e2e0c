//! Expected vs. actual comparison for a single output field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::as_number;

/// Outcome of comparing one expected output with the computed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldComparison {
    pub field: String,
    pub expected: Value,
    pub actual: Value,
    /// `|e - a| / |e| * 100`. `None` when undefined (expected 0, actual not).
    pub variance_percent: Option<f64>,
    pub within_tolerance: bool,
}

/// Compare `expected` with `actual` under a fractional tolerance.
///
/// Numeric pairs use percentage variance against `tolerance * 100`. Any
/// other pair must be exactly equal; a missing actual value is `null`.
///
/// ```rust
/// use qa_core::benchmark::compare_field;
/// use serde_json::json;
///
/// let cmp = compare_field("payment", &json!(100.0), Some(&json!(101.0)), 0.01);
/// assert!(cmp.within_tolerance);
/// assert_eq!(cmp.variance_percent, Some(1.0));
///
/// let zero = compare_field("balance", &json!(0), Some(&json!(0.1)), 0.01);
/// assert!(!zero.within_tolerance);
/// assert_eq!(zero.variance_percent, None);
/// ```
pub fn compare_field(field: &str, expected: &Value, actual: Option<&Value>, tolerance: f64) -> FieldComparison {
    let actual = actual.cloned().unwrap_or(Value::Null);

    let (variance_percent, within_tolerance) = match (as_number(expected), as_number(&actual)) {
        (Some(e), Some(a)) => {
            let variance = percent_variance(e, a);
            let within = variance.is_some_and(|v| v <= tolerance * 100.0);
            (variance, within)
        }
        _ => {
            let equal = expected == &actual;
            (equal.then_some(0.0), equal)
        }
    };

    FieldComparison {
        field: field.to_string(),
        expected: expected.clone(),
        actual,
        variance_percent,
        within_tolerance,
    }
}

fn percent_variance(expected: f64, actual: f64) -> Option<f64> {
    if expected == 0.0 {
        return (actual == 0.0).then_some(0.0);
    }
    Some((expected - actual).abs() / expected.abs() * 100.0)
}
