//! # Validation Engine
//!
//! Runs a calculator's registered rules against a candidate input set and
//! produces a [`ValidationVerdict`] for the UI. Validation never fails the
//! caller's flow: a rule whose predicate errors becomes a field error.
//!
//! Classification uses the severity stored on each rule. When a field has
//! both an error and a warning, only the error is reported. Suggestions are
//! generated only for input sets without errors.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::context::EngineContext;
//! use qa_core::rules::factory::{range, required};
//! use qa_core::values::field_map;
//!
//! let mut ctx = EngineContext::default();
//! ctx.register_rules("savings-calculator", vec![
//!     required("rate", "Rate is required"),
//!     range("rate", 0.0, 20.0, "Rate must be between 0% and 20%"),
//! ]);
//!
//! let verdict = ctx.validate("savings-calculator", &field_map([("rate", 25)]));
//! assert!(!verdict.is_valid);
//! assert_eq!(verdict.errors["rate"], "Rate must be between 0% and 20%");
//! ```

pub mod suggestions;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::errors::{QaError, QaResult};
use crate::rules::{Rule, RuleOutcome, Severity};
use crate::values::FieldMap;

pub use suggestions::{ContextualHelp, ContextualSuggestions, NoSuggestions, SuggestionSource};

/// Aggregate result of validating one input set. Read-only snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
    pub warnings: BTreeMap<String, String>,
    pub suggestions: BTreeMap<String, String>,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        ValidationVerdict {
            is_valid: true,
            ..Default::default()
        }
    }
}

/// Live feedback for a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl FieldFeedback {
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.warning.is_none()
    }
}

/// Errors and warnings keyed by field, with error precedence.
#[derive(Default)]
struct Classified {
    errors: BTreeMap<String, String>,
    warnings: BTreeMap<String, String>,
}

impl Classified {
    /// First message per field wins; an error evicts a warning.
    fn record(&mut self, field: &str, severity: Severity, message: &str) {
        match severity {
            Severity::Error => {
                self.warnings.remove(field);
                self.errors.entry(field.to_string()).or_insert_with(|| message.to_string());
            }
            Severity::Warning => {
                if !self.errors.contains_key(field) {
                    self.warnings.entry(field.to_string()).or_insert_with(|| message.to_string());
                }
            }
        }
    }
}

fn classify<'a, I>(calculator_id: &str, rules: I, inputs: &FieldMap, value_override: Option<&Value>) -> Classified
where
    I: IntoIterator<Item = &'a Rule>,
{
    let mut classified = Classified::default();
    for rule in rules {
        let outcome = match value_override {
            Some(value) => rule.evaluate_value(value, inputs),
            None => rule.evaluate(inputs),
        };
        if let RuleOutcome::Faulted { reason } = &outcome {
            warn!(calculator_id, field = rule.target_field(), %reason, "rule predicate failed");
        }
        if let Some((severity, message)) = outcome.report() {
            classified.record(rule.target_field(), severity, message);
        }
    }
    classified
}

impl EngineContext {
    /// Run every registered rule against `inputs`.
    ///
    /// An unregistered calculator has no rules, so its verdict is valid; the
    /// miss is logged.
    pub fn validate(&self, calculator_id: &str, inputs: &FieldMap) -> ValidationVerdict {
        let Some(rules) = self.rules_for(calculator_id) else {
            warn!(calculator_id, "validate called for calculator without registered rules");
            return ValidationVerdict::valid();
        };

        let classified = classify(calculator_id, rules, inputs, None);
        let suggestions = if classified.errors.is_empty() {
            self.suggestion_source().suggest(self, calculator_id, inputs)
        } else {
            BTreeMap::new()
        };

        debug!(
            calculator_id,
            rules = rules.len(),
            errors = classified.errors.len(),
            warnings = classified.warnings.len(),
            "validated inputs"
        );

        ValidationVerdict {
            is_valid: classified.errors.is_empty(),
            errors: classified.errors,
            warnings: classified.warnings,
            suggestions,
        }
    }

    /// Validate one field for live feedback. `value` stands in for
    /// `all_inputs[field]`.
    pub fn validate_field(
        &self,
        calculator_id: &str,
        field: &str,
        value: &Value,
        all_inputs: &FieldMap,
    ) -> QaResult<FieldFeedback> {
        let rules = self
            .rules_for(calculator_id)
            .ok_or_else(|| QaError::calculator_not_registered(calculator_id))?;

        let targeted = rules.iter().filter(|r| r.target_field() == field);
        let mut classified = classify(calculator_id, targeted, all_inputs, Some(value));

        let error = classified.errors.remove(field);
        let warning = classified.warnings.remove(field);
        let suggestion = if error.is_none() {
            let mut inputs = all_inputs.clone();
            inputs.insert(field.to_string(), value.clone());
            self.suggestion_source()
                .suggest(self, calculator_id, &inputs)
                .remove(field)
        } else {
            None
        };

        Ok(FieldFeedback {
            error,
            warning,
            suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::factory::{business_rule, range, required};
    use crate::values::field_map;
    use serde_json::json;

    fn context() -> EngineContext {
        let mut ctx = EngineContext::default();
        ctx.register_rules(
            "rate-calculator",
            vec![
                required("rate", "Rate is required"),
                range("rate", 0.0, 20.0, "Rate must be between 0% and 20%"),
                business_rule(
                    "rate",
                    |v, _| Ok(crate::values::as_number(v).map_or(true, |r| r <= 12.0)),
                    "Consider whether a rate above 12% is realistic",
                ),
                required("term", "Term is required"),
            ],
        );
        ctx
    }

    #[test]
    fn test_valid_inputs() {
        let verdict = context().validate("rate-calculator", &field_map([("rate", 5), ("term", 30)]));
        assert!(verdict.is_valid);
        assert!(verdict.errors.is_empty());
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn test_errors_take_precedence_over_warnings() {
        let verdict = context().validate("rate-calculator", &field_map([("rate", 25), ("term", 30)]));
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors["rate"], "Rate must be between 0% and 20%");
        assert!(!verdict.warnings.contains_key("rate"));
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_warning_only_is_valid() {
        let verdict = context().validate("rate-calculator", &field_map([("rate", 15), ("term", 30)]));
        assert!(verdict.is_valid);
        assert_eq!(verdict.warnings["rate"], "Consider whether a rate above 12% is realistic");
    }

    #[test]
    fn test_first_error_message_wins() {
        let verdict = context().validate("rate-calculator", &FieldMap::new());
        assert_eq!(verdict.errors["rate"], "Rate is required");
        assert_eq!(verdict.errors["term"], "Term is required");
    }

    #[test]
    fn test_unregistered_calculator_is_valid() {
        let verdict = context().validate("unknown", &FieldMap::new());
        assert_eq!(verdict, ValidationVerdict::valid());
    }

    #[test]
    fn test_faulting_rule_becomes_field_error() {
        let mut ctx = EngineContext::default();
        ctx.register_rules(
            "ratio",
            vec![business_rule("ratio", |_, _| Err("boom".into()), "Ratio may be off")],
        );
        let verdict = ctx.validate("ratio", &FieldMap::new());
        assert_eq!(verdict.errors["ratio"], crate::rules::RULE_FAILURE_MESSAGE);
    }

    #[test]
    fn test_validate_field_uses_supplied_value() {
        let ctx = context();
        let inputs = field_map([("rate", 5), ("term", 30)]);

        let feedback = ctx.validate_field("rate-calculator", "rate", &json!(25), &inputs).unwrap();
        assert_eq!(feedback.error.as_deref(), Some("Rate must be between 0% and 20%"));
        assert!(feedback.warning.is_none());
        assert!(feedback.suggestion.is_none());

        let feedback = ctx.validate_field("rate-calculator", "rate", &json!(15), &inputs).unwrap();
        assert!(feedback.error.is_none());
        assert!(feedback.warning.is_some());
    }

    #[test]
    fn test_validate_field_ignores_other_fields() {
        let feedback = context()
            .validate_field("rate-calculator", "rate", &json!(5), &FieldMap::new())
            .unwrap();
        assert!(feedback.is_clean());
    }

    #[test]
    fn test_validate_field_unregistered() {
        let err = context()
            .validate_field("nope", "rate", &json!(1), &FieldMap::new())
            .unwrap_err();
        assert_eq!(err, QaError::calculator_not_registered("nope"));
    }

    #[test]
    fn test_reregistration_is_idempotent() {
        let mut ctx = context();
        let inputs = field_map([("rate", 25)]);
        let before = ctx.validate("rate-calculator", &inputs);

        let rules = ctx.rules_for("rate-calculator").unwrap().to_vec();
        ctx.register_rules("rate-calculator", rules.clone());
        ctx.register_rules("rate-calculator", rules);

        assert_eq!(ctx.validate("rate-calculator", &inputs), before);
    }

    #[test]
    fn test_verdict_json_shape() {
        let verdict = context().validate("rate-calculator", &FieldMap::new());
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["isValid"], false);
        assert!(json["errors"]["term"].is_string());
    }
}
