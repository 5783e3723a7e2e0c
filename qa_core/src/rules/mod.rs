//! # Validation Rules
//!
//! A [`Rule`] is a pure predicate over one field's value and the full input
//! set, with a message and an explicit [`Severity`]. Rules are built once at
//! registration time (see [`factory`]) and are immutable afterwards; cloning
//! shares the predicate.
//!
//! ## Modules
//!
//! - [`factory`] - Constructors for required, range, cross-field and business rules
//! - [`domain`] - Generators that derive rules from a calculator's declared fields

pub mod domain;
pub mod factory;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculator::panic_message;
use crate::values::FieldMap;

pub use domain::{
    generate_business_rules, generate_construction_rules, generate_financial_rules, generate_health_rules,
    generate_legal_rules, generate_rules, Domain,
};
pub use factory::{business_rule, cross_field, range, required};

/// Message reported when a predicate fails unexpectedly.
pub const RULE_FAILURE_MESSAGE: &str = "Validation error occurred";

/// Predicate signature. `Err` means the predicate could not be evaluated.
pub type Predicate = Arc<dyn Fn(&Value, &FieldMap) -> Result<bool, String> + Send + Sync>;

/// Rule classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Required,
    Range,
    CrossField,
    Business,
}

/// How a failing rule is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Severity implied by a message's wording: soft language ("warning",
    /// "consider", "may") marks an advisory rule.
    ///
    /// ```rust
    /// use qa_core::rules::Severity;
    ///
    /// assert_eq!(Severity::from_message("Consider a larger down payment"), Severity::Warning);
    /// assert_eq!(Severity::from_message("Loan amount is required"), Severity::Error);
    /// ```
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if ["warning", "consider", "may"].iter().any(|w| lower.contains(w)) {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Passed,
    /// The predicate returned false
    Failed { severity: Severity, message: String },
    /// The predicate errored or panicked; always reported as an error
    Faulted { reason: String },
}

impl RuleOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, RuleOutcome::Passed)
    }

    /// Severity and message to report, if the rule did not pass.
    pub fn report(&self) -> Option<(Severity, &str)> {
        match self {
            RuleOutcome::Passed => None,
            RuleOutcome::Failed { severity, message } => Some((*severity, message.as_str())),
            RuleOutcome::Faulted { .. } => Some((Severity::Error, RULE_FAILURE_MESSAGE)),
        }
    }
}

/// Serializable description of a rule, used for snapshots and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub target_field: String,
    pub kind: RuleKind,
    pub severity: Severity,
    pub message: String,
}

/// A single validation rule.
#[derive(Clone)]
pub struct Rule {
    target_field: String,
    kind: RuleKind,
    severity: Severity,
    message: String,
    predicate: Predicate,
}

impl Rule {
    /// Build a rule. Severity is inferred from the message; override with
    /// [`Rule::with_severity`].
    pub fn new<F>(target_field: impl Into<String>, kind: RuleKind, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &FieldMap) -> Result<bool, String> + Send + Sync + 'static,
    {
        let message = message.into();
        Rule {
            target_field: target_field.into(),
            kind,
            severity: Severity::from_message(&message),
            message,
            predicate: Arc::new(predicate),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            target_field: self.target_field.clone(),
            kind: self.kind,
            severity: self.severity,
            message: self.message.clone(),
        }
    }

    /// Evaluate against the target field's value in `inputs`.
    pub fn evaluate(&self, inputs: &FieldMap) -> RuleOutcome {
        let value = inputs.get(&self.target_field).unwrap_or(&Value::Null);
        self.evaluate_value(value, inputs)
    }

    /// Evaluate with an explicit value for the target field.
    pub fn evaluate_value(&self, value: &Value, inputs: &FieldMap) -> RuleOutcome {
        let predicate = &self.predicate;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| predicate(value, inputs)));
        match outcome {
            Ok(Ok(true)) => RuleOutcome::Passed,
            Ok(Ok(false)) => RuleOutcome::Failed {
                severity: self.severity,
                message: self.message.clone(),
            },
            Ok(Err(reason)) => RuleOutcome::Faulted { reason },
            Err(payload) => RuleOutcome::Faulted {
                reason: panic_message(payload.as_ref()),
            },
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("target_field", &self.target_field)
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
