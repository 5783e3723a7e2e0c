//! # Calculator Contract
//!
//! The engine never sees formula bodies. A calculator is an id, its declared
//! input fields, its output fields, and a pure compute function from inputs
//! to outputs. Compute must not perform I/O or mutate shared state; the
//! harnesses call it repeatedly and from worker threads.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::calculator::{Calculator, FieldDescriptor};
//! use qa_core::values::{field_map, number_field};
//! use qa_core::errors::ComputeError;
//!
//! let calc = Calculator::new("sum", |inputs| {
//!     let a = number_field(inputs, "a").ok_or_else(|| ComputeError::MissingInput("a".into()))?;
//!     let b = number_field(inputs, "b").ok_or_else(|| ComputeError::MissingInput("b".into()))?;
//!     Ok(field_map([("sum", a + b)]))
//! })
//! .with_field(FieldDescriptor::new("a", "First addend"))
//! .with_field(FieldDescriptor::new("b", "Second addend"))
//! .with_outputs(["sum"]);
//!
//! let out = calc.compute(&field_map([("a", 1), ("b", 2)])).unwrap();
//! assert_eq!(number_field(&out, "sum"), Some(3.0));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ComputeError;
use crate::values::FieldMap;

/// Shared compute function: inputs to outputs.
pub type ComputeFn = Arc<dyn Fn(&FieldMap) -> Result<FieldMap, ComputeError> + Send + Sync>;

/// Kind of form control a field is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    #[default]
    Number,
    Currency,
    Percentage,
    Select,
    Text,
    Date,
}

/// Declared input field of a calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field id (key in the input map)
    pub id: String,
    /// Visible label
    pub label: String,
    /// Help text / tooltip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// Unit shown next to the input (e.g. "%", "$", "kg")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub kind: InputKind,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        FieldDescriptor {
            id: id.into(),
            label: label.into(),
            help_text: None,
            unit: None,
            kind: InputKind::Number,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help_text = Some(help.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A registered calculator: metadata plus its pure compute function.
#[derive(Clone)]
pub struct Calculator {
    pub id: String,
    pub fields: Vec<FieldDescriptor>,
    /// Output fields in display order. The first one is the primary output.
    pub outputs: Vec<String>,
    compute: ComputeFn,
}

impl Calculator {
    pub fn new<F>(id: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&FieldMap) -> Result<FieldMap, ComputeError> + Send + Sync + 'static,
    {
        Calculator {
            id: id.into(),
            fields: Vec::new(),
            outputs: Vec::new(),
            compute: Arc::new(compute),
        }
    }

    /// Add a declared input field (builder pattern)
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the output fields, primary output first
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Declared input field ids, as consumed by the domain rule generators.
    pub fn declared_fields(&self) -> BTreeSet<String> {
        self.fields.iter().map(|f| f.id.clone()).collect()
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Primary output field, if declared.
    pub fn primary_output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }

    /// Invoke compute. A panic inside the formula is converted into a
    /// [`ComputeError::Failed`].
    pub fn compute(&self, inputs: &FieldMap) -> Result<FieldMap, ComputeError> {
        let compute = &self.compute;
        match panic::catch_unwind(AssertUnwindSafe(|| compute(inputs))) {
            Ok(result) => result,
            Err(payload) => Err(ComputeError::Failed(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{field_map, number_field};

    fn divide() -> Calculator {
        Calculator::new("divide", |inputs| {
            let a = number_field(inputs, "a").ok_or_else(|| ComputeError::MissingInput("a".into()))?;
            let b = number_field(inputs, "b").ok_or_else(|| ComputeError::MissingInput("b".into()))?;
            if b == 0.0 {
                return Err(ComputeError::Failed("division by zero".into()));
            }
            Ok(field_map([("quotient", a / b)]))
        })
        .with_field(FieldDescriptor::new("a", "Dividend"))
        .with_field(FieldDescriptor::new("b", "Divisor"))
        .with_outputs(["quotient"])
    }

    #[test]
    fn test_declared_fields() {
        let calc = divide();
        let fields = calc.declared_fields();
        assert!(fields.contains("a") && fields.contains("b"));
        assert_eq!(calc.primary_output(), Some("quotient"));
        assert_eq!(calc.field("b").unwrap().label, "Divisor");
    }

    #[test]
    fn test_compute_error_passthrough() {
        let err = divide().compute(&field_map([("a", 1), ("b", 0)])).unwrap_err();
        assert_eq!(err, ComputeError::Failed("division by zero".into()));
    }

    #[test]
    fn test_panic_becomes_compute_error() {
        let calc = Calculator::new("boom", |_| panic!("formula bug"));
        let err = calc.compute(&FieldMap::new()).unwrap_err();
        assert_eq!(err, ComputeError::Failed("panicked: formula bug".into()));
    }

    #[test]
    fn test_field_descriptor_json() {
        let field = FieldDescriptor::new("interestRate", "Interest Rate")
            .with_unit("%")
            .with_kind(InputKind::Percentage);
        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"kind\":\"percentage\""));
        assert!(!json.contains("helpText"));
    }
}
