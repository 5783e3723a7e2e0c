//! # Error Types
//!
//! Structured error types for qa_core. Only configuration and wiring problems
//! surface as errors; problems local to one rule or one test case are
//! contained and reported per field or per test instead.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::errors::{QaError, QaResult};
//!
//! fn check_tolerance(tolerance: f64) -> QaResult<()> {
//!     if !(tolerance >= 0.0) {
//!         return Err(QaError::invalid_test_case(
//!             "mortgage-calculator",
//!             "conventional-30-year",
//!             "tolerance must be a non-negative number",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for qa_core operations
pub type QaResult<T> = Result<T, QaError>;

/// Structured error type for engine operations.
///
/// Each variant carries enough context to locate the misconfiguration
/// without reading logs.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum QaError {
    /// No calculator (compute function or rules) registered under this id
    #[error("Calculator not registered: {calculator_id}")]
    CalculatorNotRegistered { calculator_id: String },

    /// No test suite registered under this id
    #[error("No test suite found for calculator: {calculator_id}")]
    SuiteNotFound { calculator_id: String },

    /// A test case violates its invariants (tolerance, expected outputs)
    #[error("Invalid test case '{test_id}' for {calculator_id}: {reason}")]
    InvalidTestCase {
        calculator_id: String,
        test_id: String,
        reason: String,
    },

    /// A suite setup or teardown hook failed
    #[error("Suite hook '{hook}' failed for {calculator_id}: {reason}")]
    HookFailed {
        calculator_id: String,
        hook: String,
        reason: String,
    },

    /// A test status transition that the run state machine does not allow
    #[error("Invalid test status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// The run was cancelled before it could produce a result
    #[error("Run cancelled: {context}")]
    Cancelled { context: String },

    /// Engine configuration is invalid
    #[error("Invalid configuration for '{field}': {reason}")]
    Config { field: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl QaError {
    /// Create a CalculatorNotRegistered error
    pub fn calculator_not_registered(calculator_id: impl Into<String>) -> Self {
        QaError::CalculatorNotRegistered {
            calculator_id: calculator_id.into(),
        }
    }

    /// Create a SuiteNotFound error
    pub fn suite_not_found(calculator_id: impl Into<String>) -> Self {
        QaError::SuiteNotFound {
            calculator_id: calculator_id.into(),
        }
    }

    /// Create an InvalidTestCase error
    pub fn invalid_test_case(
        calculator_id: impl Into<String>,
        test_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QaError::InvalidTestCase {
            calculator_id: calculator_id.into(),
            test_id: test_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a HookFailed error
    pub fn hook_failed(calculator_id: impl Into<String>, hook: impl Into<String>, reason: impl Into<String>) -> Self {
        QaError::HookFailed {
            calculator_id: calculator_id.into(),
            hook: hook.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        QaError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        QaError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (the same call may succeed later)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QaError::Cancelled { .. } | QaError::FileError { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            QaError::CalculatorNotRegistered { .. } => "CALCULATOR_NOT_REGISTERED",
            QaError::SuiteNotFound { .. } => "SUITE_NOT_FOUND",
            QaError::InvalidTestCase { .. } => "INVALID_TEST_CASE",
            QaError::HookFailed { .. } => "HOOK_FAILED",
            QaError::InvalidTransition { .. } => "INVALID_TRANSITION",
            QaError::Cancelled { .. } => "CANCELLED",
            QaError::Config { .. } => "CONFIG_ERROR",
            QaError::FileError { .. } => "FILE_ERROR",
            QaError::SerializationError { .. } => "SERIALIZATION_ERROR",
            QaError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for QaError {
    fn from(e: serde_json::Error) -> Self {
        QaError::SerializationError { reason: e.to_string() }
    }
}

/// Failure returned by a calculator's compute function.
///
/// Recorded on the test result; never aborts a suite.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ComputeError {
    /// A required input was absent or blank
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// An input could not be interpreted as the expected type
    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// The formula itself could not produce a result (division by zero, etc.)
    #[error("{0}")]
    Failed(String),
}

impl ComputeError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ComputeError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = QaError::invalid_test_case("sum", "case-1", "tolerance must be >= 0");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidTestCase\""));
        let roundtrip: QaError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(QaError::suite_not_found("x").error_code(), "SUITE_NOT_FOUND");
        assert_eq!(
            QaError::calculator_not_registered("x").error_code(),
            "CALCULATOR_NOT_REGISTERED"
        );
        assert!(!QaError::suite_not_found("x").is_recoverable());
    }

    #[test]
    fn test_suite_not_found_message() {
        let error = QaError::suite_not_found("bmi-calculator");
        assert_eq!(error.to_string(), "No test suite found for calculator: bmi-calculator");
    }

    #[test]
    fn test_compute_error_display() {
        let error = ComputeError::invalid_input("rate", "not a number");
        assert_eq!(error.to_string(), "Invalid input 'rate': not a number");
    }
}
