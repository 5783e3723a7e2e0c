//! # qa_core - Calculator Validation & Certification Engine
//!
//! `qa_core` decides whether a calculator can be trusted. It validates user
//! inputs against registered rules, runs labeled test suites and compares
//! the results with industry reference values, measures performance and
//! accessibility, and issues a certification verdict with recommendations.
//!
//! The engine never sees formula bodies: a calculator is an id, its declared
//! fields and outputs, and a pure compute function. All state lives in an
//! explicit [`EngineContext`](context::EngineContext); every report is a
//! serde-serializable value owned by the caller.
//!
//! ## Quick Start
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
//! assert!(ctx.validate("savings-calculator", &field_map([("rate", 10)])).is_valid);
//! ```
//!
//! ## Modules
//!
//! - [`context`] - Registries for calculators, rules, suites, help and benchmarks
//! - [`calculator`] - Calculator contract
//! - [`rules`] - Rule factory and domain rule generators
//! - [`validation`] - Live input validation and suggestions
//! - [`benchmark`] - Test suites, tolerance comparison, industry benchmarks
//! - [`report`] - Certification verdicts, export document, markdown
//! - [`harness`] - Performance, accessibility and platform-wide runs
//! - [`config`] - Engine configuration
//! - [`errors`] - Structured error types

pub mod benchmark;
pub mod calculator;
pub mod config;
pub mod context;
pub mod errors;
pub mod harness;
pub mod report;
pub mod rules;
pub mod validation;
pub mod values;

// Re-export commonly used types at crate root for convenience
pub use calculator::{Calculator, FieldDescriptor};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use errors::{ComputeError, QaError, QaResult};
pub use report::CertificationStatus;
pub use values::FieldMap;
