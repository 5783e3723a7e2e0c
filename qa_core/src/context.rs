//! # Engine Context
//!
//! Owns every registry the engine consults: rules, calculators, test suites,
//! field help and the benchmark table, plus the active [`EngineConfig`].
//! Registration takes `&mut self`; validation and test runs take `&self`, so
//! a shared context can serve concurrent readers once it is built.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::calculator::{Calculator, FieldDescriptor};
//! use qa_core::context::EngineContext;
//! use qa_core::rules::{required, Domain};
//! use qa_core::values::field_map;
//!
//! let mut ctx = EngineContext::default();
//! ctx.register_calculator(
//!     Calculator::new("mortgage-calculator", |_| Ok(field_map([("monthlyPayment", 0)])))
//!         .with_field(FieldDescriptor::new("loanAmount", "Loan Amount"))
//!         .with_field(FieldDescriptor::new("homeValue", "Home Value"))
//!         .with_outputs(["monthlyPayment"]),
//! );
//! ctx.register_calculator_rules(
//!     "mortgage-calculator",
//!     vec![required("loanAmount", "Loan amount is required")],
//!     &[Domain::Financial],
//! )
//! .unwrap();
//!
//! let verdict = ctx.validate(
//!     "mortgage-calculator",
//!     &field_map([("loanAmount", 500_000), ("homeValue", 400_000)]),
//! );
//! assert!(verdict.errors.contains_key("loanAmount"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::benchmark::{BenchmarkTable, TestSuite};
use crate::calculator::Calculator;
use crate::config::EngineConfig;
use crate::errors::{QaError, QaResult};
use crate::rules::{generate_rules, Domain, Rule};
use crate::validation::{ContextualHelp, ContextualSuggestions, SuggestionSource};

/// Registries and configuration for one engine instance.
#[derive(Clone)]
pub struct EngineContext {
    config: EngineConfig,
    calculators: BTreeMap<String, Calculator>,
    rules: HashMap<String, Vec<Rule>>,
    suites: HashMap<String, TestSuite>,
    help: HashMap<String, BTreeMap<String, ContextualHelp>>,
    benchmarks: BenchmarkTable,
    suggestions: Arc<dyn SuggestionSource>,
}

impl Default for EngineContext {
    fn default() -> Self {
        EngineContext::new(EngineConfig::default())
    }
}

impl EngineContext {
    /// Empty registries, the built-in industry benchmarks and the default
    /// suggestion source.
    pub fn new(config: EngineConfig) -> Self {
        EngineContext {
            config,
            calculators: BTreeMap::new(),
            rules: HashMap::new(),
            suites: HashMap::new(),
            help: HashMap::new(),
            benchmarks: BenchmarkTable::industry(),
            suggestions: Arc::new(ContextualSuggestions),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn with_benchmarks(mut self, benchmarks: BenchmarkTable) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    pub fn benchmarks(&self) -> &BenchmarkTable {
        &self.benchmarks
    }

    pub fn benchmarks_mut(&mut self) -> &mut BenchmarkTable {
        &mut self.benchmarks
    }

    pub fn set_suggestion_source(&mut self, source: impl SuggestionSource + 'static) {
        self.suggestions = Arc::new(source);
    }

    pub(crate) fn suggestion_source(&self) -> &dyn SuggestionSource {
        self.suggestions.as_ref()
    }

    // ------------------------------------------------------------------
    // Calculators
    // ------------------------------------------------------------------

    /// Register (or replace) a calculator.
    pub fn register_calculator(&mut self, calculator: Calculator) {
        debug!(calculator_id = %calculator.id, fields = calculator.fields.len(), "registered calculator");
        self.calculators.insert(calculator.id.clone(), calculator);
    }

    pub fn calculator(&self, calculator_id: &str) -> Option<&Calculator> {
        self.calculators.get(calculator_id)
    }

    /// Registered calculator ids, sorted.
    pub fn calculator_ids(&self) -> Vec<String> {
        self.calculators.keys().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Register the rules for a calculator. Replaces any prior registration.
    pub fn register_rules(&mut self, calculator_id: impl Into<String>, rules: Vec<Rule>) {
        let calculator_id = calculator_id.into();
        debug!(calculator_id = %calculator_id, rules = rules.len(), "registered rules");
        self.rules.insert(calculator_id, rules);
    }

    /// Register `base` rules followed by the rules generated for `domains`
    /// from the calculator's declared fields.
    pub fn register_calculator_rules(&mut self, calculator_id: &str, base: Vec<Rule>, domains: &[Domain]) -> QaResult<()> {
        let declared = self
            .calculators
            .get(calculator_id)
            .ok_or_else(|| QaError::calculator_not_registered(calculator_id))?
            .declared_fields();

        let mut rules = base;
        let generated = generate_rules(domains, &declared);
        info!(calculator_id, base = rules.len(), generated = generated.len(), "registering calculator rules");
        rules.extend(generated);
        self.register_rules(calculator_id, rules);
        Ok(())
    }

    pub fn rules_for(&self, calculator_id: &str) -> Option<&[Rule]> {
        self.rules.get(calculator_id).map(Vec::as_slice)
    }

    // ------------------------------------------------------------------
    // Field help
    // ------------------------------------------------------------------

    /// Register help for one field. Replaces earlier help for that field.
    pub fn register_help(&mut self, calculator_id: impl Into<String>, help: ContextualHelp) {
        self.help
            .entry(calculator_id.into())
            .or_default()
            .insert(help.field_id.clone(), help);
    }

    pub fn help_for(&self, calculator_id: &str, field_id: &str) -> Option<&ContextualHelp> {
        self.help.get(calculator_id).and_then(|fields| fields.get(field_id))
    }

    /// Help entries for a calculator, ordered by field id.
    pub fn help_entries(&self, calculator_id: &str) -> impl Iterator<Item = &ContextualHelp> {
        self.help.get(calculator_id).into_iter().flat_map(|fields| fields.values())
    }

    // ------------------------------------------------------------------
    // Test suites
    // ------------------------------------------------------------------

    /// Register a test suite, replacing any prior suite for the calculator.
    ///
    /// Every case must have a usable tolerance, and when the calculator is
    /// already registered with declared outputs, expected outputs must be
    /// among them.
    pub fn register_test_suite(&mut self, suite: TestSuite) -> QaResult<()> {
        let declared: &[String] = self
            .calculators
            .get(&suite.calculator_id)
            .map(|c| c.outputs.as_slice())
            .unwrap_or(&[]);

        for case in &suite.test_cases {
            case.check(&suite.calculator_id, declared)?;
        }

        info!(calculator_id = %suite.calculator_id, cases = suite.test_cases.len(), "registered test suite");
        self.suites.insert(suite.calculator_id.clone(), suite);
        Ok(())
    }

    pub fn test_suite(&self, calculator_id: &str) -> Option<&TestSuite> {
        self.suites.get(calculator_id)
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("calculators", &self.calculators.keys().collect::<Vec<_>>())
            .field("rules", &self.rules.len())
            .field("suites", &self.suites.len())
            .field("benchmarks", &self.benchmarks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::TestCase;
    use crate::calculator::FieldDescriptor;
    use crate::values::field_map;

    fn calculator() -> Calculator {
        Calculator::new("loan-calculator", |_| Ok(field_map([("payment", 1)])))
            .with_field(FieldDescriptor::new("loanAmount", "Loan Amount"))
            .with_field(FieldDescriptor::new("creditScore", "Credit Score"))
            .with_outputs(["payment"])
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineContext>();
    }

    #[test]
    fn test_register_calculator_rules_appends_generated() {
        let mut ctx = EngineContext::default();
        ctx.register_calculator(calculator());
        ctx.register_calculator_rules("loan-calculator", Vec::new(), &[Domain::Financial]).unwrap();

        let rules = ctx.rules_for("loan-calculator").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target_field(), "creditScore");
    }

    #[test]
    fn test_register_calculator_rules_requires_calculator() {
        let mut ctx = EngineContext::default();
        let err = ctx.register_calculator_rules("missing", Vec::new(), &Domain::ALL).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATOR_NOT_REGISTERED");
    }

    #[test]
    fn test_register_rules_last_write_wins() {
        let mut ctx = EngineContext::default();
        ctx.register_rules("c", vec![crate::rules::required("a", "A is required")]);
        ctx.register_rules("c", Vec::new());
        assert!(ctx.rules_for("c").unwrap().is_empty());
    }

    #[test]
    fn test_register_suite_rejects_unknown_outputs() {
        let mut ctx = EngineContext::default();
        ctx.register_calculator(calculator());
        let suite = TestSuite::new("loan-calculator", "Loans")
            .with_case(TestCase::new("t1", "bad").with_expected(field_map([("total", 1)])));
        let err = ctx.register_test_suite(suite).unwrap_err();
        assert!(matches!(err, QaError::InvalidTestCase { .. }));
        assert!(ctx.test_suite("loan-calculator").is_none());
    }

    #[test]
    fn test_help_registry() {
        let mut ctx = EngineContext::default();
        ctx.register_help("c", ContextualHelp::new("b", "B", "second"));
        ctx.register_help("c", ContextualHelp::new("a", "A", "first"));
        ctx.register_help("c", ContextualHelp::new("a", "A", "replaced"));

        let fields: Vec<_> = ctx.help_entries("c").map(|h| h.description.as_str()).collect();
        assert_eq!(fields, vec!["replaced", "second"]);
        assert!(ctx.help_for("c", "b").is_some());
        assert_eq!(ctx.help_entries("other").count(), 0);
    }

    #[test]
    fn test_default_context_has_industry_benchmarks() {
        assert!(!EngineContext::default().benchmarks().is_empty());
    }
}
