//! Contextual suggestions shown next to valid inputs.
//!
//! The engine asks its [`SuggestionSource`] for suggestions only after a
//! validation pass produced no errors. The default source,
//! [`ContextualSuggestions`], combines calculator-family heuristics with the
//! field help registered on the context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::EngineContext;
use crate::values::{is_blank, number_field, FieldMap};

/// Field-level help for one calculator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualHelp {
    pub field_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl ContextualHelp {
    pub fn new(field_id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        ContextualHelp {
            field_id: field_id.into(),
            title: title.into(),
            description: description.into(),
            examples: Vec::new(),
            tips: Vec::new(),
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tips.push(tip.into());
        self
    }
}

/// Produces field suggestions for an error-free input set.
///
/// Implementations must be pure: the engine may call them at keystroke
/// frequency.
pub trait SuggestionSource: Send + Sync {
    fn suggest(&self, ctx: &EngineContext, calculator_id: &str, inputs: &FieldMap) -> BTreeMap<String, String>;
}

/// Heuristics keyed on the calculator id, then the first help tip of each
/// filled-in field. A heuristic suggestion wins over a help tip.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualSuggestions;

impl SuggestionSource for ContextualSuggestions {
    fn suggest(&self, ctx: &EngineContext, calculator_id: &str, inputs: &FieldMap) -> BTreeMap<String, String> {
        let mut suggestions = heuristic_suggestions(calculator_id, inputs);

        for help in ctx.help_entries(calculator_id) {
            if is_blank(inputs.get(&help.field_id)) {
                continue;
            }
            if let Some(tip) = help.tips.first() {
                suggestions.entry(help.field_id.clone()).or_insert_with(|| tip.clone());
            }
        }

        suggestions
    }
}

/// No suggestions at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuggestions;

impl SuggestionSource for NoSuggestions {
    fn suggest(&self, _ctx: &EngineContext, _calculator_id: &str, _inputs: &FieldMap) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

fn heuristic_suggestions(calculator_id: &str, inputs: &FieldMap) -> BTreeMap<String, String> {
    let id = calculator_id.to_lowercase();
    let mut out = BTreeMap::new();

    if id.contains("mortgage") || id.contains("loan") {
        let price = number_field(inputs, "homePrice").or_else(|| number_field(inputs, "homeValue"));
        if let (Some(down), Some(price)) = (number_field(inputs, "downPayment"), price) {
            if price > 0.0 && down / price < 0.20 {
                out.insert(
                    "downPayment".to_string(),
                    "A down payment of at least 20% avoids private mortgage insurance".to_string(),
                );
            }
        }
    }

    if id.contains("retirement") || id.contains("savings") {
        if let Some(rate) = number_field(inputs, "contributionRate") {
            if rate < 10.0 {
                out.insert(
                    "contributionRate".to_string(),
                    "Saving at least 10% of income is a common retirement target".to_string(),
                );
            }
        }
    }

    if id.contains("bmi") || id.contains("health") {
        if let Some(age) = number_field(inputs, "age") {
            if age < 18.0 {
                out.insert(
                    "age".to_string(),
                    "Adult BMI categories do not apply under 18; use BMI-for-age percentiles".to_string(),
                );
            }
        }
        if number_field(inputs, "weight").is_some() && number_field(inputs, "height").is_some() {
            out.entry("height".to_string())
                .or_insert_with(|| "BMI does not distinguish muscle from fat mass".to_string());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::field_map;

    #[test]
    fn test_mortgage_down_payment_heuristic() {
        let ctx = EngineContext::default();
        let low = ContextualSuggestions.suggest(
            &ctx,
            "mortgage-calculator",
            &field_map([("downPayment", 20_000), ("homePrice", 400_000)]),
        );
        assert!(low["downPayment"].contains("20%"));

        let high = ContextualSuggestions.suggest(
            &ctx,
            "mortgage-calculator",
            &field_map([("downPayment", 100_000), ("homePrice", 400_000)]),
        );
        assert!(high.is_empty());
    }

    #[test]
    fn test_heuristics_keyed_on_calculator_id() {
        let ctx = EngineContext::default();
        let inputs = field_map([("downPayment", 1_000), ("homePrice", 400_000)]);
        assert!(ContextualSuggestions.suggest(&ctx, "tip-calculator", &inputs).is_empty());
    }

    #[test]
    fn test_retirement_contribution() {
        let ctx = EngineContext::default();
        let out = ContextualSuggestions.suggest(&ctx, "retirement-savings", &field_map([("contributionRate", "6")]));
        assert!(out.contains_key("contributionRate"));
    }

    #[test]
    fn test_help_tip_for_filled_fields_only() {
        let mut ctx = EngineContext::default();
        ctx.register_help(
            "tip-calculator",
            ContextualHelp::new("billAmount", "Bill Amount", "Total before tip")
                .with_tip("Use the pre-tax amount")
                .with_tip("Round to the nearest dollar"),
        );
        ctx.register_help(
            "tip-calculator",
            ContextualHelp::new("people", "People", "Number of people").with_tip("Include yourself"),
        );

        let out = ContextualSuggestions.suggest(&ctx, "tip-calculator", &field_map([("billAmount", 80)]));
        assert_eq!(out.len(), 1);
        assert_eq!(out["billAmount"], "Use the pre-tax amount");
    }

    #[test]
    fn test_heuristic_beats_help_tip() {
        let mut ctx = EngineContext::default();
        ctx.register_help(
            "mortgage-calculator",
            ContextualHelp::new("downPayment", "Down Payment", "Cash paid upfront").with_tip("Include gift funds"),
        );
        let out = ContextualSuggestions.suggest(
            &ctx,
            "mortgage-calculator",
            &field_map([("downPayment", 10_000), ("homePrice", 300_000)]),
        );
        assert!(out["downPayment"].contains("private mortgage insurance"));
    }
}
