//! # Domain Rule Generators
//!
//! Calculator authors rarely hand-write the obvious domain checks (a loan
//! larger than the home, an age of 400). Each generator walks a fixed catalog
//! of well-known field names and emits a rule only when every field it needs
//! is declared by the calculator. Missing fields are a no-op, so every
//! generator is safe to run on every calculator.
//!
//! Output order follows catalog order, so the same field set always yields the
//! same list.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use qa_core::rules::domain::{generate_rules, Domain};
//!
//! let declared: BTreeSet<String> = ["loanAmount", "homeValue", "age"]
//!     .into_iter()
//!     .map(String::from)
//!     .collect();
//!
//! let rules = generate_rules(&[Domain::Financial, Domain::Health], &declared);
//! let fields: Vec<_> = rules.iter().map(|r| r.target_field()).collect();
//! assert_eq!(fields, vec!["loanAmount", "loanAmount", "age"]);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::factory::{at_most, business_rule, cross_field, greater_than, range};
use super::{Rule, Severity};
use crate::values::{as_number, number_field};

/// Rule catalogs available to calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Financial,
    Health,
    Business,
    Construction,
    Legal,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Financial,
        Domain::Health,
        Domain::Business,
        Domain::Construction,
        Domain::Legal,
    ];

    /// Run this domain's generator.
    pub fn generate(self, declared: &BTreeSet<String>) -> Vec<Rule> {
        match self {
            Domain::Financial => generate_financial_rules(declared),
            Domain::Health => generate_health_rules(declared),
            Domain::Business => generate_business_rules(declared),
            Domain::Construction => generate_construction_rules(declared),
            Domain::Legal => generate_legal_rules(declared),
        }
    }
}

/// Concatenate the rules of several domains, in the order given.
pub fn generate_rules(domains: &[Domain], declared: &BTreeSet<String>) -> Vec<Rule> {
    domains.iter().flat_map(|d| d.generate(declared)).collect()
}

fn has(declared: &BTreeSet<String>, fields: &[&str]) -> bool {
    fields.iter().all(|f| declared.contains(*f))
}

/// Non-numeric values are left to the field's own range/required rules.
fn positive(field: &'static str, message: &'static str) -> Rule {
    business_rule(field, |value, _| Ok(as_number(value).map_or(true, |n| n > 0.0)), message)
}

fn non_negative(field: &'static str, message: &'static str) -> Rule {
    business_rule(field, |value, _| Ok(as_number(value).map_or(true, |n| n >= 0.0)), message)
}

// ============================================================================
// Financial
// ============================================================================

/// Mortgage, loan and credit checks.
pub fn generate_financial_rules(declared: &BTreeSet<String>) -> Vec<Rule> {
    let mut rules = Vec::new();

    for home in ["homeValue", "propertyValue"] {
        if has(declared, &["loanAmount", home]) {
            rules.push(cross_field("loanAmount", home, at_most, "Loan amount cannot exceed property value"));
        }
    }

    if has(declared, &["loanAmount", "homeValue"]) {
        rules.push(
            business_rule(
                "loanAmount",
                |value, inputs| {
                    let ltv = match (as_number(value), number_field(inputs, "homeValue")) {
                        (Some(loan), Some(home)) if home > 0.0 => loan / home,
                        _ => return Ok(true),
                    };
                    Ok(ltv <= 0.80)
                },
                "Loan-to-value above 80% may require private mortgage insurance",
            )
            .with_severity(Severity::Warning),
        );
    }

    if has(declared, &["downPayment", "homePrice"]) {
        rules.push(cross_field("downPayment", "homePrice", at_most, "Down payment cannot exceed home price"));
    }

    if has(declared, &["creditScore"]) {
        rules.push(range("creditScore", 300.0, 850.0, "Credit score must be between 300 and 850"));
    }

    if has(declared, &["interestRate"]) {
        rules.push(range("interestRate", 0.0, 30.0, "Interest rate must be between 0% and 30%"));
        rules.push(business_rule(
            "interestRate",
            |value, _| Ok(as_number(value).map_or(true, |rate| rate <= 15.0)),
            "Warning: interest rate above 15% is unusually high",
        ));
    }

    if has(declared, &["loanTerm"]) {
        rules.push(range("loanTerm", 1.0, 50.0, "Loan term must be between 1 and 50 years"));
    }

    rules
}

// ============================================================================
// Health
// ============================================================================

/// Physiological plausibility bounds.
pub fn generate_health_rules(declared: &BTreeSet<String>) -> Vec<Rule> {
    let catalog: [(&str, f64, f64, &str); 5] = [
        ("age", 0.0, 120.0, "Age must be between 0 and 120 years"),
        ("weight", 1.0, 1000.0, "Weight must be between 1 and 1000"),
        ("height", 1.0, 300.0, "Height must be between 1 and 300 cm"),
        ("bodyFatPercentage", 2.0, 70.0, "Body fat percentage must be between 2% and 70%"),
        ("restingHeartRate", 30.0, 220.0, "Resting heart rate must be between 30 and 220 bpm"),
    ];

    catalog
        .into_iter()
        .filter(|(field, ..)| declared.contains(*field))
        .map(|(field, min, max, message)| range(field, min, max, message))
        .collect()
}

// ============================================================================
// Business
// ============================================================================

/// Ratio and margin sanity checks.
pub fn generate_business_rules(declared: &BTreeSet<String>) -> Vec<Rule> {
    let mut rules = Vec::new();

    if has(declared, &["currentLiabilities"]) {
        rules.push(positive("currentLiabilities", "Current liabilities must be greater than zero"));
    }

    if has(declared, &["conversions", "visitors"]) {
        rules.push(cross_field("conversions", "visitors", at_most, "Conversions cannot exceed visitors"));
    }

    if has(declared, &["sellingPricePerUnit", "variableCostPerUnit"]) {
        rules.push(cross_field(
            "sellingPricePerUnit",
            "variableCostPerUnit",
            greater_than,
            "Selling price must be greater than variable cost per unit",
        ));
    }

    if has(declared, &["churnRate"]) {
        rules.push(range("churnRate", 0.0, 1.0, "Churn rate must be between 0 and 1"));
    }

    if has(declared, &["profitMargin"]) {
        rules.push(range("profitMargin", -100.0, 100.0, "Profit margin must be between -100% and 100%"));
    }

    rules
}

// ============================================================================
// Construction
// ============================================================================

/// Dimension and material bounds.
pub fn generate_construction_rules(declared: &BTreeSet<String>) -> Vec<Rule> {
    let mut rules = Vec::new();

    for (field, message) in [
        ("length", "Length must be greater than zero"),
        ("width", "Width must be greater than zero"),
        ("depth", "Depth must be greater than zero"),
    ] {
        if declared.contains(field) {
            rules.push(positive(field, message));
        }
    }

    if has(declared, &["coats"]) {
        rules.push(range("coats", 1.0, 10.0, "Number of coats must be between 1 and 10"));
    }

    if has(declared, &["wasteFactor"]) {
        rules.push(range("wasteFactor", 0.0, 50.0, "Waste factor must be between 0% and 50%"));
    }

    rules
}

// ============================================================================
// Legal
// ============================================================================

/// Settlement and compensation bounds.
pub fn generate_legal_rules(declared: &BTreeSet<String>) -> Vec<Rule> {
    let mut rules = Vec::new();

    if has(declared, &["disabilityPercentage"]) {
        rules.push(range(
            "disabilityPercentage",
            0.0,
            100.0,
            "Disability percentage must be between 0% and 100%",
        ));
    }

    if has(declared, &["multiplier"]) {
        rules.push(range("multiplier", 1.0, 15.0, "Damages multiplier must be between 1 and 15"));
    }

    if has(declared, &["medicalCosts"]) {
        rules.push(non_negative("medicalCosts", "Medical costs cannot be negative"));
    }

    if has(declared, &["lostWages"]) {
        rules.push(non_negative("lostWages", "Lost wages cannot be negative"));
    }

    rules
}
