//! Industry benchmark catalog.
//!
//! Reference results published by industry tools, grouped by calculator
//! family. A calculator's family is picked from its id; entries are keyed by
//! test case id. Tolerances here are absolute, in the output's own unit.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::values::{field_map, FieldMap};

/// Calculator family that selects a benchmark group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkCategory {
    Mortgage,
    Investment,
    Legal,
    Business,
    Math,
    General,
}

impl BenchmarkCategory {
    /// Family for a calculator id. First match wins, in catalog order.
    ///
    /// ```rust
    /// use qa_core::benchmark::BenchmarkCategory;
    ///
    /// assert_eq!(BenchmarkCategory::for_calculator("mortgage-payment"), BenchmarkCategory::Mortgage);
    /// assert_eq!(BenchmarkCategory::for_calculator("portfolio-rebalance"), BenchmarkCategory::Investment);
    /// assert_eq!(BenchmarkCategory::for_calculator("tip-calculator"), BenchmarkCategory::General);
    /// ```
    pub fn for_calculator(calculator_id: &str) -> Self {
        let id = calculator_id.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| id.contains(n));

        if has(&["mortgage"]) {
            BenchmarkCategory::Mortgage
        } else if has(&["investment", "portfolio"]) {
            BenchmarkCategory::Investment
        } else if has(&["legal", "injury"]) {
            BenchmarkCategory::Legal
        } else if has(&["saas", "business"]) {
            BenchmarkCategory::Business
        } else if has(&["math", "algebra"]) {
            BenchmarkCategory::Math
        } else {
            BenchmarkCategory::General
        }
    }
}

/// One published reference result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkEntry {
    /// Inputs the reference value was produced with
    pub inputs: FieldMap,
    pub expected_value: f64,
    pub source: String,
    /// Absolute tolerance
    pub tolerance: f64,
}

impl BenchmarkEntry {
    pub fn new(inputs: FieldMap, expected_value: f64, source: impl Into<String>, tolerance: f64) -> Self {
        BenchmarkEntry {
            inputs,
            expected_value,
            source: source.into(),
            tolerance,
        }
    }

    /// `(passed, variance)` for a primary output. A missing or non-numeric
    /// output fails with no variance.
    pub fn check(&self, actual: Option<f64>) -> (bool, Option<f64>) {
        match actual {
            Some(actual) => {
                let variance = (actual - self.expected_value).abs();
                (variance <= self.tolerance, Some(variance))
            }
            None => (false, None),
        }
    }
}

/// Benchmark entries by category, then by test case id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkTable {
    groups: BTreeMap<BenchmarkCategory, BTreeMap<String, BenchmarkEntry>>,
}

impl BenchmarkTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        BenchmarkTable::default()
    }

    /// The built-in industry catalog.
    pub fn industry() -> Self {
        INDUSTRY_BENCHMARKS.clone()
    }

    pub fn insert(&mut self, category: BenchmarkCategory, test_id: impl Into<String>, entry: BenchmarkEntry) {
        self.groups.entry(category).or_default().insert(test_id.into(), entry);
    }

    /// Entry for a test case of the given calculator.
    pub fn lookup(&self, calculator_id: &str, test_id: &str) -> Option<&BenchmarkEntry> {
        self.groups
            .get(&BenchmarkCategory::for_calculator(calculator_id))
            .and_then(|group| group.get(test_id))
    }

    pub fn group(&self, category: BenchmarkCategory) -> Option<&BTreeMap<String, BenchmarkEntry>> {
        self.groups.get(&category)
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static INDUSTRY_BENCHMARKS: Lazy<BenchmarkTable> = Lazy::new(|| {
    use BenchmarkCategory::*;

    let mut table = BenchmarkTable::empty();

    table.insert(
        Mortgage,
        "conventional-30-year",
        BenchmarkEntry::new(
            field_map([
                ("homePrice", json!(400_000)),
                ("downPayment", json!(80_000)),
                ("interestRate", json!(7.0)),
                ("loanTerm", json!(30)),
            ]),
            2129.21,
            "Freddie Mac PMMS",
            0.50,
        ),
    );
    table.insert(
        Mortgage,
        "fha-loan",
        BenchmarkEntry::new(
            field_map([
                ("homePrice", json!(300_000)),
                ("downPayment", json!(10_500)),
                ("interestRate", json!(6.75)),
                ("loanTerm", json!(30)),
            ]),
            1878.61,
            "FHA Guidelines",
            1.00,
        ),
    );
    table.insert(
        Mortgage,
        "jumbo-loan",
        BenchmarkEntry::new(
            field_map([
                ("homePrice", json!(1_000_000)),
                ("downPayment", json!(200_000)),
                ("interestRate", json!(7.25)),
                ("loanTerm", json!(30)),
            ]),
            5459.85,
            "CFPB Calculator",
            2.00,
        ),
    );

    table.insert(
        Investment,
        "portfolio-return",
        BenchmarkEntry::new(
            field_map([
                ("stocks", json!(60)),
                ("bonds", json!(30)),
                ("cash", json!(10)),
                ("expectedReturn", json!([0.10, 0.04, 0.02])),
                ("timeHorizon", json!(20)),
            ]),
            0.074,
            "Morningstar Direct",
            0.005,
        ),
    );
    table.insert(
        Investment,
        "sharpe-ratio",
        BenchmarkEntry::new(
            field_map([
                ("returns", json!([0.12, 0.08, 0.15, 0.06, 0.10])),
                ("riskFreeRate", json!(0.03)),
            ]),
            0.89,
            "Bloomberg Terminal",
            0.05,
        ),
    );

    table.insert(
        Legal,
        "personal-injury-ca",
        BenchmarkEntry::new(
            field_map([
                ("medicalCosts", json!(50_000)),
                ("lostWages", json!(25_000)),
                ("painSuffering", json!("moderate")),
                ("jurisdiction", json!("CA")),
            ]),
            262_500.0,
            "California Jury Verdicts",
            5000.0,
        ),
    );

    table.insert(
        Business,
        "saas-ltv",
        BenchmarkEntry::new(
            field_map([
                ("monthlyRevenue", json!(1000)),
                ("churnRate", json!(0.05)),
                ("grossMargin", json!(0.80)),
            ]),
            16_000.0,
            "SaaS Capital Survey",
            500.0,
        ),
    );

    table.insert(
        Math,
        "quadratic-roots",
        BenchmarkEntry::new(
            field_map([("a", 1), ("b", -5), ("c", 6)]),
            3.0,
            "Wolfram Alpha",
            0.0001,
        ),
    );
    table.insert(
        Math,
        "matrix-determinant",
        BenchmarkEntry::new(
            field_map([("matrix", json!([[1, 2, 3], [4, 5, 6], [7, 8, 9]]))]),
            0.0,
            "MATLAB",
            0.0001,
        ),
    );

    table
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_selection_order() {
        assert_eq!(BenchmarkCategory::for_calculator("business-mortgage"), BenchmarkCategory::Mortgage);
        assert_eq!(BenchmarkCategory::for_calculator("personal-injury"), BenchmarkCategory::Legal);
        assert_eq!(BenchmarkCategory::for_calculator("saas-metrics"), BenchmarkCategory::Business);
        assert_eq!(BenchmarkCategory::for_calculator("algebra-solver"), BenchmarkCategory::Math);
    }

    #[test]
    fn test_industry_catalog() {
        let table = BenchmarkTable::industry();
        assert_eq!(table.len(), 9);

        let conventional = table.lookup("mortgage-calculator", "conventional-30-year").unwrap();
        assert_eq!(conventional.expected_value, 2129.21);
        assert_eq!(conventional.source, "Freddie Mac PMMS");
        assert_eq!(conventional.inputs["interestRate"], json!(7.0));

        assert!(table.lookup("tip-calculator", "conventional-30-year").is_none());
        assert!(table.lookup("mortgage-calculator", "saas-ltv").is_none());
    }

    #[test]
    fn test_entry_check_is_absolute() {
        let entry = BenchmarkEntry::new(FieldMap::new(), 2129.21, "Freddie Mac PMMS", 0.50);
        let (passed, variance) = entry.check(Some(2129.60));
        assert!(passed);
        assert!((variance.unwrap() - 0.39).abs() < 1e-9);

        assert!(!entry.check(Some(2130.0)).0);
        assert_eq!(entry.check(None), (false, None));
    }
}
