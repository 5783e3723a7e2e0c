//! Accessibility harness.
//!
//! A calculator form is described by a [`UiSnapshot`]: its fields, the color
//! pairs it renders, heading levels, landmarks and a handful of behavioral
//! flags. Each entry of the check catalog is a [`Checker`] that inspects the
//! snapshot and reports issues with evidence. The same snapshot always
//! produces the same report.
//!
//! ```rust
//! use qa_core::context::EngineContext;
//! use qa_core::harness::accessibility::UiSnapshot;
//!
//! let ctx = EngineContext::default();
//! let mut ui = UiSnapshot::new("sum");
//! ui.live_results_region = false;
//!
//! let report = ctx.run_accessibility_tests(&ui);
//! assert!(report.results.iter().any(|r| r.test_id == "screen-reader-live-regions" && !r.passed));
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calculator::InputKind;
use crate::context::EngineContext;
use crate::errors::{QaError, QaResult};
use crate::report::{success_rate, CertificationStatus, Rating};

pub const NORMAL_TEXT_CONTRAST: f64 = 4.5;
pub const LARGE_TEXT_CONTRAST: f64 = 3.0;

// ============================================================================
// Snapshot
// ============================================================================

/// sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// WCAG relative luminance in `[0, 1]`.
    pub fn relative_luminance(self) -> f64 {
        fn linear(channel: u8) -> f64 {
            let c = f64::from(channel) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.0) + 0.7152 * linear(self.1) + 0.0722 * linear(self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// WCAG contrast ratio between two colors, from 1 to 21.
///
/// ```rust
/// use qa_core::harness::accessibility::{contrast_ratio, Rgb};
///
/// let ratio = contrast_ratio(Rgb(0, 0, 0), Rgb(255, 255, 255));
/// assert!((ratio - 21.0).abs() < 1e-9);
/// ```
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.relative_luminance(), b.relative_luminance());
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// A rendered form control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiField {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    /// HTML-style tab index: negative removes the control from the tab
    /// sequence, 0 keeps document order, positive values are explicit.
    #[serde(default)]
    pub tab_index: i32,
    #[serde(default = "default_true")]
    pub focus_indicator: bool,
    #[serde(default)]
    pub kind: InputKind,
}

/// Foreground/background pair used by some element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPair {
    pub element: String,
    pub foreground: Rgb,
    pub background: Rgb,
    /// 18pt, or 14pt bold, and above
    #[serde(default)]
    pub large_text: bool,
}

impl ColorPair {
    pub fn new(element: impl Into<String>, foreground: Rgb, background: Rgb) -> Self {
        ColorPair {
            element: element.into(),
            foreground,
            background,
            large_text: false,
        }
    }

    pub fn large(mut self) -> Self {
        self.large_text = true;
        self
    }

    pub fn ratio(&self) -> f64 {
        contrast_ratio(self.foreground, self.background)
    }
}

/// Everything the checkers need to know about a calculator's form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub calculator_id: String,
    /// Fields in visual order
    pub fields: Vec<UiField>,
    pub colors: Vec<ColorPair>,
    /// Heading levels in document order (1 = h1)
    pub headings: Vec<u8>,
    /// Landmark roles present on the page (`main`, `form`, ...)
    pub landmarks: Vec<String>,
    /// Results are rendered inside an `aria-live` region
    pub live_results_region: bool,
    /// The calculate button responds to Enter and Space
    pub calculate_button_keyboard: bool,
    /// Fields failing validation carry `aria-invalid`
    pub marks_invalid_fields: bool,
    /// Errors are shown with an icon or text, not only a red border
    pub non_color_error_indicators: bool,
}

fn default_true() -> bool {
    true
}

impl UiSnapshot {
    /// An empty form using the default theme and well-behaved flags.
    pub fn new(calculator_id: impl Into<String>) -> Self {
        let white = Rgb(0xff, 0xff, 0xff);
        UiSnapshot {
            calculator_id: calculator_id.into(),
            fields: Vec::new(),
            colors: vec![
                ColorPair::new("body text", Rgb(0x1f, 0x29, 0x37), white),
                ColorPair::new("help text", Rgb(0x4b, 0x55, 0x63), white),
                ColorPair::new("error text", Rgb(0xb9, 0x1c, 0x1c), white),
                ColorPair::new("calculate button", white, Rgb(0x1d, 0x4e, 0xd8)),
                ColorPair::new("page heading", Rgb(0x11, 0x18, 0x27), white).large(),
            ],
            headings: vec![1, 2],
            landmarks: vec!["main".into(), "form".into()],
            live_results_region: true,
            calculate_button_keyboard: true,
            marks_invalid_fields: true,
            non_color_error_indicators: true,
        }
    }

    pub fn with_field(mut self, field: UiField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn has_landmark(&self, role: &str) -> bool {
        self.landmarks.iter().any(|l| l.eq_ignore_ascii_case(role))
    }
}

impl EngineContext {
    /// Default-theme snapshot of a registered calculator's form.
    ///
    /// Labels come from the declared fields; help text from the field
    /// descriptor, falling back to registered contextual help.
    pub fn ui_snapshot(&self, calculator_id: &str) -> QaResult<UiSnapshot> {
        let calculator = self
            .calculator(calculator_id)
            .ok_or_else(|| QaError::calculator_not_registered(calculator_id))?;

        let mut snapshot = UiSnapshot::new(calculator_id);
        for field in &calculator.fields {
            let help_text = field.help_text.clone().or_else(|| {
                self.help_for(calculator_id, &field.id)
                    .map(|h| h.description.clone())
            });
            snapshot.fields.push(UiField {
                id: field.id.clone(),
                label: Some(field.label.clone()).filter(|l| !l.trim().is_empty()),
                help_text,
                tab_index: 0,
                focus_indicator: true,
                kind: field.kind,
            });
        }
        Ok(snapshot)
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    A,
    AA,
    AAA,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    Keyboard,
    ScreenReader,
    Aria,
    Focus,
    ColorContrast,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Major,
    Minor,
}

/// Static description of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub wcag_level: WcagLevel,
    pub kind: CheckKind,
    pub severity: IssueSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: IssueSeverity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcagViolation {
    /// Success criterion, e.g. "WCAG 2.4.3"
    pub rule: String,
    pub level: WcagLevel,
    pub description: String,
}

/// What a checker found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub issues: Vec<Issue>,
    pub violations: Vec<WcagViolation>,
    /// What was inspected, for the report reader
    pub evidence: Vec<String>,
}

impl Findings {
    fn issue(&mut self, severity: IssueSeverity, description: String, element: Option<&str>, recommendation: &str) {
        self.issues.push(Issue {
            severity,
            description,
            element: element.map(str::to_string),
            recommendation: recommendation.to_string(),
        });
    }

    /// Record the criterion once, however many elements break it.
    fn violates(&mut self, rule: &str, level: WcagLevel, description: &str) {
        if !self.violations.iter().any(|v| v.rule == rule) {
            self.violations.push(WcagViolation {
                rule: rule.to_string(),
                level,
                description: description.to_string(),
            });
        }
    }

    fn note(&mut self, evidence: String) {
        self.evidence.push(evidence);
    }
}

/// One accessibility check.
pub trait Checker: Send + Sync {
    fn spec(&self) -> &'static CheckSpec;

    fn check(&self, ui: &UiSnapshot) -> Findings;
}

macro_rules! spec {
    ($id:literal, $name:literal, $desc:literal, $level:ident, $kind:ident, $severity:ident) => {
        &CheckSpec {
            id: $id,
            name: $name,
            description: $desc,
            wcag_level: WcagLevel::$level,
            kind: CheckKind::$kind,
            severity: IssueSeverity::$severity,
        }
    };
}

struct TabOrder;

impl Checker for TabOrder {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "keyboard-tab-order",
            "Keyboard Tab Order",
            "Verify logical tab order through calculator interface",
            A,
            Keyboard,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        let explicit: Vec<(&str, i32)> = ui
            .fields
            .iter()
            .filter(|f| f.tab_index > 0)
            .map(|f| (f.id.as_str(), f.tab_index))
            .collect();
        findings.note(format!("{} field(s) with explicit tab index", explicit.len()));

        if let Some(pair) = explicit.windows(2).find(|w| w[1].1 <= w[0].1) {
            findings.issue(
                IssueSeverity::Critical,
                format!("Tab order is not logical: {} is reached before {}", pair[1].0, pair[0].0),
                Some("form inputs"),
                "Ensure tab order follows visual layout",
            );
            findings.violates("WCAG 2.4.3", WcagLevel::A, "Focus Order");
        }
        findings
    }
}

struct InputAccess;

impl Checker for InputAccess {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "keyboard-input-access",
            "Keyboard Input Access",
            "All input fields accessible via keyboard",
            A,
            Keyboard,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        findings.note(format!("{} field(s) inspected", ui.fields.len()));
        for field in ui.fields.iter().filter(|f| f.tab_index < 0) {
            findings.issue(
                IssueSeverity::Critical,
                format!("Field {} is removed from the tab sequence", field.id),
                Some(field.id.as_str()),
                "Remove negative tabindex from form inputs",
            );
            findings.violates("WCAG 2.1.1", WcagLevel::A, "Keyboard");
        }
        findings
    }
}

struct ButtonActivation;

impl Checker for ButtonActivation {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "keyboard-button-activation",
            "Keyboard Button Activation",
            "Calculate button activatable with Enter/Space",
            A,
            Keyboard,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        if !ui.calculate_button_keyboard {
            findings.issue(
                IssueSeverity::Critical,
                "Calculate button does not respond to Enter or Space".into(),
                Some("calculate button"),
                "Use a native button element or handle Enter and Space",
            );
            findings.violates("WCAG 2.1.1", WcagLevel::A, "Keyboard");
        }
        findings
    }
}

struct Labels;

impl Checker for Labels {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "screen-reader-labels",
            "Screen Reader Labels",
            "All form controls have proper labels",
            A,
            ScreenReader,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        let labelled = ui
            .fields
            .iter()
            .filter(|f| f.label.as_deref().is_some_and(|l| !l.trim().is_empty()))
            .count();
        findings.note(format!("{}/{} field(s) labelled", labelled, ui.fields.len()));

        for field in &ui.fields {
            if field.label.as_deref().map_or(true, |l| l.trim().is_empty()) {
                findings.issue(
                    IssueSeverity::Critical,
                    format!("Form control {} is missing a label", field.id),
                    Some(field.id.as_str()),
                    "Add proper labels or aria-label attributes",
                );
                findings.violates("WCAG 4.1.2", WcagLevel::A, "Name, Role, Value");
            }
        }
        findings
    }
}

struct Headings;

impl Checker for Headings {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "screen-reader-headings",
            "Heading Structure",
            "Proper heading hierarchy for screen readers",
            A,
            ScreenReader,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        findings.note(format!("heading levels {:?}", ui.headings));

        match ui.headings.first() {
            None => findings.issue(
                IssueSeverity::Major,
                "Page has no headings".into(),
                None,
                "Add a top-level heading naming the calculator",
            ),
            Some(&first) if first != 1 => findings.issue(
                IssueSeverity::Major,
                format!("First heading is h{} instead of h1", first),
                None,
                "Start the heading hierarchy at h1",
            ),
            Some(_) => {}
        }
        for pair in ui.headings.windows(2) {
            if pair[1] > pair[0].saturating_add(1) {
                findings.issue(
                    IssueSeverity::Major,
                    format!("Heading level skips from h{} to h{}", pair[0], pair[1]),
                    None,
                    "Do not skip heading levels",
                );
            }
        }
        if !findings.issues.is_empty() {
            findings.violates("WCAG 1.3.1", WcagLevel::A, "Info and Relationships");
        }
        findings
    }
}

struct Landmarks;

impl Checker for Landmarks {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "screen-reader-landmarks",
            "Landmark Regions",
            "Proper landmark regions for navigation",
            AA,
            ScreenReader,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        findings.note(format!("landmarks: {}", ui.landmarks.join(", ")));
        if !ui.has_landmark("main") {
            findings.issue(
                IssueSeverity::Major,
                "No main landmark".into(),
                None,
                "Wrap the calculator in a main landmark",
            );
            findings.violates("WCAG 2.4.1", WcagLevel::A, "Bypass Blocks");
        }
        findings
    }
}

struct LiveRegions;

impl Checker for LiveRegions {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "screen-reader-live-regions",
            "Live Regions",
            "Calculation results announced to screen readers",
            AA,
            ScreenReader,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        if !ui.live_results_region {
            findings.issue(
                IssueSeverity::Major,
                "Calculation results are not announced".into(),
                Some("results panel"),
                "Render results inside an aria-live region",
            );
            findings.violates("WCAG 4.1.3", WcagLevel::AA, "Status Messages");
        }
        findings
    }
}

struct DescribedBy;

impl Checker for DescribedBy {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "aria-describedby",
            "ARIA Described By",
            "Input fields properly described by help text",
            AA,
            Aria,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        let mut described = 0;
        for field in &ui.fields {
            if field.help_text.as_deref().is_some_and(|h| !h.trim().is_empty()) {
                described += 1;
            } else {
                findings.issue(
                    IssueSeverity::Minor,
                    format!("Field {} has no help text to describe it", field.id),
                    Some(field.id.as_str()),
                    "Link help text to the input with aria-describedby",
                );
            }
        }
        findings.note(format!("{}/{} field(s) described", described, ui.fields.len()));
        findings
    }
}

struct InvalidState;

impl Checker for InvalidState {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "aria-invalid",
            "ARIA Invalid State",
            "Form validation errors properly marked",
            AA,
            Aria,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        if !ui.marks_invalid_fields {
            findings.issue(
                IssueSeverity::Major,
                "Invalid fields are not marked with aria-invalid".into(),
                Some("input fields"),
                "Set aria-invalid on fields that fail validation",
            );
            findings.violates("WCAG 3.3.1", WcagLevel::A, "Error Identification");
        }
        findings
    }
}

struct FocusVisible;

impl Checker for FocusVisible {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "focus-visible",
            "Focus Indicators",
            "Visible focus indicators on all interactive elements",
            AA,
            Focus,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        for field in ui.fields.iter().filter(|f| !f.focus_indicator) {
            findings.issue(
                IssueSeverity::Critical,
                format!("Focus indicator not visible on {}", field.id),
                Some(field.id.as_str()),
                "Add visible focus indicators with sufficient contrast",
            );
            findings.violates("WCAG 2.4.7", WcagLevel::AA, "Focus Visible");
        }
        findings
    }
}

fn check_contrast(ui: &UiSnapshot, large_text: bool, minimum: f64) -> Findings {
    let mut findings = Findings::default();
    let pairs: Vec<&ColorPair> = ui.colors.iter().filter(|c| c.large_text == large_text).collect();

    let lowest = pairs.iter().map(|c| c.ratio()).fold(f64::INFINITY, f64::min);
    if lowest.is_finite() {
        findings.note(format!("{} pair(s), lowest ratio {:.2}:1", pairs.len(), lowest));
    }

    for pair in pairs {
        let ratio = pair.ratio();
        if ratio < minimum {
            findings.issue(
                IssueSeverity::Critical,
                format!(
                    "{} ({} on {}) has contrast {:.2}:1, below {}:1",
                    pair.element, pair.foreground, pair.background, ratio, minimum
                ),
                Some(pair.element.as_str()),
                "Increase color contrast to meet WCAG AA standards",
            );
            findings.violates("WCAG 1.4.3", WcagLevel::AA, "Contrast (Minimum)");
        }
    }
    findings
}

struct ContrastNormal;

impl Checker for ContrastNormal {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "color-contrast-normal",
            "Color Contrast (Normal Text)",
            "Normal text meets 4.5:1 contrast ratio",
            AA,
            ColorContrast,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        check_contrast(ui, false, NORMAL_TEXT_CONTRAST)
    }
}

struct ContrastLarge;

impl Checker for ContrastLarge {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "color-contrast-large",
            "Color Contrast (Large Text)",
            "Large text meets 3:1 contrast ratio",
            AA,
            ColorContrast,
            Critical
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        check_contrast(ui, true, LARGE_TEXT_CONTRAST)
    }
}

struct NotColorOnly;

impl Checker for NotColorOnly {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "color-not-only-indicator",
            "Color Not Only Indicator",
            "Information not conveyed by color alone",
            A,
            ColorContrast,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        if !ui.non_color_error_indicators {
            findings.issue(
                IssueSeverity::Major,
                "Validation errors are conveyed by color alone".into(),
                Some("error states"),
                "Pair error colors with an icon or message text",
            );
            findings.violates("WCAG 1.4.1", WcagLevel::A, "Use of Color");
        }
        findings
    }
}

struct FormStructure;

impl Checker for FormStructure {
    fn spec(&self) -> &'static CheckSpec {
        spec!(
            "semantic-form-structure",
            "Semantic Form Structure",
            "Proper form element usage and structure",
            A,
            Semantic,
            Major
        )
    }

    fn check(&self, ui: &UiSnapshot) -> Findings {
        let mut findings = Findings::default();
        if !ui.fields.is_empty() && !ui.has_landmark("form") {
            findings.issue(
                IssueSeverity::Major,
                "Inputs are not grouped in a form element".into(),
                Some("form elements"),
                "Use proper semantic HTML elements",
            );
        }
        let mut seen = std::collections::BTreeSet::new();
        for field in &ui.fields {
            if !seen.insert(field.id.as_str()) {
                findings.issue(
                    IssueSeverity::Major,
                    format!("Duplicate field id {}", field.id),
                    Some(field.id.as_str()),
                    "Give every input a unique id so labels resolve",
                );
            }
        }
        if !findings.issues.is_empty() {
            findings.violates("WCAG 1.3.1", WcagLevel::A, "Info and Relationships");
        }
        findings
    }
}

static CATALOG: Lazy<Vec<Box<dyn Checker>>> = Lazy::new(|| {
    vec![
        Box::new(TabOrder),
        Box::new(InputAccess),
        Box::new(ButtonActivation),
        Box::new(Labels),
        Box::new(Headings),
        Box::new(Landmarks),
        Box::new(LiveRegions),
        Box::new(DescribedBy),
        Box::new(InvalidState),
        Box::new(FocusVisible),
        Box::new(ContrastNormal),
        Box::new(ContrastLarge),
        Box::new(NotColorOnly),
        Box::new(FormStructure),
    ]
});

/// The built-in check catalog, in execution order.
pub fn catalog() -> &'static [Box<dyn Checker>] {
    &CATALOG
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityResult {
    pub test_id: String,
    pub name: String,
    pub wcag_level: WcagLevel,
    pub kind: CheckKind,
    pub passed: bool,
    /// 0-100
    pub score: u32,
    pub issues: Vec<Issue>,
    pub wcag_violations: Vec<WcagViolation>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcagCompliance {
    pub level_a: bool,
    pub level_aa: bool,
    pub level_aaa: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityReport {
    pub calculator_id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: u32,
    pub wcag_compliance: WcagCompliance,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub success_rate: f64,
    pub critical_issues: usize,
    pub major_issues: usize,
    pub minor_issues: usize,
    pub rating: Rating,
    pub certification_status: CertificationStatus,
    pub results: Vec<AccessibilityResult>,
    pub recommendations: Vec<String>,
}

fn count(issues: &[Issue], severity: IssueSeverity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

/// `100 - 30 * critical - 15 * major - 5 * minor`, never below zero.
pub fn issue_score(issues: &[Issue]) -> u32 {
    let penalty = 30 * count(issues, IssueSeverity::Critical)
        + 15 * count(issues, IssueSeverity::Major)
        + 5 * count(issues, IssueSeverity::Minor);
    100u32.saturating_sub(u32::try_from(penalty).unwrap_or(u32::MAX))
}

fn evaluate(checker: &dyn Checker, ui: &UiSnapshot) -> AccessibilityResult {
    let spec = checker.spec();
    let findings = checker.check(ui);
    let critical = count(&findings.issues, IssueSeverity::Critical);
    let major = count(&findings.issues, IssueSeverity::Major);

    AccessibilityResult {
        test_id: spec.id.to_string(),
        name: spec.name.to_string(),
        wcag_level: spec.wcag_level,
        kind: spec.kind,
        passed: critical == 0 && (spec.severity != IssueSeverity::Major || major == 0),
        score: issue_score(&findings.issues),
        issues: findings.issues,
        wcag_violations: findings.violations,
        evidence: findings.evidence,
    }
}

fn wcag_compliance(results: &[AccessibilityResult]) -> WcagCompliance {
    let level_passes = |level: WcagLevel| results.iter().filter(|r| r.wcag_level == level).all(|r| r.passed);
    let level_a = level_passes(WcagLevel::A);
    let level_aa = level_a && level_passes(WcagLevel::AA);
    let level_aaa = level_aa && level_passes(WcagLevel::AAA);
    WcagCompliance {
        level_a,
        level_aa,
        level_aaa,
    }
}

fn overall_score(results: &[AccessibilityResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let total: u32 = results.iter().map(|r| r.score).sum();
    (f64::from(total) / results.len() as f64).round() as u32
}

fn accessibility_recommendations(results: &[AccessibilityResult], critical: usize, major: usize, score: u32) -> Vec<String> {
    let mut out = Vec::new();
    if critical > 0 {
        out.push(format!("Address {} critical accessibility issue(s) immediately", critical));
    }
    if major > 0 {
        out.push(format!("Fix {} major accessibility issue(s) for better compliance", major));
    }

    let failing = |kind: CheckKind| results.iter().any(|r| r.kind == kind && !r.passed);
    if failing(CheckKind::Keyboard) {
        out.push("Improve keyboard navigation and focus management".to_string());
    }
    if failing(CheckKind::ColorContrast) {
        out.push("Increase color contrast to meet WCAG standards".to_string());
    }
    if failing(CheckKind::ScreenReader) {
        out.push("Improve screen reader compatibility with proper labels and ARIA".to_string());
    }

    if score >= 90 {
        out.push("Excellent accessibility - meets high standards".to_string());
    } else if score < 70 {
        out.push("Significant accessibility improvements needed".to_string());
    }
    out
}

impl EngineContext {
    /// Run the built-in catalog against `ui`.
    pub fn run_accessibility_tests(&self, ui: &UiSnapshot) -> AccessibilityReport {
        let checkers: Vec<&dyn Checker> = catalog().iter().map(|c| c.as_ref()).collect();
        self.run_accessibility_checks(ui, &checkers)
    }

    /// Run an arbitrary set of checkers against `ui`.
    pub fn run_accessibility_checks(&self, ui: &UiSnapshot, checkers: &[&dyn Checker]) -> AccessibilityReport {
        let results: Vec<AccessibilityResult> = checkers
            .iter()
            .map(|checker| {
                let result = evaluate(*checker, ui);
                debug!(
                    calculator_id = %ui.calculator_id,
                    test_id = %result.test_id,
                    passed = result.passed,
                    issues = result.issues.len(),
                    "accessibility check"
                );
                result
            })
            .collect();

        let all_issues = || results.iter().flat_map(|r| r.issues.iter());
        let tally = |severity| all_issues().filter(|i| i.severity == severity).count();
        let (critical, major, minor) = (
            tally(IssueSeverity::Critical),
            tally(IssueSeverity::Major),
            tally(IssueSeverity::Minor),
        );

        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let rate = success_rate(passed, total);
        let score = overall_score(&results);
        // Rated on the mean issue score, not the success rate.
        let rating = Rating::from_pass_rate(f64::from(score), major + minor, &self.config().rating);
        let certification_status = if critical > 0 {
            CertificationStatus::Failed
        } else {
            rating.certification()
        };

        info!(
            calculator_id = %ui.calculator_id,
            score,
            success_rate = rate,
            %rating,
            "accessibility tests finished"
        );

        AccessibilityReport {
            calculator_id: ui.calculator_id.clone(),
            timestamp: Utc::now(),
            overall_score: score,
            wcag_compliance: wcag_compliance(&results),
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            success_rate: rate,
            critical_issues: critical,
            major_issues: major,
            minor_issues: minor,
            rating,
            certification_status,
            recommendations: accessibility_recommendations(&results, critical, major, score),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{Calculator, FieldDescriptor};
    use crate::validation::ContextualHelp;
    use crate::values::FieldMap;

    fn field(id: &str) -> UiField {
        UiField {
            id: id.into(),
            label: Some(id.to_uppercase()),
            help_text: Some(format!("Enter the {}", id)),
            tab_index: 0,
            focus_indicator: true,
            kind: InputKind::Number,
        }
    }

    fn clean_form() -> UiSnapshot {
        UiSnapshot::new("sum").with_field(field("a")).with_field(field("b"))
    }

    fn result<'a>(report: &'a AccessibilityReport, id: &str) -> &'a AccessibilityResult {
        report.results.iter().find(|r| r.test_id == id).unwrap()
    }

    #[test]
    fn test_contrast_ratio() {
        let white = Rgb(255, 255, 255);
        assert!((contrast_ratio(white, white) - 1.0).abs() < 1e-9);
        assert!((contrast_ratio(Rgb(0, 0, 0), white) - 21.0).abs() < 1e-9);
        // #777777 on white is the classic just-failing grey
        let grey = contrast_ratio(Rgb::from_hex("#777777").unwrap(), white);
        assert!(grey < 4.5 && grey > 4.4);
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgb::from_hex("#1d4ed8"), Some(Rgb(0x1d, 0x4e, 0xd8)));
        assert_eq!(Rgb::from_hex("ffffff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::from_hex("#fff"), None);
        assert_eq!(Rgb::from_hex("#gggggg"), None);
        assert_eq!(Rgb(0x1d, 0x4e, 0xd8).to_string(), "#1d4ed8");
    }

    #[test]
    fn test_default_theme_passes_contrast() {
        for pair in &UiSnapshot::new("x").colors {
            let minimum = if pair.large_text { LARGE_TEXT_CONTRAST } else { NORMAL_TEXT_CONTRAST };
            assert!(pair.ratio() >= minimum, "{} is {:.2}", pair.element, pair.ratio());
        }
    }

    #[test]
    fn test_clean_form_is_excellent() {
        let report = EngineContext::default().run_accessibility_tests(&clean_form());
        assert_eq!(report.total_tests, 14);
        assert_eq!(report.passed_tests, 14);
        assert_eq!(report.overall_score, 100);
        assert_eq!(report.wcag_compliance, WcagCompliance { level_a: true, level_aa: true, level_aaa: true });
        assert_eq!(report.rating, Rating::Excellent);
        assert_eq!(report.certification_status, CertificationStatus::Passed);
        assert_eq!(report.recommendations, vec!["Excellent accessibility - meets high standards"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["successRate"].as_f64(), Some(100.0));
        assert_eq!(json["overallScore"].as_u64(), Some(100));
    }

    #[test]
    fn test_success_rate_counts_passing_checks() {
        let ctx = EngineContext::default();
        let mut ui = clean_form();
        ui.fields[1].label = None;
        let report = ctx.run_accessibility_tests(&ui);
        assert!(report.failed_tests > 0);
        let expected = report.passed_tests as f64 / report.total_tests as f64 * 100.0;
        assert!((report.success_rate - expected).abs() < 1e-9);

        let empty = ctx.run_accessibility_checks(&ui, &[]);
        assert_eq!(empty.total_tests, 0);
        assert_eq!(empty.success_rate, 0.0);
    }

    #[test]
    fn test_missing_label_is_critical() {
        let mut ui = clean_form();
        ui.fields[1].label = Some("  ".into());
        let report = EngineContext::default().run_accessibility_tests(&ui);

        let labels = result(&report, "screen-reader-labels");
        assert!(!labels.passed);
        assert_eq!(labels.score, 70);
        assert_eq!(labels.issues[0].element.as_deref(), Some("b"));
        assert_eq!(labels.wcag_violations[0].rule, "WCAG 4.1.2");

        assert!(!report.wcag_compliance.level_a);
        assert!(!report.wcag_compliance.level_aa);
        assert_eq!(report.certification_status, CertificationStatus::Failed);
        assert!(report.recommendations.contains(&"Address 1 critical accessibility issue(s) immediately".to_string()));
        assert!(report
            .recommendations
            .contains(&"Improve screen reader compatibility with proper labels and ARIA".to_string()));
    }

    #[test]
    fn test_minor_issues_do_not_fail_major_check() {
        let mut ui = clean_form();
        ui.fields[0].help_text = None;
        let report = EngineContext::default().run_accessibility_tests(&ui);
        let described = result(&report, "aria-describedby");
        assert!(described.passed);
        assert_eq!(described.score, 95);
        assert_eq!(report.minor_issues, 1);
        assert!(report.wcag_compliance.level_aa);
    }

    #[test]
    fn test_aa_failure_keeps_level_a() {
        let mut ui = clean_form();
        ui.live_results_region = false;
        let report = EngineContext::default().run_accessibility_tests(&ui);
        assert!(!result(&report, "screen-reader-live-regions").passed);
        assert!(report.wcag_compliance.level_a);
        assert!(!report.wcag_compliance.level_aa);
        assert!(!report.wcag_compliance.level_aaa);
    }

    #[test]
    fn test_tab_order_and_low_contrast() {
        let mut ui = clean_form();
        ui.fields[0].tab_index = 2;
        ui.fields[1].tab_index = 1;
        ui.colors.push(ColorPair::new("placeholder", Rgb::from_hex("#9ca3af").unwrap(), Rgb(255, 255, 255)));
        let report = EngineContext::default().run_accessibility_tests(&ui);

        let order = result(&report, "keyboard-tab-order");
        assert!(!order.passed);
        assert!(order.issues[0].description.contains("b is reached before a"));

        let contrast = result(&report, "color-contrast-normal");
        assert!(!contrast.passed);
        assert_eq!(contrast.issues[0].element.as_deref(), Some("placeholder"));
        assert!(result(&report, "color-contrast-large").passed);

        assert!(report.recommendations.contains(&"Improve keyboard navigation and focus management".to_string()));
        assert!(report.recommendations.contains(&"Increase color contrast to meet WCAG standards".to_string()));
    }

    #[test]
    fn test_heading_skips() {
        let mut ui = clean_form();
        ui.headings = vec![2, 4];
        let findings = Headings.check(&ui);
        assert_eq!(findings.issues.len(), 2);
        assert_eq!(findings.violations.len(), 1);
    }

    #[test]
    fn test_score_floor() {
        let issues: Vec<Issue> = (0..5)
            .map(|i| Issue {
                severity: IssueSeverity::Critical,
                description: format!("issue {}", i),
                element: None,
                recommendation: String::new(),
            })
            .collect();
        assert_eq!(issue_score(&issues), 0);
        assert_eq!(issue_score(&[]), 100);
    }

    #[test]
    fn test_catalog_ids_unique() {
        let mut ids: Vec<_> = catalog().iter().map(|c| c.spec().id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog().len());
    }

    #[test]
    fn test_deterministic() {
        let ctx = EngineContext::default();
        let mut ui = clean_form();
        ui.marks_invalid_fields = false;
        let a = ctx.run_accessibility_tests(&ui);
        let b = ctx.run_accessibility_tests(&ui);
        assert_eq!(a.results, b.results);
        assert_eq!(a.recommendations, b.recommendations);
    }

    #[test]
    fn test_snapshot_from_calculator() {
        let mut ctx = EngineContext::default();
        ctx.register_calculator(
            Calculator::new("sum", |_| Ok(FieldMap::new()))
                .with_field(FieldDescriptor::new("a", "First addend").with_help("Any number"))
                .with_field(FieldDescriptor::new("b", "Second addend")),
        );
        ctx.register_help("sum", ContextualHelp::new("b", "Second addend", "The number added to the first"));

        let ui = ctx.ui_snapshot("sum").unwrap();
        assert_eq!(ui.fields.len(), 2);
        assert_eq!(ui.fields[0].help_text.as_deref(), Some("Any number"));
        assert_eq!(ui.fields[1].help_text.as_deref(), Some("The number added to the first"));
        assert_eq!(ctx.run_accessibility_tests(&ui).passed_tests, 14);

        assert_eq!(ctx.ui_snapshot("nope").unwrap_err().error_code(), "CALCULATOR_NOT_REGISTERED");
    }

    #[test]
    fn test_snapshot_json_defaults() {
        let ui: UiSnapshot = serde_json::from_str(
            r#"{
                "calculatorId": "bmi",
                "fields": [{ "id": "weight", "label": "Weight" }],
                "colors": [{ "element": "body", "foreground": [0, 0, 0], "background": [255, 255, 255] }],
                "headings": [1],
                "landmarks": ["main", "form"],
                "liveResultsRegion": true,
                "calculateButtonKeyboard": true,
                "marksInvalidFields": true,
                "nonColorErrorIndicators": true
            }"#,
        )
        .unwrap();
        assert!(ui.fields[0].focus_indicator);
        assert_eq!(ui.fields[0].tab_index, 0);
        assert!(!ui.colors[0].large_text);
    }
}
