//! Markdown rendering of an accuracy report.

use crate::benchmark::ValidationReport;
use crate::report::CertificationStatus;

/// Render `report` as a markdown document.
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut out = String::new();

    out.push_str("# Calculator Validation Report\n");
    out.push('\n');
    out.push_str(&format!("**Calculator:** {}\n", report.calculator_id));
    out.push_str(&format!("**Date:** {}\n", report.timestamp.to_rfc3339()));
    out.push_str(&format!(
        "**Certification Status:** {}\n",
        report.certification_status.as_str().to_uppercase()
    ));

    out.push('\n');
    out.push_str("## Summary\n");
    out.push_str(&format!("- **Total Tests:** {}\n", report.total_tests));
    out.push_str(&format!("- **Passed:** {}\n", report.passed_tests));
    out.push_str(&format!("- **Failed:** {}\n", report.failed_tests));
    if report.skipped_tests > 0 {
        out.push_str(&format!("- **Skipped:** {}\n", report.skipped_tests));
    }
    out.push_str(&format!("- **Success Rate:** {:.1}%\n", report.success_rate));
    out.push_str(&format!("- **Average Execution Time:** {:.2}ms\n", report.average_execution_time_ms));

    out.push('\n');
    out.push_str("## Industry Benchmark Results\n");
    for bench in &report.benchmarks {
        let variance = bench.variance.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));
        out.push_str(&format!(
            "- **{}** ({}): {} (variance: {})\n",
            bench.test_id,
            bench.source,
            if bench.passed { "PASS" } else { "FAIL" },
            variance
        ));
    }

    out.push('\n');
    out.push_str("## Failed Tests\n");
    for result in report.results.iter().filter(|r| !r.passed) {
        let reason = result.error.as_deref().unwrap_or("Accuracy outside tolerance");
        out.push_str(&format!("- **{}**: {}\n", result.test_id, reason));
    }

    out.push('\n');
    out.push_str("## Recommendations\n");
    for rec in &report.recommendations {
        out.push_str(&format!("- {}\n", rec));
    }

    out.push('\n');
    out.push_str("## Certification\n");
    let verdict = match report.certification_status {
        CertificationStatus::Passed => {
            "This calculator meets professional industry standards and is certified for production use."
        }
        CertificationStatus::Failed => {
            "This calculator does not meet minimum standards and requires significant improvements."
        }
        CertificationStatus::Pending => "This calculator requires additional validation before certification.",
    };
    out.push_str(verdict);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkResult, TestResult, TestStatus};
    use crate::values::FieldMap;
    use chrono::Utc;

    fn report(status: CertificationStatus) -> ValidationReport {
        ValidationReport {
            calculator_id: "mortgage-calculator".into(),
            suite_name: "Mortgage".into(),
            timestamp: Utc::now(),
            total_tests: 2,
            passed_tests: 1,
            failed_tests: 1,
            skipped_tests: 0,
            success_rate: 50.0,
            average_execution_time_ms: 1.234,
            benchmark_success_rate: 0.0,
            results: vec![TestResult {
                test_id: "jumbo-loan".into(),
                status: TestStatus::Errored,
                passed: false,
                comparisons: Vec::new(),
                actual_outputs: FieldMap::new(),
                execution_time_ms: 1.0,
                error: Some("Missing required input: loanTerm".into()),
                warnings: Vec::new(),
            }],
            benchmarks: vec![BenchmarkResult {
                test_id: "jumbo-loan".into(),
                source: "CFPB Calculator".into(),
                passed: false,
                variance: None,
            }],
            certification_status: status,
            recommendations: vec!["Address 1 failing test(s) to improve accuracy".into()],
        }
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&report(CertificationStatus::Failed));
        assert!(md.starts_with("# Calculator Validation Report"));
        assert!(md.contains("**Certification Status:** FAILED\n\n## Summary\n- **Total Tests:** 2\n"));
        assert!(md.contains("- **Success Rate:** 50.0%"));
        assert!(md.contains("- **Average Execution Time:** 1.23ms"));
        assert!(md.contains("- **jumbo-loan** (CFPB Calculator): FAIL (variance: n/a)"));
        assert!(md.contains("- **jumbo-loan**: Missing required input: loanTerm"));
        assert!(md.contains("- Address 1 failing test(s) to improve accuracy"));
        assert!(md.ends_with("requires significant improvements."));
    }

    #[test]
    fn test_pending_verdict() {
        let md = render_markdown(&report(CertificationStatus::Pending));
        assert!(md.ends_with("additional validation before certification."));
    }
}
