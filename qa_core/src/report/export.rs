//! Report export document.
//!
//! The document is the interchange format consumed by external validators.
//! Its field names are fixed:
//!
//! ```json
//! {
//!   "calculatorId": "sum",
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "summary": { "totalTests": 1, "passedTests": 1, "failedTests": 0,
//!                "successRate": 100.0, "certificationStatus": "passed" },
//!   "testResults": [ { "testId": "...", "passed": true, "executionTimeMs": 0.1,
//!                      "comparisons": [], "error": null } ],
//!   "benchmarks": [ { "testId": "...", "source": "...", "passed": true, "variance": 0.2 } ],
//!   "recommendations": []
//! }
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, warn};

use crate::benchmark::{BenchmarkResult, FieldComparison, ValidationReport};
use crate::errors::{QaError, QaResult};
use crate::report::CertificationStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub calculator_id: String,
    #[serde(serialize_with = "rfc3339_utc")]
    pub timestamp: DateTime<Utc>,
    pub summary: ExportSummary,
    pub test_results: Vec<ExportedTestResult>,
    pub benchmarks: Vec<BenchmarkResult>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub success_rate: f64,
    pub certification_status: CertificationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedTestResult {
    pub test_id: String,
    pub passed: bool,
    pub execution_time_ms: f64,
    pub comparisons: Vec<FieldComparison>,
    pub error: Option<String>,
}

fn rfc3339_utc<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl From<&ValidationReport> for ExportDocument {
    fn from(report: &ValidationReport) -> Self {
        ExportDocument {
            calculator_id: report.calculator_id.clone(),
            timestamp: report.timestamp,
            summary: ExportSummary {
                total_tests: report.total_tests,
                passed_tests: report.passed_tests,
                failed_tests: report.failed_tests,
                success_rate: report.success_rate,
                certification_status: report.certification_status,
            },
            test_results: report
                .results
                .iter()
                .map(|r| ExportedTestResult {
                    test_id: r.test_id.clone(),
                    passed: r.passed,
                    execution_time_ms: r.execution_time_ms,
                    comparisons: r.comparisons.clone(),
                    error: r.error.clone(),
                })
                .collect(),
            benchmarks: report.benchmarks.clone(),
            recommendations: report.recommendations.clone(),
        }
    }
}

impl ValidationReport {
    /// Export document for this report.
    pub fn export(&self) -> ExportDocument {
        ExportDocument::from(self)
    }

    /// Export document as pretty-printed JSON.
    pub fn export_json(&self) -> QaResult<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }
}

/// Write the export document for `report` to `path`.
///
/// The JSON is written to a sibling `.tmp` file, synced, then renamed over
/// `path`, so readers never observe a partial document.
///
/// ```rust,no_run
/// use qa_core::context::EngineContext;
/// use qa_core::report::export::save_report;
/// use std::path::Path;
///
/// let ctx = EngineContext::default();
/// let report = ctx.run_tests("mortgage-calculator")?;
/// save_report(&report, Path::new("mortgage-report.json"))?;
/// # Ok::<(), qa_core::errors::QaError>(())
/// ```
pub fn save_report(report: &ValidationReport, path: &Path) -> QaResult<()> {
    let json = report.export_json()?;
    let tmp_path = path.with_extension("json.tmp");

    let written = write_synced(&tmp_path, json.as_bytes()).and_then(|()| {
        fs::rename(&tmp_path, path)
            .map_err(|e| QaError::file_error("rename to final", path.display().to_string(), e.to_string()))
    });
    if let Err(err) = written {
        remove_temp(&tmp_path);
        return Err(err);
    }

    info!(calculator_id = %report.calculator_id, path = %path.display(), "exported report");
    Ok(())
}

fn write_synced(tmp_path: &Path, bytes: &[u8]) -> QaResult<()> {
    let mut tmp_file = File::create(tmp_path)
        .map_err(|e| QaError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(bytes)
        .map_err(|e| QaError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| QaError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))
}

fn remove_temp(tmp_path: &Path) {
    match fs::remove_file(tmp_path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            warn!(path = %tmp_path.display(), error = %e, "could not remove temp file");
        }
        _ => {}
    }
}

/// Read back an exported document.
pub fn load_report_document(path: &Path) -> QaResult<ExportDocument> {
    let contents = fs::read_to_string(path)
        .map_err(|e| QaError::file_error("read", path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}
