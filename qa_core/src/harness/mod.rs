//! # Harnesses
//!
//! Everything that measures a calculator beyond "is the answer right":
//! latency and throughput, accessibility of its form, and the batch runner
//! that combines all of them into a platform report.
//!
//! ## Modules
//!
//! - [`executor`] - Worker thread with per-call timeout and cancellation
//! - [`stats`] - Latency statistics and percentiles
//! - [`performance`] - Performance catalog and report
//! - [`accessibility`] - UI snapshot, checkers and WCAG report
//! - [`comprehensive`] - Multi-calculator runner and platform statistics

pub mod accessibility;
pub mod comprehensive;
pub mod executor;
pub mod performance;
pub mod stats;

pub use accessibility::{AccessibilityReport, Checker, UiSnapshot};
pub use comprehensive::{ComprehensiveOptions, ComprehensiveReport};
pub use executor::{BoundedExecutor, CancellationToken};
pub use performance::PerformanceReport;
pub use stats::{percentile, LatencyStats};
