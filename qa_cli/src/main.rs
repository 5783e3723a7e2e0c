//! # qa_cli
//!
//! Batch runner for the calculator validation engine over a set of sample
//! calculators.
//!
//! ## Commands
//!
//! - `list` - Registered calculators and what is attached to them
//! - `validate` - Validate a full input set
//! - `field` - Validate one field while the user is typing
//! - `test` - Run the accuracy suite, optionally exporting the report
//! - `perf` - Run the performance catalog
//! - `a11y` - Run the accessibility catalog against a form snapshot
//! - `all` - Comprehensive run over every calculator
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust.

mod samples;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use qa_core::harness::accessibility::UiSnapshot;
use qa_core::harness::comprehensive::ComprehensiveOptions;
use qa_core::report::export::save_report;
use qa_core::report::markdown::render_markdown;
use qa_core::{EngineConfig, EngineContext, FieldMap, QaError, QaResult};

/// Calculator validation, benchmark and certification runner
#[derive(Parser)]
#[command(name = "qa_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print reports as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered calculators
    List,

    /// Validate a full input set
    ///
    /// Example:
    ///   qa_cli validate mortgage-calculator --inputs '{"homePrice": 400000, "downPayment": 20000}'
    Validate {
        #[arg(value_name = "CALCULATOR")]
        calculator: String,

        /// Input values as a JSON object
        #[arg(short, long, default_value = "{}")]
        inputs: String,
    },

    /// Validate a single field value
    Field {
        #[arg(value_name = "CALCULATOR")]
        calculator: String,

        #[arg(value_name = "FIELD")]
        field: String,

        /// New value; parsed as JSON, otherwise taken as a string
        #[arg(value_name = "VALUE")]
        value: String,

        /// The rest of the form as a JSON object
        #[arg(short, long, default_value = "{}")]
        inputs: String,
    },

    /// Run the accuracy test suite
    Test {
        #[arg(value_name = "CALCULATOR")]
        calculator: String,

        /// Write the export document to this path
        #[arg(short, long, value_name = "PATH")]
        export: Option<PathBuf>,

        /// Print the markdown report
        #[arg(long)]
        markdown: bool,
    },

    /// Run the performance catalog
    Perf {
        #[arg(value_name = "CALCULATOR")]
        calculator: String,
    },

    /// Run the accessibility catalog
    A11y {
        #[arg(value_name = "CALCULATOR")]
        calculator: String,

        /// UI snapshot (JSON); defaults to the calculator's generated form
        #[arg(short, long, value_name = "PATH")]
        snapshot: Option<PathBuf>,
    },

    /// Run every harness for every calculator
    All {
        /// Skip the performance catalog
        #[arg(long)]
        skip_perf: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {}", err.error_code(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> QaResult<()> {
    let config = match &cli.config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading engine config");
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    let ctx = samples::sample_context(EngineContext::new(config))?;
    let json = cli.json;

    match cli.command {
        Commands::List => list(&ctx),
        Commands::Validate { calculator, inputs } => {
            let verdict = ctx.validate(&calculator, &parse_inputs(&inputs)?);
            print_json(&verdict)
        }
        Commands::Field {
            calculator,
            field,
            value,
            inputs,
        } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            let feedback = ctx.validate_field(&calculator, &field, &value, &parse_inputs(&inputs)?)?;
            print_json(&feedback)
        }
        Commands::Test {
            calculator,
            export,
            markdown,
        } => {
            let report = ctx.run_tests(&calculator)?;
            if let Some(path) = export {
                save_report(&report, &path)?;
            }
            if markdown {
                println!("{}", render_markdown(&report));
                Ok(())
            } else if json {
                print_json(&report.export())
            } else {
                banner(&format!("ACCURACY - {}", report.calculator_id));
                println!("  Tests:         {} passed / {} run", report.passed_tests, report.total_tests);
                println!("  Success rate:  {:.1}%", report.success_rate);
                println!("  Benchmarks:    {:.1}%", report.benchmark_success_rate);
                println!("  Certification: {}", report.certification_status.as_str().to_uppercase());
                print_list("Recommendations", &report.recommendations);
                Ok(())
            }
        }
        Commands::Perf { calculator } => {
            let report = ctx.run_performance_tests(&calculator)?;
            if json {
                return print_json(&report);
            }
            banner(&format!("PERFORMANCE - {}", report.calculator_id));
            for test in &report.tests {
                println!(
                    "  {:<28} {}  measured {:>10.3}  threshold {:>10.3}",
                    test.id,
                    if test.passed { "PASS" } else { "FAIL" },
                    test.measured,
                    test.threshold
                );
            }
            println!();
            println!("  Rating:        {}", report.rating);
            println!("  Certification: {}", report.certification_status.as_str().to_uppercase());
            print_list("Recommendations", &report.recommendations);
            Ok(())
        }
        Commands::A11y { calculator, snapshot } => {
            let ui = match snapshot {
                Some(path) => load_snapshot(&path)?,
                None => ctx.ui_snapshot(&calculator)?,
            };
            let report = ctx.run_accessibility_tests(&ui);
            if json {
                return print_json(&report);
            }
            banner(&format!("ACCESSIBILITY - {}", report.calculator_id));
            for result in &report.results {
                println!(
                    "  {:<28} {}  {:>3}/100",
                    result.test_id,
                    if result.passed { "PASS" } else { "FAIL" },
                    result.score
                );
            }
            println!();
            println!("  Overall score: {}/100", report.overall_score);
            println!(
                "  WCAG:          A {}  AA {}  AAA {}",
                yes_no(report.wcag_compliance.level_a),
                yes_no(report.wcag_compliance.level_aa),
                yes_no(report.wcag_compliance.level_aaa)
            );
            println!("  Rating:        {}", report.rating);
            print_list("Recommendations", &report.recommendations);
            Ok(())
        }
        Commands::All { skip_perf } => {
            let options = ComprehensiveOptions {
                performance: !skip_perf,
                ..ComprehensiveOptions::default()
            };
            let report = ctx.run_comprehensive(&ctx.calculator_ids(), &options)?;
            if json {
                return print_json(&report);
            }
            banner("PLATFORM REPORT");
            for outcome in &report.calculators {
                println!(
                    "  {:<24} score {:>3}  {}",
                    outcome.calculator_id,
                    outcome.overall_score,
                    outcome.certification.as_str().to_uppercase()
                );
            }
            let stats = &report.statistics;
            println!();
            println!("  Average accuracy:      {:.1}%", stats.average_accuracy_score);
            println!("  Average performance:   {:.1}%", stats.average_performance_score);
            println!("  Average accessibility: {:.1}", stats.average_accessibility_score);
            println!("  Certification rate:    {:.1}%", stats.certification_rate);
            println!(
                "  Industry:              accuracy {}, performance {}, accessibility {}",
                report.industry_comparison.accuracy.as_str().to_uppercase(),
                report.industry_comparison.performance.as_str().to_uppercase(),
                report.industry_comparison.accessibility.as_str().to_uppercase()
            );
            print_list("Recommendations", &report.recommendations);
            Ok(())
        }
    }
}

fn list(ctx: &EngineContext) -> QaResult<()> {
    banner("CALCULATORS");
    for id in ctx.calculator_ids() {
        let rules = ctx.rules_for(&id).map_or(0, <[_]>::len);
        let cases = ctx.test_suite(&id).map_or(0, |s| s.test_cases.len());
        let help = ctx.help_entries(&id).count();
        println!("  {:<24} {:>2} rules  {:>2} test cases  {:>2} help entries", id, rules, cases, help);
    }
    Ok(())
}

fn parse_inputs(raw: &str) -> QaResult<FieldMap> {
    serde_json::from_str(raw).map_err(|e| QaError::config("inputs", format!("expected a JSON object: {}", e)))
}

fn load_snapshot(path: &Path) -> QaResult<UiSnapshot> {
    let contents = fs::read_to_string(path)
        .map_err(|e| QaError::file_error("read", path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}

fn print_json<T: Serialize>(value: &T) -> QaResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn banner(title: &str) {
    println!("═══════════════════════════════════════");
    println!("  {}", title);
    println!("═══════════════════════════════════════");
    println!();
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn yes_no(ok: bool) -> &'static str {
    if ok {
        "yes"
    } else {
        "no"
    }
}
