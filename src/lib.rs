//! rf-harness - run browser test suites and make sense of what they leave behind.
//!
//! This crate provides:
//! - A runner that invokes the test engine into a fresh timestamped run folder
//! - A locator for the most recent run under a results root
//! - A parser for the engine's `output.xml` report (counts and failing tests)
//! - A collator that gathers screenshots from every run into one browsable tree
//!
//! # Example
//!
//! ```rust,no_run
//! use rf_harness::{latest_run, parse_results};
//! use std::path::Path;
//!
//! let run = latest_run(Path::new("results"), "test_run").unwrap();
//! let summary = parse_results(&run.output_path("output.xml")).unwrap();
//! println!("{} passed, {} failed", summary.passed, summary.failed);
//! ```

pub mod collate;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod runs;

// Re-export error types
pub use error::{HarnessError, HarnessResult};

// Re-export run folder management
pub use runs::{ResultRun, RunArtifacts, create_run, latest_run, list_runs, prune_runs};

// Re-export report parsing
pub use report::{
    ParseError, ResultsReader, ResultsSummary, RobotXmlReader, TestFailure, TestStatus,
    parse_results, parse_results_bytes,
};

// Re-export collation
pub use collate::{CollateConfig, CollationReport, OrganizedIndex, collate};

// Re-export the runner
pub use runner::{
    Browser, EngineCommand, Invocation, ProcessInvoker, RunConfig, RunOutcome, Suite,
    SystemInvoker, run_suite,
};
