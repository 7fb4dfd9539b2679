use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

use rf_harness::collate::{CollateConfig, collate};
use rf_harness::config::{self, DEFAULT_RESULTS_DIR, DEFAULT_SCREENSHOTS_DIR, DEFAULT_TESTS_DIR};
use rf_harness::report::{ResultsReader, ResultsSummary, RobotXmlReader};
use rf_harness::runner::{Browser, RunConfig, Suite, SystemInvoker, run_suite};
use rf_harness::runs::{self, ResultRun, RunArtifacts};
use rf_harness::{HarnessError, HarnessResult};

/// rf-harness - run browser test suites, summarize reports, organize screenshots
#[derive(Parser, Debug)]
#[command(
    name = "rf-harness",
    about = "Run browser test suites, summarize their reports, and organize their screenshots",
    after_help = "ENVIRONMENT VARIABLES:\n\
        RF_HARNESS_RESULTS_DIR        Root holding one folder per run\n\
        RF_HARNESS_SCREENSHOTS_DIR    Root for organized screenshots\n\
        RF_HARNESS_TESTS_DIR          Root of the suite sources\n\
        RF_HARNESS_SCRATCH_RUN        Run folder reserved for manual runs\n\
        RF_HARNESS_OUTPUT_FILE        Report file name inside a run folder\n\
        RF_HARNESS_ROBOT_BIN          Engine binary for serial runs\n\
        RF_HARNESS_PABOT_BIN          Engine binary for parallel runs\n\
        RF_HARNESS_IMAGE_EXTENSIONS   Comma-separated screenshot extensions\n\
        RUST_LOG                      Log filter (overrides --verbose)"
)]
struct Args {
    /// Root holding one folder per run
    #[arg(long, global = true, env = "RF_HARNESS_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Root under which organized screenshots are written
    #[arg(long, global = true, env = "RF_HARNESS_SCREENSHOTS_DIR", default_value = DEFAULT_SCREENSHOTS_DIR)]
    screenshots_dir: PathBuf,

    /// Debug logging (and trace-level engine logs for `run`)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a test suite into a new timestamped run folder
    Run {
        /// Suite subset to execute
        #[arg(short, long, value_enum, default_value = "all")]
        suite: Suite,

        /// Only run tests carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Browser to drive
        #[arg(short, long, value_enum, default_value = "chrome")]
        browser: Browser,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Number of engine processes (more than one uses the parallel engine)
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
        parallel: u16,

        /// Root of the suite sources
        #[arg(long, env = "RF_HARNESS_TESTS_DIR", default_value = DEFAULT_TESTS_DIR)]
        tests_dir: PathBuf,

        /// Organize screenshots after the run
        #[arg(long)]
        collate: bool,
    },

    /// Summarize the latest (or a named) run's report
    Summary {
        /// Run folder name (default: the latest run)
        #[arg(short, long)]
        run: Option<String>,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy screenshots from every run into an organized tree with an index page
    Collate,

    /// List run folders, oldest first
    Runs {
        /// Output the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete run folders older than the given age
    Prune {
        /// Maximum age in days
        #[arg(long)]
        max_age_days: u64,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the selected command. `Ok(false)` means "report failure via exit code".
fn execute(args: Args) -> anyhow::Result<bool> {
    let settings = config::get();
    let scratch = settings.paths.scratch_run.as_str();
    let output_file = settings.paths.output_file.as_str();

    match args.command {
        Some(Commands::Run {
            suite,
            tag,
            browser,
            headless,
            parallel,
            tests_dir,
            collate: collate_after,
        }) => {
            let config = RunConfig::new(suite, browser)
                .tag(tag)
                .headless(headless)
                .parallel(parallel)
                .verbose(args.verbose)
                .tests_root(tests_dir)
                .results_root(&args.results_dir);

            let outcome = match run_suite(&config, &SystemInvoker) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{}", e);
                    return Ok(false);
                }
            };

            // Whatever the engine wrote is still worth summarizing
            report_step(print_run_summary(&outcome.run, output_file, false));
            if collate_after {
                report_step(collate_screenshots(&args.results_dir, &args.screenshots_dir));
            }

            match outcome.into_result() {
                Ok(_) => Ok(true),
                Err(e) => {
                    if let HarnessError::ExternalProcess { diagnostics, .. } = &e {
                        if !diagnostics.trim().is_empty() {
                            eprintln!("\nEngine diagnostics:\n{}", diagnostics.trim_end());
                        }
                    }
                    error!("{}", e);
                    Ok(false)
                }
            }
        }

        Some(Commands::Summary { run, json }) => {
            let located = match run {
                Some(name) => runs::find_run(&args.results_dir, &name),
                None => runs::latest_run(&args.results_dir, scratch),
            };
            let run = match located {
                Ok(run) => run,
                Err(e) if e.is_recoverable() => {
                    eprintln!("{}", e);
                    return Ok(true);
                }
                Err(e) => return Err(e.into()),
            };
            Ok(report_step(print_run_summary(&run, output_file, json)))
        }

        Some(Commands::Collate) => Ok(report_step(collate_screenshots(
            &args.results_dir,
            &args.screenshots_dir,
        ))),

        Some(Commands::Runs { json }) => {
            let all = match runs::list_runs(&args.results_dir, scratch) {
                Ok(all) => all,
                Err(e) if e.is_recoverable() => {
                    eprintln!("{}", e);
                    return Ok(true);
                }
                Err(e) => return Err(e.into()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                println!("No runs found in {}", args.results_dir.display());
            } else {
                for run in &all {
                    let has_report = run.output_path(output_file).is_file();
                    println!("{}{}", run.name, if has_report { "" } else { "  (no report)" });
                }
            }
            Ok(true)
        }

        Some(Commands::Prune { max_age_days }) => {
            let max_age = Duration::from_secs(max_age_days.saturating_mul(24 * 60 * 60));
            let removed = runs::prune_runs(&args.results_dir, scratch, max_age)?;
            println!("Removed {} run folder(s)", removed);
            Ok(true)
        }

        None => {
            println!("rf-harness - run browser test suites and organize their results");
            println!();
            println!("Usage: rf-harness <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run      Run a test suite into a new timestamped run folder");
            println!("  summary  Summarize the latest run's report");
            println!("  collate  Organize screenshots from every run");
            println!("  runs     List run folders");
            println!("  prune    Delete old run folders");
            println!();
            println!("Run with --help for more information.");
            Ok(true)
        }
    }
}

/// Report a step's error without aborting. Recoverable errors keep a
/// successful status; anything else marks the command failed.
fn report_step(result: HarnessResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.is_recoverable() => {
            eprintln!("{}", e);
            true
        }
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

fn print_run_summary(run: &ResultRun, output_file: &str, json: bool) -> HarnessResult<()> {
    let summary = RobotXmlReader.read(&run.output_path(output_file))?;
    let artifacts = run.artifacts()?;

    if json {
        let value = serde_json::json!({
            "run": run.name,
            "summary": summary,
            "total": summary.total(),
            "all_passed": summary.all_passed(),
            "artifacts": artifacts,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", format_summary(&run.name, &summary, &artifacts));
    }
    Ok(())
}

fn format_summary(run: &str, summary: &ResultsSummary, artifacts: &RunArtifacts) -> String {
    let mut out = format!(
        "Run: {}\nTotal: {}\nPassed: {}\nFailed: {}\n",
        run,
        summary.total(),
        summary.passed,
        summary.failed
    );
    if summary.skipped > 0 {
        out.push_str(&format!("Skipped: {}\n", summary.skipped));
    }
    if summary.all_passed() {
        out.push_str("All tests passed\n");
    } else if !summary.failures.is_empty() {
        out.push_str("\nFailed tests:\n");
        for failure in &summary.failures {
            if failure.message.is_empty() {
                out.push_str(&format!("  - {}\n", failure.name));
            } else {
                out.push_str(&format!("  - {}: {}\n", failure.name, failure.message));
            }
        }
    }

    if let Some(count) = artifacts.screenshots {
        out.push_str(&format!("Screenshots: {}\n", count));
    }
    if artifacts.selenium_screenshots > 0 {
        out.push_str(&format!(
            "Selenium screenshots: {}\n",
            artifacts.selenium_screenshots
        ));
    }
    if let Some(report) = &artifacts.report {
        out.push_str(&format!("Report: {}\n", report.display()));
    }
    if let Some(log) = &artifacts.log {
        out.push_str(&format!("Log: {}\n", log.display()));
    }
    out
}

fn collate_screenshots(results_dir: &Path, screenshots_dir: &Path) -> HarnessResult<()> {
    let report = collate(&CollateConfig::new(results_dir, screenshots_dir))?;

    println!(
        "Organized {} screenshot(s) from {} run(s)",
        report.copied,
        report.index.run_count()
    );
    if !report.failures.is_empty() {
        println!("  {} file(s) could not be copied:", report.failures.len());
        for failure in &report.failures {
            println!("    {}", failure);
        }
    }
    if !report.index.is_empty() {
        println!("Index: {}", report.index_path.display());
    }
    Ok(())
}
