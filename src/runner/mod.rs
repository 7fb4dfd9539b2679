//! Running the test engine into a fresh run folder.

pub mod invoker;
pub mod types;

pub use invoker::{ProcessInvoker, SystemInvoker};
pub use types::{Browser, EngineCommand, Invocation, RunConfig, Suite};

use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::runs::{self, ResultRun};

/// Result of a completed engine invocation
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run folder the engine wrote into
    pub run: ResultRun,
    pub command: EngineCommand,
    pub invocation: Invocation,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.invocation.success()
    }

    /// Turn a failed invocation into `ExternalProcess`, keeping its diagnostics
    pub fn into_result(self) -> HarnessResult<RunOutcome> {
        if self.success() {
            return Ok(self);
        }
        Err(HarnessError::ExternalProcess {
            program: self.command.program,
            code: self.invocation.code,
            diagnostics: self.invocation.diagnostics,
        })
    }
}

/// Create a run folder, record the configuration in it, and invoke the engine.
///
/// The engine is attempted exactly once. A non-zero exit still yields an
/// `Ok(RunOutcome)` so the caller can inspect whatever report was written;
/// use [`RunOutcome::into_result`] to treat it as an error.
pub fn run_suite(config: &RunConfig, invoker: &dyn ProcessInvoker) -> HarnessResult<RunOutcome> {
    let run = runs::create_run(&config.results_root)?;
    runs::write_metadata(&run, &serde_json::to_value(config)?)?;

    let command = config.engine_command(&run.path);
    info!(run = %run.name, command = %command, "running suite");

    let invocation = invoker.run(&command)?;
    if invocation.success() {
        info!(run = %run.name, "engine finished successfully");
    } else {
        warn!(run = %run.name, code = ?invocation.code, "engine reported failure");
    }

    Ok(RunOutcome {
        run,
        command,
        invocation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records commands and answers with a fixed exit code
    struct RecordingInvoker {
        code: Option<i32>,
        seen: RefCell<Vec<EngineCommand>>,
    }

    impl ProcessInvoker for RecordingInvoker {
        fn run(&self, command: &EngineCommand) -> HarnessResult<Invocation> {
            self.seen.borrow_mut().push(command.clone());
            Ok(Invocation {
                code: self.code,
                diagnostics: "engine stderr".to_string(),
            })
        }
    }

    fn invoker(code: Option<i32>) -> RecordingInvoker {
        RecordingInvoker {
            code,
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_run_creates_folder_and_invokes_once() {
        let tmp = TempDir::new().unwrap();
        let config = RunConfig::new(Suite::Workouts, Browser::Chrome)
            .results_root(tmp.path())
            .robot_bin("robot");
        let invoker = invoker(Some(0));

        let outcome = run_suite(&config, &invoker).unwrap();

        assert!(outcome.success());
        assert!(outcome.run.path.is_dir());
        assert!(outcome.run.path.join(runs::RUN_METADATA_FILE).is_file());
        let seen = invoker.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].program, "robot");
        assert!(seen[0].args.contains(&outcome.run.path.display().to_string()));
    }

    #[test]
    fn test_failed_engine_surfaces_diagnostics() {
        let tmp = TempDir::new().unwrap();
        let config = RunConfig::new(Suite::All, Browser::Edge).results_root(tmp.path());

        let outcome = run_suite(&config, &invoker(Some(2))).unwrap();
        assert!(!outcome.success());

        match outcome.into_result() {
            Err(HarnessError::ExternalProcess {
                code, diagnostics, ..
            }) => {
                assert_eq!(code, Some(2));
                assert_eq!(diagnostics, "engine stderr");
            }
            other => panic!("expected ExternalProcess, got {:?}", other),
        }
    }

    #[test]
    fn test_signal_termination_is_failure() {
        let tmp = TempDir::new().unwrap();
        let config = RunConfig::new(Suite::Profile, Browser::Safari).results_root(tmp.path());
        let outcome = run_suite(&config, &invoker(None)).unwrap();
        assert!(outcome.into_result().is_err());
    }
}
