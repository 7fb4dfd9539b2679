use std::io::Read;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::runner::types::{EngineCommand, Invocation};

/// Starts the test engine.
///
/// The harness only knows the engine through this trait, so tests substitute
/// a recording implementation for the real process.
pub trait ProcessInvoker {
    /// Run `command` to completion. `Err` means the process could not be
    /// started; a process that ran and failed is an `Ok` with a non-zero code.
    fn run(&self, command: &EngineCommand) -> HarnessResult<Invocation>;
}

/// Invokes the engine as a child process.
///
/// The engine's console output streams straight through to the terminal;
/// stderr is also captured so it can be reported when the run fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInvoker;

impl ProcessInvoker for SystemInvoker {
    fn run(&self, command: &EngineCommand) -> HarnessResult<Invocation> {
        debug!(command = %command, "starting engine");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let mut diagnostics = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            let mut raw = Vec::new();
            stderr.read_to_end(&mut raw)?;
            diagnostics = String::from_utf8_lossy(&raw).to_string();
            eprint!("{}", diagnostics);
        }

        let status = child.wait()?;
        debug!(code = ?status.code(), "engine finished");

        Ok(Invocation {
            code: status.code(),
            diagnostics,
        })
    }
}
