//! Error types shared by the locator, parser, collator and runner.

use std::path::PathBuf;

use crate::report::ParseError;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A root directory the operation needs does not exist
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The results root holds no run folders
    #[error("no results found in {}", .0.display())]
    NoResults(PathBuf),

    /// The results tree holds no screenshots
    #[error("no screenshots found in {}", .0.display())]
    NoScreenshots(PathBuf),

    /// The run folder has no results document
    #[error("results document not found: {}", .0.display())]
    MissingReport(PathBuf),

    /// The results document could not be parsed
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A single screenshot could not be copied
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    FileCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine binary could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported failure
    #[error("{program} exited with {}", describe_exit(.code))]
    ExternalProcess {
        program: String,
        code: Option<i32>,
        diagnostics: String,
    },

    /// Another collation pass holds the output lock
    #[error("collation already in progress (lock file {})", .0.display())]
    Locked(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HarnessError {
    /// Whether the CLI may report this error and keep going with other work
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HarnessError::MissingDirectory(_)
                | HarnessError::NoResults(_)
                | HarnessError::MissingReport(_)
                | HarnessError::NoScreenshots(_)
                | HarnessError::Parse { .. }
                | HarnessError::FileCopy { .. }
        )
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
