//! Types for parsed test reports.

use serde::{Deserialize, Serialize};

use crate::config::MESSAGE_TRUNCATE_AT;

/// Outcome of a single test as recorded by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    NotRun,
}

impl TestStatus {
    /// Parse the engine's status string; unknown values yield `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(TestStatus::Pass),
            "FAIL" => Some(TestStatus::Fail),
            "SKIP" => Some(TestStatus::Skip),
            "NOT RUN" | "NOT_RUN" => Some(TestStatus::NotRun),
            _ => None,
        }
    }
}

/// A failing test with its (possibly truncated) failure message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub name: String,
    pub message: String,
}

/// Pass/fail summary of one results document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub passed: u64,
    pub failed: u64,
    /// Zero for engines that do not report skips
    pub skipped: u64,
    /// Failing tests in document order
    pub failures: Vec<TestFailure>,
}

impl ResultsSummary {
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.skipped
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Cut `message` to `MESSAGE_TRUNCATE_AT` characters followed by `...`.
/// Messages at or below the limit are returned unchanged.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MESSAGE_TRUNCATE_AT) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}
