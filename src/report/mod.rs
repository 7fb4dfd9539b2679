//! Reading the engine's structured results document.

pub mod parser;
pub mod types;

pub use parser::{ParseError, ResultsReader, RobotXmlReader, parse_results, parse_results_bytes};
pub use types::{ResultsSummary, TestFailure, TestStatus, truncate_message};
