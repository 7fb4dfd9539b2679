use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::report::types::{ResultsSummary, TestFailure, TestStatus, truncate_message};

/// Errors raised while reading a results document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The XML itself is malformed
    #[error("malformed XML near byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// An attribute is malformed or its value holds a bad escape
    #[error("malformed attribute: {0}")]
    Value(#[source] quick_xml::Error),

    /// A statistics count is not a non-negative integer
    #[error("invalid {attribute} count {value:?}")]
    InvalidCount {
        attribute: &'static str,
        value: String,
    },

    /// The document has no root element
    #[error("document is empty")]
    Empty,

    /// The document ended with elements still open
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

/// Reads a results document into a summary.
///
/// Callers depend on this trait rather than on a particular engine's report
/// schema.
pub trait ResultsReader {
    fn read(&self, path: &Path) -> HarnessResult<ResultsSummary>;
}

/// Reader for the engine's `output.xml` schema
#[derive(Debug, Clone, Copy, Default)]
pub struct RobotXmlReader;

impl ResultsReader for RobotXmlReader {
    fn read(&self, path: &Path) -> HarnessResult<ResultsSummary> {
        parse_results(path)
    }
}

/// Parse the results document at `path`
pub fn parse_results(path: &Path) -> HarnessResult<ResultsSummary> {
    if !path.is_file() {
        return Err(HarnessError::MissingReport(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    parse_results_bytes(&bytes).map_err(|source| HarnessError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Which direct child of a `<test>` element is collecting text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Msg,
    Status,
}

/// A `<test>` element being read
#[derive(Debug, Default)]
struct OpenTest {
    name: String,
    depth: usize,
    status: Option<TestStatus>,
    msg: Option<String>,
    status_text: Option<String>,
}

impl OpenTest {
    fn into_failure(self) -> Option<TestFailure> {
        if self.status != Some(TestStatus::Fail) {
            return None;
        }
        // Blank text only decides the fallback; the chosen message stays verbatim
        let message = self
            .msg
            .filter(|m| !m.trim().is_empty())
            .or(self.status_text.filter(|m| !m.trim().is_empty()))
            .unwrap_or_default();
        Some(TestFailure {
            name: self.name,
            message: truncate_message(&message),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct SuiteStats {
    pass: u64,
    fail: u64,
    skip: u64,
}

/// Parse a results document held in memory.
///
/// Statistics come from the first `<stat>` under `<statistics><suite>`.
/// Failing tests are collected in document order. When the document has no
/// suite statistics, the summary is all zeros with no failures.
pub fn parse_results_bytes(xml: &[u8]) -> Result<ResultsSummary, ParseError> {
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut stats: Option<SuiteStats> = None;
    let mut current: Option<OpenTest> = None;
    let mut capture: Option<(Capture, usize, String)> = None;
    let mut failures = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|source| ParseError::Xml {
            position: reader.buffer_position() as u64,
            source,
        })?;

        match event {
            Event::Start(e) => {
                saw_root = true;
                let depth = stack.len();
                open_element(&e, depth, &stack, &mut stats, &mut current)?;
                if let Some(kind) = capture_kind(&e, depth, current.as_ref()) {
                    capture = Some((kind, depth, String::new()));
                }
                stack.push(e.local_name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                saw_root = true;
                let depth = stack.len();
                open_element(&e, depth, &stack, &mut stats, &mut current)?;
                // A self-closing <test/> opens and closes in one event
                if current.as_ref().is_some_and(|t| t.depth == depth) {
                    if let Some(failure) = current.take().and_then(OpenTest::into_failure) {
                        failures.push(failure);
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    let unescaped = t.unescape().map_err(|e| ParseError::Xml {
                        position: reader.buffer_position() as u64,
                        source: quick_xml::Error::from(e),
                    })?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some((_, _, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                stack.pop();
                let depth = stack.len();

                if capture.as_ref().is_some_and(|(_, d, _)| *d == depth) {
                    if let (Some((kind, _, text)), Some(test)) = (capture.take(), current.as_mut()) {
                        match kind {
                            Capture::Msg => test.msg = Some(text),
                            Capture::Status => test.status_text = Some(text),
                        }
                    }
                }

                if current.as_ref().is_some_and(|t| t.depth == depth) {
                    if let Some(failure) = current.take().and_then(OpenTest::into_failure) {
                        failures.push(failure);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(ParseError::Empty);
    }
    if let Some(open) = stack.last() {
        return Err(ParseError::Unclosed(String::from_utf8_lossy(open).to_string()));
    }

    let Some(stats) = stats else {
        warn!("results document has no suite statistics; reporting zero counts");
        return Ok(ResultsSummary::default());
    };

    debug!(
        passed = stats.pass,
        failed = stats.fail,
        failures = failures.len(),
        "parsed results document"
    );

    Ok(ResultsSummary {
        passed: stats.pass,
        failed: stats.fail,
        skipped: stats.skip,
        failures,
    })
}

/// Handle an opening (or self-closing) element at `depth`
fn open_element(
    e: &BytesStart<'_>,
    depth: usize,
    stack: &[Vec<u8>],
    stats: &mut Option<SuiteStats>,
    current: &mut Option<OpenTest>,
) -> Result<(), ParseError> {
    match e.local_name().as_ref() {
        b"stat" if stats.is_none() && in_suite_statistics(stack) => {
            *stats = Some(SuiteStats {
                pass: count_attribute(e, "pass")?.unwrap_or(0),
                fail: count_attribute(e, "fail")?.unwrap_or(0),
                skip: count_attribute(e, "skip")?.unwrap_or(0),
            });
        }
        b"test" if current.is_none() => {
            *current = Some(OpenTest {
                name: string_attribute(e, "name")?.unwrap_or_default(),
                depth,
                status: string_attribute(e, "status")?.and_then(|s| TestStatus::parse(&s)),
                ..Default::default()
            });
        }
        b"status" => {
            if let Some(test) = current.as_mut().filter(|t| t.depth + 1 == depth) {
                if test.status.is_none() {
                    test.status =
                        string_attribute(e, "status")?.and_then(|s| TestStatus::parse(&s));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Whether an opening element starts text collection for the current test
fn capture_kind(e: &BytesStart<'_>, depth: usize, current: Option<&OpenTest>) -> Option<Capture> {
    let test = current?;
    if test.depth + 1 != depth {
        return None;
    }
    match e.local_name().as_ref() {
        b"msg" => Some(Capture::Msg),
        b"status" => Some(Capture::Status),
        _ => None,
    }
}

fn in_suite_statistics(stack: &[Vec<u8>]) -> bool {
    matches!(
        stack,
        [.., parent, last] if parent.as_slice() == b"statistics" && last.as_slice() == b"suite"
    )
}

fn string_attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    let Some(attr) = e.try_get_attribute(name).map_err(ParseError::Value)? else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(ParseError::Value)?;
    Ok(Some(value.into_owned()))
}

fn count_attribute(e: &BytesStart<'_>, name: &'static str) -> Result<Option<u64>, ParseError> {
    let Some(raw) = string_attribute(e, name)? else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ParseError::InvalidCount {
            attribute: name,
            value: raw,
        })
}
