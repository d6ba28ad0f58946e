//! Success classification for tool invocations.
//!
//! Responsibilities:
//! - Decide whether an exit code is acceptable for the configured tool
//! - Scan captured stderr for a known tool bug and format the matches
//! - Detect the lint tool's runtime-error marker
//!
//! Patterns come from the tool configuration and are compiled once, so a
//! malformed pattern fails driver construction rather than an assessment.
//!
//! Exit-code policy:
//!
//!   - `valid-exit-status` set → the pattern must match at the start of
//!     the decimal exit code
//!   - otherwise               → only exit code 0 is acceptable

use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::config::{ConfigError, ToolConfig};

const RUNTIME_ERROR_MARKER: &str = "(RuntimeError)";

/// Exit code and stderr pattern that identify a known tool bug.
#[derive(Debug, Clone)]
struct KnownBug {
    exit_code: i32,
    pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    valid_exit_status: Option<Regex>,
    known_bug: Option<KnownBug>,
}

impl Classifier {
    pub fn from_conf(conf: &ToolConfig) -> Result<Self, ConfigError> {
        let valid_exit_status = conf
            .get("valid-exit-status")
            .map(|pattern| compile("valid-exit-status", &format!("^(?:{pattern})")))
            .transpose()?;

        let known_bug = match (
            conf.get("tool-report-exit-code"),
            conf.get("tool-report-exit-code-msg"),
        ) {
            (Some(code), Some(pattern)) => Some(KnownBug {
                exit_code: code.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "tool-report-exit-code".to_string(),
                    value: code.to_string(),
                })?,
                pattern: compile("tool-report-exit-code-msg", pattern)?,
            }),
            _ => None,
        };

        Ok(Self {
            valid_exit_status,
            known_bug,
        })
    }

    pub fn is_valid_exit_code(&self, exit_code: i32) -> bool {
        match &self.valid_exit_status {
            Some(pattern) => pattern.is_match(&exit_code.to_string()),
            None => exit_code == 0,
        }
    }

    /// Known-bug lines of `errfile`, one `<dir>/<file>:<line>: <text>` per
    /// match. Empty unless `exit_code` is the configured bug exit code, or
    /// when `errfile` cannot be read.
    pub fn known_bug_messages(&self, exit_code: i32, errfile: &Path) -> String {
        let Some(bug) = self.known_bug.as_ref().filter(|b| b.exit_code == exit_code) else {
            return String::new();
        };
        if !errfile.is_file() {
            return String::new();
        }
        let Some(text) = read_lossy(errfile) else {
            return String::new();
        };

        let location = short_location(errfile);
        let mut messages = String::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if bug.pattern.is_match(line) {
                messages.push_str(&format!("{location}:{}: {line}\n", index + 1));
            }
        }
        messages
    }
}

/// Captured tool output, with invalid UTF-8 replaced. `None` (and a
/// warning) when the file cannot be read.
fn read_lossy(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => {
            warn!(path = %path.display(), "cannot read tool output: {err}");
            None
        }
    }
}

fn compile(key: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        key: key.to_string(),
        source,
    })
}

/// The parent directory name and file name of `path`.
fn short_location(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent().and_then(Path::file_name) {
        Some(parent) => format!("{}/{file}", parent.to_string_lossy()),
        None => file,
    }
}

/// Whether the first line of `errfile` ends with the runtime-error marker.
/// An unreadable file has no marker.
pub fn has_runtime_errors(errfile: &Path) -> bool {
    read_lossy(errfile).is_some_and(|text| {
        text.lines()
            .next()
            .is_some_and(|first| first.trim().ends_with(RUNTIME_ERROR_MARKER))
    })
}
