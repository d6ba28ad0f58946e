//! `status.out`: one line per pipeline task, for the operator.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const STATUS_DOT_OUT: &str = "status.out";

const DIVIDER: &str = "----------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Pass => "PASS",
            TaskStatus::Fail => "FAIL",
            TaskStatus::Skip => "SKIP",
        })
    }
}

/// Outcome override a task body may set before it returns.
#[derive(Debug, Default)]
pub struct Task {
    outcome: Option<(TaskStatus, Option<String>)>,
}

impl Task {
    /// Record the task as skipped.
    pub fn skip(&mut self, short: Option<&str>) {
        self.outcome = Some((TaskStatus::Skip, short.map(str::to_string)));
    }

    /// PASS when `exit_code` is 0, FAIL otherwise.
    pub fn update(&mut self, exit_code: i32, short: impl Into<String>) {
        self.outcome = Some((status_of(exit_code), Some(short.into())));
    }
}

fn status_of(exit_code: i32) -> TaskStatus {
    if exit_code == 0 {
        TaskStatus::Pass
    } else {
        TaskStatus::Fail
    }
}

/// Append-only task log.
///
/// Failing to write the log never fails the run; it is reported as a
/// warning instead.
#[derive(Debug, Clone)]
pub struct StatusLog {
    path: PathBuf,
}

impl StatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log into `status.out` under `output_dir`.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(STATUS_DOT_OUT))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `body` as task `name`. An `Err` is logged as FAIL with the
    /// error text; an `Ok` is logged as PASS unless the body set its own
    /// outcome through [`Task`].
    pub fn run_task<T, E, F>(&self, name: &str, body: F) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnOnce(&mut Task) -> Result<T, E>,
    {
        let mut task = Task::default();
        let result = body(&mut task);
        match &result {
            Ok(_) => {
                let (status, short) = task.outcome.unwrap_or((TaskStatus::Pass, None));
                self.append(status, name, short.as_deref(), None);
            }
            Err(err) => {
                self.append(TaskStatus::Fail, name, None, Some(&err.to_string()));
            }
        }
        result
    }

    /// Log a task that has no body of its own.
    pub fn log_task(&self, name: &str, exit_code: i32, short: &str, long: Option<&str>) {
        self.append(status_of(exit_code), name, Some(short), long);
    }

    fn append(&self, status: TaskStatus, name: &str, short: Option<&str>, long: Option<&str>) {
        let entry = render(status, name, short, long);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(err) = written {
            warn!(path = %self.path.display(), "failed to write task status: {err}");
        }
    }
}

fn render(status: TaskStatus, name: &str, short: Option<&str>, long: Option<&str>) -> String {
    let mut entry = format!("{status}: {name}");
    if let Some(short) = short.filter(|s| !s.is_empty()) {
        entry.push_str(&format!(" ({short})"));
    }
    entry.push('\n');

    if let Some(long) = long.map(str::trim_end).filter(|l| !l.is_empty()) {
        entry.push_str(&format!("  {DIVIDER}\n"));
        for line in long.lines() {
            entry.push_str(&format!("  {line}\n"));
        }
        entry.push_str(&format!("  {DIVIDER}\n"));
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn log() -> (tempfile::TempDir, StatusLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = StatusLog::in_dir(dir.path());
        (dir, log)
    }

    #[test]
    fn ok_body_passes_and_err_body_fails() {
        let (_dir, log) = log();

        let ok: Result<u8, String> = log.run_task("tool-unarchive", |_| Ok(1));
        assert_eq!(ok, Ok(1));
        let err: Result<(), String> = log.run_task("tool-install", |_| Err("exit 2".into()));
        assert!(err.is_err());

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            text,
            "PASS: tool-unarchive\nFAIL: tool-install\n  ----------\n  exit 2\n  ----------\n"
        );
    }

    #[test]
    fn body_may_skip_or_update() {
        let (_dir, log) = log();

        let _: Result<(), String> = log.run_task("tool-install", |task| {
            task.skip(None);
            Ok(())
        });
        let _: Result<(), String> = log.run_task("assess", |task| {
            task.update(1, "pass: 1, fail: 1");
            Ok(())
        });

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "SKIP: tool-install\nFAIL: assess (pass: 1, fail: 1)\n");
    }

    #[test]
    fn standalone_task_with_long_message() {
        let (_dir, log) = log();
        log.log_task(
            "tool-package-compatibility",
            1,
            "known tool bug",
            Some("results/swa_tool_stderr1.out:3: boom\n"),
        );

        let text = fs::read_to_string(log.path()).unwrap();
        assert!(text.starts_with("FAIL: tool-package-compatibility (known tool bug)\n"));
        assert!(text.contains("  results/swa_tool_stderr1.out:3: boom\n"));
    }

    #[test]
    fn unwritable_log_does_not_panic() {
        let log = StatusLog::new("/nonexistent/dir/status.out");
        log.log_task("assess", 0, "pass: 1, fail: 0", None);
    }
}
