use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

use super::{AssessTally, AssessTool, RubyTool, SwaTool};
use crate::error::AssessError;
use crate::exec::StatusLog;
use crate::manifest::BuildSummary;
use crate::summary::{AssessmentSummary, Execution};

static RUBY_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ruby-(?P<major>\d)\.(?P<minor>\d).(?P<patch>\d)-.+")
        .expect("ruby version pattern is valid")
});

/// Oldest Ruby reek supports, as concatenated version digits.
const MIN_RUBY_VERSION: u32 = 210;

/// Whether a `RUBY_VERSION` value such as `ruby-2.0.0-p648` names a Ruby
/// too old for reek. Unrecognised values are not considered too old.
pub fn ruby_version_too_old(version: &str) -> bool {
    let Some(caps) = RUBY_VERSION.captures(version) else {
        return false;
    };
    format!("{}{}{}", &caps["major"], &caps["minor"], &caps["patch"])
        .parse::<u32>()
        .is_ok_and(|v| v < MIN_RUBY_VERSION)
}

/// Generic driver whose failed install also checks the Ruby version.
#[derive(Debug)]
pub struct Reek {
    inner: RubyTool,
}

impl Reek {
    pub fn new(core: SwaTool) -> Self {
        Self {
            inner: RubyTool::new(core),
        }
    }

    /// Install, diagnosing a failure against the Ruby named by `version`.
    pub(crate) fn install_for_ruby(
        &mut self,
        status: &StatusLog,
        version: &str,
    ) -> Result<Option<Execution>, AssessError> {
        self.inner
            .core_mut()
            .install_with(status, |execution: &Execution| {
                if ruby_version_too_old(version) {
                    warn!(version = %version, "reek requires Ruby version >= 2.1.0");
                    status.log_task(
                        "tool-package-compatibility",
                        execution.exit_code,
                        "ruby version",
                        Some("reek requires Ruby version >= 2.1.0"),
                    );
                }
            })
    }
}

impl AssessTool for Reek {
    fn core(&self) -> &SwaTool {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut SwaTool {
        self.inner.core_mut()
    }

    fn install(&mut self, status: &StatusLog) -> Result<Option<Execution>, AssessError> {
        let version = std::env::var("RUBY_VERSION").unwrap_or_default();
        self.install_for_ruby(status, &version)
    }

    fn assess(
        &self,
        build: &BuildSummary,
        results_dir: &Path,
        summary: &mut AssessmentSummary,
    ) -> Result<AssessTally, AssessError> {
        self.inner.assess(build, results_dir, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::tool::ToolDirs;
    use std::collections::BTreeMap;
    use std::fs;

    #[test]
    fn old_rubies_are_detected() {
        assert!(ruby_version_too_old("ruby-2.0.0-p648"));
        assert!(ruby_version_too_old("ruby-1.9.3-p551"));
        assert!(!ruby_version_too_old("ruby-2.1.0-p0"));
        assert!(!ruby_version_too_old("ruby-2.7.8-p225"));
    }

    #[test]
    fn unrecognised_versions_skip_the_check() {
        assert!(!ruby_version_too_old(""));
        assert!(!ruby_version_too_old("jruby-9.4.0"));
        assert!(!ruby_version_too_old("ruby-2.0.0"));
    }

    fn reek(dir: &Path, install_cmd: &str) -> Reek {
        let mut tool = BTreeMap::new();
        tool.insert("tool-type".to_string(), "reek".to_string());
        tool.insert("tool-install-cmd".to_string(), install_cmd.to_string());
        let conf = ToolConfig::resolve(None, &tool, &BTreeMap::new()).unwrap();
        let core = SwaTool::new(
            conf,
            ToolDirs {
                input: dir.to_path_buf(),
                output: dir.to_path_buf(),
                tool: dir.to_path_buf(),
            },
        )
        .unwrap()
        .with_gem_user_dir(None);
        Reek::new(core)
    }

    #[test]
    fn failed_install_on_old_ruby_logs_compatibility() {
        let dir = tempfile::tempdir().unwrap();
        let status = StatusLog::in_dir(dir.path());
        let mut driver = reek(dir.path(), "exit 1");

        let err = driver
            .install_for_ruby(&status, "ruby-2.0.0-p648")
            .unwrap_err();
        assert!(matches!(err, AssessError::InstallFailed { exit_code: 1, .. }));

        let log = fs::read_to_string(status.path()).unwrap();
        assert!(log.starts_with("FAIL: tool-package-compatibility (ruby version)\n"));
        assert!(log.contains("  reek requires Ruby version >= 2.1.0\n"));
        assert!(log.contains("FAIL: tool-install\n"));
    }

    #[test]
    fn failed_install_on_current_ruby_has_no_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let status = StatusLog::in_dir(dir.path());
        let mut driver = reek(dir.path(), "exit 1");

        assert!(driver.install_for_ruby(&status, "ruby-2.7.8-p225").is_err());
        let log = fs::read_to_string(status.path()).unwrap();
        assert!(!log.contains("tool-package-compatibility"));
    }

    #[test]
    fn successful_install_has_no_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let status = StatusLog::in_dir(dir.path());
        let mut driver = reek(dir.path(), "true");

        let execution = driver
            .install_for_ruby(&status, "ruby-2.0.0-p648")
            .unwrap()
            .unwrap();
        assert_eq!(execution.exit_code, 0);
        let log = fs::read_to_string(status.path()).unwrap();
        assert_eq!(log, "PASS: tool-install\n");
    }
}
