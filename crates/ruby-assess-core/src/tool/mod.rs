//! Tool drivers.
//!
//! Every driver shares one [`SwaTool`] core and implements the same
//! `{install, assess}` capability set. Variants differ only where their
//! tool does:
//!
//!   - `ruby-lint`   → [`RubyLint`]: one invocation per source file
//!   - `dawnscanner` → [`RubyTool`] with the narrow gem environment
//!   - `reek`        → [`Reek`]: adds a Ruby version diagnostic to install
//!   - anything else → [`RubyTool`]

pub mod classify;
pub mod lint;
pub mod reek;
pub mod ruby_tool;
pub mod swa;

use serde::Serialize;
use std::path::Path;

use crate::error::AssessError;
use crate::exec::StatusLog;
use crate::manifest::BuildSummary;
use crate::summary::{AssessmentSummary, Execution};

pub use classify::Classifier;
pub use lint::RubyLint;
pub use reek::Reek;
pub use ruby_tool::RubyTool;
pub use swa::{GemEnv, SwaTool, ToolDirs};

/// Pass/fail counts of one assessment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssessTally {
    pub passed: u32,
    pub failed: u32,
    /// Known-bug lines gathered from failed invocations.
    pub error_msgs: String,
}

impl AssessTally {
    pub fn record(&mut self, successful: bool) {
        if successful {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passed == 0 && self.failed == 0
    }
}

pub trait AssessTool {
    fn core(&self) -> &SwaTool;

    fn core_mut(&mut self) -> &mut SwaTool;

    /// Install the tool. Returns the install command's execution when one
    /// ran.
    fn install(&mut self, status: &StatusLog) -> Result<Option<Execution>, AssessError> {
        self.core_mut().install(status)
    }

    /// Assess every `ruby-src` artifact of `build`, appending one record
    /// per invocation to `summary`.
    fn assess(
        &self,
        build: &BuildSummary,
        results_dir: &Path,
        summary: &mut AssessmentSummary,
    ) -> Result<AssessTally, AssessError>;
}

/// Pick the driver for the configured tool type.
pub fn select_driver(core: SwaTool) -> Box<dyn AssessTool> {
    match core.conf().tool_type() {
        "ruby-lint" => Box::new(RubyLint::new(core)),
        "dawnscanner" => Box::new(RubyTool::new(core.with_gem_env(GemEnv::PathOnly))),
        "reek" => Box::new(Reek::new(core)),
        _ => Box::new(RubyTool::new(core)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn core(tool_type: &str) -> SwaTool {
        let mut tool = BTreeMap::new();
        tool.insert("tool-type".to_string(), tool_type.to_string());
        let conf = ToolConfig::resolve(None, &tool, &BTreeMap::new()).unwrap();
        let dirs = ToolDirs {
            input: PathBuf::from("/in"),
            output: PathBuf::from("/out"),
            tool: PathBuf::from("/tool"),
        };
        SwaTool::new(conf, dirs).unwrap()
    }

    #[test]
    fn dawnscanner_gets_the_narrow_environment() {
        assert_eq!(select_driver(core("dawnscanner")).core().gem_env(), GemEnv::PathOnly);
        assert_eq!(select_driver(core("reek")).core().gem_env(), GemEnv::Full);
        assert_eq!(select_driver(core("rubocop")).core().gem_env(), GemEnv::Full);
    }

    #[test]
    fn tally_counts() {
        let mut tally = AssessTally::default();
        assert!(tally.is_empty());
        tally.record(true);
        tally.record(false);
        tally.record(false);
        assert_eq!((tally.passed, tally.failed), (1, 2));
    }
}
