use std::path::Path;
use tracing::{debug, info};

use super::{AssessTally, AssessTool, SwaTool};
use crate::command::gencmd;
use crate::error::AssessError;
use crate::manifest::{ArtifactKind, BuildSummary};
use crate::summary::AssessmentSummary;

pub const DEFAULT_REPORT_TEMPLATE: &str = "assessment_report{0}.xml";

/// Generic driver: one templated command per artifact.
#[derive(Debug)]
pub struct RubyTool {
    core: SwaTool,
}

impl RubyTool {
    pub fn new(core: SwaTool) -> Self {
        Self { core }
    }
}

impl AssessTool for RubyTool {
    fn core(&self) -> &SwaTool {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SwaTool {
        &mut self.core
    }

    fn assess(
        &self,
        build: &BuildSummary,
        results_dir: &Path,
        summary: &mut AssessmentSummary,
    ) -> Result<AssessTally, AssessError> {
        let conf = self.core.conf();
        let report_template = conf
            .get("assessment-report-template")
            .unwrap_or(DEFAULT_REPORT_TEMPLATE);
        let tool_symbols = conf.symbols();
        let mut tally = AssessTally::default();

        for artifact in build.get_build_artifacts(&[ArtifactKind::RubySrc]) {
            let artifact = artifact?;
            let id = artifact.id.to_string();

            if !artifact.has_sources() {
                info!(id = artifact.id, "skipping artifact with no source files");
                continue;
            }

            let mut symbols = artifact.symbols();
            symbols.extend_from(&tool_symbols);

            let report = results_dir.join(report_template.replace("{0}", &id));
            let stdout = if symbols.text("report-on-stdout") == Some("true") {
                report.clone()
            } else {
                symbols.insert("assessment-report", report.display().to_string());
                results_dir.join(format!("swa_tool_stdout{id}.out"))
            };
            let stderr = results_dir.join(format!("swa_tool_stderr{id}.out"));

            let template = self.core.dirs().input.join(conf.require("tool-invoke")?);
            let command = gencmd(&template, &symbols)?;
            debug!(id = %id, options = ?command.options(), "command options");

            let execution = self.core.invoke(command.argv, results_dir, &stdout, &stderr);
            let successful = self
                .core
                .classifier()
                .is_valid_exit_code(execution.exit_code);
            if !successful {
                tally.error_msgs.push_str(
                    &self
                        .core
                        .classifier()
                        .known_bug_messages(execution.exit_code, &stderr),
                );
            }
            tally.record(successful);
            summary.add_report(id, execution, successful, &report, &stdout, &stderr);
        }

        Ok(tally)
    }
}
