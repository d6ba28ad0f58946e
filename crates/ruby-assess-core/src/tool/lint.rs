use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::classify::has_runtime_errors;
use super::{AssessTally, AssessTool, SwaTool};
use crate::error::AssessError;
use crate::manifest::{ArtifactKind, BuildSummary};
use crate::summary::AssessmentSummary;

pub const LINT_CONFIG_FILE: &str = "ruby-lint.yml";

/// `ruby-lint` driver: one invocation per source file, each recorded
/// under `<artifact id>-<file index>`.
#[derive(Debug)]
pub struct RubyLint {
    core: SwaTool,
}

impl RubyLint {
    pub fn new(core: SwaTool) -> Self {
        Self { core }
    }

    /// Write the lint configuration listing `dependencies` as load
    /// directories.
    pub fn create_config_file(&self, dependencies: &[String]) -> Result<PathBuf, AssessError> {
        let path = self.core.dirs().tool.join(LINT_CONFIG_FILE);
        let mut body = String::from("---\ndirectories:\n");
        for dir in dependencies {
            body.push_str(&format!(" - {dir}\n"));
        }
        fs::write(&path, body).map_err(AssessError::io(&path))?;
        Ok(path)
    }
}

impl AssessTool for RubyLint {
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
        let executable = self.core.conf().require("executable")?.to_string();
        let mut tally = AssessTally::default();

        for artifact in build.get_build_artifacts(&[ArtifactKind::RubySrc]) {
            let artifact = artifact?;
            if !artifact.has_sources() {
                info!(id = artifact.id, "skipping artifact with no source files");
                continue;
            }

            let mut base = vec![executable.clone(), "--presenter".into(), "syntastic".into()];
            if let Some(dependencies) = &artifact.dependency {
                let config = self.create_config_file(dependencies)?;
                base.push("--config".into());
                base.push(config.display().to_string());
            }

            for (index, srcfile) in artifact.sources().iter().enumerate() {
                let id = format!("{}-{}", artifact.id, index + 1);
                let outfile = results_dir.join(format!("assessment_report{id}.out"));
                let errfile = results_dir.join(format!("swa_tool_stderr{id}.out"));

                let mut argv = base.clone();
                argv.push(srcfile.clone());
                let execution = self.core.invoke(argv, results_dir, &outfile, &errfile);

                let successful = self
                    .core
                    .classifier()
                    .is_valid_exit_code(execution.exit_code)
                    && !has_runtime_errors(&errfile);
                tally.record(successful);
                summary.add_report(id, execution, successful, &outfile, &outfile, &errfile);
            }
        }

        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::summary::SummaryHeader;
    use crate::tool::ToolDirs;
    use std::collections::BTreeMap;
    use std::os::unix::fs::PermissionsExt;

    const MANIFEST: &str = r#"<build-summary>
  <exit-code>0</exit-code>
  <build-root-dir>/build</build-root-dir>
  <build-artifacts>
    <ruby-src>
      <include><file>a.rb</file><file>b.rb</file></include>
      <dependency><file>/gems/lib</file></dependency>
    </ruby-src>
    <ruby-src><include/></ruby-src>
  </build-artifacts>
</build-summary>"#;

    fn header() -> SummaryHeader {
        SummaryHeader {
            uuid: "u".into(),
            assess_fw: None,
            assess_fw_version: None,
            build_root_dir: "/build".into(),
            package_root_dir: "/build".into(),
            package_name: None,
            package_version: None,
            build_summary_uuid: None,
            tool_type: "ruby-lint".into(),
            tool_version: None,
            platform_name: "linux".into(),
            start_ts: "0.000000".into(),
        }
    }

    #[test]
    fn one_record_per_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let tool_dir = dir.path().join("tool");
        fs::create_dir_all(&results).unwrap();
        fs::create_dir_all(&tool_dir).unwrap();

        // stands in for ruby-lint: a runtime error on b.rb, exit 0 regardless
        let script = tool_dir.join("ruby-lint");
        fs::write(
            &script,
            "#!/bin/sh\ncase \"$5\" in *b.rb) echo 'x.rb:1: boom (RuntimeError)' >&2 ;; esac\nexit 0\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut tool = BTreeMap::new();
        tool.insert("tool-type".to_string(), "ruby-lint".to_string());
        tool.insert("executable".to_string(), script.display().to_string());
        let conf = ToolConfig::resolve(None, &tool, &BTreeMap::new()).unwrap();
        let core = SwaTool::new(
            conf,
            ToolDirs {
                input: dir.path().to_path_buf(),
                output: dir.path().to_path_buf(),
                tool: tool_dir.clone(),
            },
        )
        .unwrap()
        .with_gem_user_dir(None);
        let lint = RubyLint::new(core);

        let build = BuildSummary::parse(MANIFEST, Path::new("build_summary.xml")).unwrap();
        let mut summary = AssessmentSummary::open(results.join("s.xml"), header());
        let tally = lint.assess(&build, &results, &mut summary).unwrap();

        assert_eq!((tally.passed, tally.failed), (1, 1));
        let ids: Vec<_> = summary
            .records()
            .iter()
            .map(|r| r.build_artifact_id.clone().unwrap())
            .collect();
        // the second artifact has no sources and is skipped
        assert_eq!(ids, vec!["1-1", "1-2"]);

        let config_path = tool_dir.join(LINT_CONFIG_FILE).display().to_string();
        let argv = &summary.records()[0].execution.argv;
        assert_eq!(
            argv[1..].to_vec(),
            vec!["--presenter", "syntastic", "--config", config_path.as_str(), "/build/a.rb"]
        );

        let config = fs::read_to_string(tool_dir.join(LINT_CONFIG_FILE)).unwrap();
        assert_eq!(config, "---\ndirectories:\n - /gems/lib\n");
        assert!(results.join("assessment_report1-2.out").is_file());
    }
}
