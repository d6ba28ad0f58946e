//! Top-level assessment run.
//!
//! `start → install → (assess artifact)* → finalize`
//!
//! Setup failures (configuration, unpack, install) end the run with an
//! error. Manifest failures end it with exit code 1 and no summary.
//! Either way `results.conf` records the exit code before returning.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::write_conf;
use crate::error::AssessError;
use crate::exec::{StatusLog, make_results_archive};
use crate::manifest::BuildSummary;
use crate::summary::{ASSESSMENT_SUMMARY_XML, Execution, SummaryHeader, with_summary};
use crate::tool::{AssessTally, AssessTool, SwaTool, ToolDirs, select_driver};

pub const RESULTS_DOT_CONF: &str = "results.conf";
pub const RESULTS_ARCHIVE: &str = "results.tar.gz";

/// Where a run reads its inputs and writes its outputs.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tool_dir: PathBuf,
    pub results_dir: PathBuf,
    pub build_summary: PathBuf,
}

impl RunPaths {
    fn tool_dirs(&self) -> ToolDirs {
        ToolDirs {
            input: self.input_dir.clone(),
            output: self.output_dir.clone(),
            tool: self.tool_dir.clone(),
        }
    }
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub passed: u32,
    pub failed: u32,
    pub assessment_summary_file: Option<PathBuf>,
    pub results_archive: Option<PathBuf>,
    /// Known-bug diagnostics gathered from failed invocations.
    pub error_msgs: String,
    /// Why the manifest could not be assessed, if it could not.
    pub manifest_error: Option<String>,
}

/// Run a complete assessment.
pub fn assess(paths: &RunPaths) -> Result<RunOutcome, AssessError> {
    fs::create_dir_all(&paths.output_dir).map_err(AssessError::io(&paths.output_dir))?;
    let status = StatusLog::in_dir(&paths.output_dir);

    let prepared = prepare(paths, &status);
    let (driver, install) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return Err(abort(paths, &status, err, None)),
    };

    let summary_file = paths.results_dir.join(ASSESSMENT_SUMMARY_XML);
    let mut summary_opened = false;
    let assessed = run_assessment(
        paths,
        &status,
        driver.as_ref(),
        install,
        &summary_file,
        &mut summary_opened,
    );
    let (tally, summary_file, manifest_error) = match assessed {
        Ok(tally) => (tally, Some(summary_file), None),
        Err(err) if err.is_manifest_error() => {
            error!("{err}");
            (AssessTally::default(), None, Some(err.to_string()))
        }
        Err(err) => {
            let written = summary_opened.then_some(summary_file.as_path());
            return Err(abort(paths, &status, err, written));
        }
    };

    let exit_code = if tally.failed > 0 || manifest_error.is_some() {
        1
    } else {
        0
    };
    let results_archive = record_results(paths, exit_code, summary_file.as_deref(), &status)?;

    info!(
        exit_code,
        passed = tally.passed,
        failed = tally.failed,
        "assessment complete"
    );

    Ok(RunOutcome {
        exit_code,
        passed: tally.passed,
        failed: tally.failed,
        assessment_summary_file: summary_file,
        results_archive,
        error_msgs: tally.error_msgs,
        manifest_error,
    })
}

/// Record a run that ends with `err` and hand the error back. A summary
/// already written is still archived and referenced.
fn abort(
    paths: &RunPaths,
    status: &StatusLog,
    err: AssessError,
    summary_file: Option<&Path>,
) -> AssessError {
    error!("{err}");
    if let Err(write_err) = record_results(paths, err.exit_code(), summary_file, status) {
        warn!("failed to record results: {write_err}");
    }
    err
}

fn prepare(
    paths: &RunPaths,
    status: &StatusLog,
) -> Result<(Box<dyn AssessTool>, Option<Execution>), AssessError> {
    let core = SwaTool::load(paths.tool_dirs())?;
    info!(conf = ?core.conf().values(), "tool configuration");

    let mut driver = select_driver(core);
    driver.core().unarchive(status)?;
    let install = driver.install(status)?;
    Ok((driver, install))
}

fn run_assessment(
    paths: &RunPaths,
    status: &StatusLog,
    driver: &dyn AssessTool,
    install: Option<Execution>,
    summary_file: &Path,
    summary_opened: &mut bool,
) -> Result<AssessTally, AssessError> {
    status.run_task("assess", |task| -> Result<AssessTally, AssessError> {
        fs::create_dir_all(&paths.results_dir).map_err(AssessError::io(&paths.results_dir))?;

        let build = BuildSummary::from_file(&paths.build_summary)?;
        let header = SummaryHeader::new(&build, driver.core().conf());

        *summary_opened = true;
        let tally = with_summary(summary_file, header, |summary| {
            if let Some(execution) = install {
                let (stdout, stderr) = driver.core().install_outputs();
                summary.add_non_assessment(None, execution, true, &stdout, &stderr);
            }
            driver.assess(&build, &paths.results_dir, summary)
        })?;

        if tally.is_empty() {
            task.skip(Some("no files"));
        } else {
            let exit_code = if tally.failed > 0 { 1 } else { 0 };
            if tally.failed > 0 && !tally.error_msgs.is_empty() {
                warn!("known tool bug:\n{}", tally.error_msgs);
                status.log_task(
                    "tool-package-compatibility",
                    exit_code,
                    "known tool bug",
                    Some(&tally.error_msgs),
                );
            }
            task.update(
                exit_code,
                format!("pass: {}, fail: {}", tally.passed, tally.failed),
            );
        }
        Ok(tally)
    })
}

/// Write `results.conf`, archiving the results directory first when a
/// summary document exists. Returns the archive path, if one was made.
fn record_results(
    paths: &RunPaths,
    exit_code: i32,
    summary_file: Option<&Path>,
    status: &StatusLog,
) -> Result<Option<PathBuf>, AssessError> {
    let mut results = BTreeMap::new();
    results.insert("exit-code".to_string(), exit_code.to_string());

    let mut archived = None;
    let mut archive_error = None;

    if let Some(summary_file) = summary_file.filter(|f| f.is_file()) {
        results.insert(
            "assessment-summary-file".to_string(),
            file_name(summary_file),
        );

        let archive = paths.output_dir.join(RESULTS_ARCHIVE);
        let made = status.run_task("results-archive", |_| {
            make_results_archive(&paths.results_dir, &archive)
        });
        match made {
            Ok(()) => {
                results.insert("results-archive".to_string(), RESULTS_ARCHIVE.to_string());
                results.insert("results-dir".to_string(), file_name(&paths.results_dir));
                archived = Some(archive);
            }
            Err(err) => archive_error = Some(err),
        }
    }

    write_conf(&paths.output_dir.join(RESULTS_DOT_CONF), &results)?;

    match archive_error {
        Some(err) => Err(err.into()),
        None => Ok(archived),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
