use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::SummaryError;
use super::model::{Execution, InvocationRecord, RecordKind, SummaryHeader};
use super::write::write_summary;
use crate::exec::posix_epoch;

/// The summary document of one run.
///
/// The document is written exactly once: by [`AssessmentSummary::finalize`],
/// or on drop if it was never finalized (e.g. while unwinding).
#[derive(Debug)]
pub struct AssessmentSummary {
    path: PathBuf,
    header: SummaryHeader,
    records: Vec<InvocationRecord>,
    finalized: bool,
}

impl AssessmentSummary {
    pub fn open(path: impl Into<PathBuf>, header: SummaryHeader) -> Self {
        Self {
            path: path.into(),
            header,
            records: Vec::new(),
            finalized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &SummaryHeader {
        &self.header
    }

    pub fn records(&self) -> &[InvocationRecord] {
        &self.records
    }

    /// Append an assessment record.
    pub fn add_report(
        &mut self,
        build_artifact_id: impl Into<String>,
        execution: Execution,
        execution_successful: bool,
        report: &Path,
        stdout: &Path,
        stderr: &Path,
    ) {
        self.records.push(InvocationRecord {
            kind: RecordKind::Assessment,
            build_artifact_id: Some(build_artifact_id.into()),
            report: Some(report.to_path_buf()),
            stdout: Some(stdout.to_path_buf()),
            stderr: Some(stderr.to_path_buf()),
            execution_successful,
            execution,
        });
    }

    /// Append a non-assessment record. Output files are only referenced
    /// if they exist.
    pub fn add_non_assessment(
        &mut self,
        build_artifact_id: Option<String>,
        execution: Execution,
        execution_successful: bool,
        stdout: &Path,
        stderr: &Path,
    ) {
        self.records.push(InvocationRecord {
            kind: RecordKind::NonAssessment,
            build_artifact_id,
            report: None,
            stdout: stdout.is_file().then(|| stdout.to_path_buf()),
            stderr: stderr.is_file().then(|| stderr.to_path_buf()),
            execution_successful,
            execution,
        });
    }

    /// Stamp the stop time and write the document.
    pub fn finalize(mut self) -> Result<PathBuf, SummaryError> {
        self.write()?;
        Ok(self.path.clone())
    }

    fn write(&mut self) -> Result<(), SummaryError> {
        self.finalized = true;
        write_summary(&self.path, &self.header, &self.records, &posix_epoch())?;
        info!(
            path = %self.path.display(),
            records = self.records.len(),
            "assessment summary written"
        );
        Ok(())
    }
}

impl Drop for AssessmentSummary {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(err) = self.write() {
                warn!("failed to write assessment summary: {err}");
            }
        }
    }
}

/// Open a summary at `path`, run `body` against it, and finalize it on
/// every exit path. An error from `body` takes precedence over a failure
/// to write the document.
pub fn with_summary<T, E, F>(path: &Path, header: SummaryHeader, body: F) -> Result<T, E>
where
    E: From<SummaryError>,
    F: FnOnce(&mut AssessmentSummary) -> Result<T, E>,
{
    let mut summary = AssessmentSummary::open(path, header);
    let result = body(&mut summary);
    let written = summary.finalize();

    match (result, written) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), written) => {
            if let Err(write_err) = written {
                warn!("failed to write assessment summary: {write_err}");
            }
            Err(err)
        }
    }
}
