use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::ToolConfig;
use crate::exec::{Environment, platform, posix_epoch};
use crate::manifest::BuildSummary;

/// Document-level fields, fixed when the summary is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryHeader {
    pub uuid: String,
    pub assess_fw: Option<String>,
    pub assess_fw_version: Option<String>,
    pub build_root_dir: String,
    pub package_root_dir: String,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub build_summary_uuid: Option<String>,
    pub tool_type: String,
    pub tool_version: Option<String>,
    pub platform_name: String,
    pub start_ts: String,
}

impl SummaryHeader {
    /// Fresh header with a new document id and the current time.
    pub fn new(build: &BuildSummary, conf: &ToolConfig) -> Self {
        let build_root_dir = build.build_root_dir().to_string();
        let package_root_dir = match build.get("package-root-dir") {
            Some(dir) => Path::new(&build_root_dir).join(dir).display().to_string(),
            None => build_root_dir.clone(),
        };
        let package = |key: &str| {
            build
                .package_conf()
                .get(key)
                .and_then(|v| v.clone())
        };
        let field = |key: &str| {
            build
                .contains(key)
                .then(|| build.get(key).unwrap_or_default().to_string())
        };

        Self {
            uuid: Uuid::new_v4().to_string(),
            assess_fw: field("build-fw"),
            assess_fw_version: field("build-fw-version"),
            build_root_dir,
            package_root_dir,
            package_name: package("package-short-name"),
            package_version: package("package-version"),
            build_summary_uuid: field("build-summary-uuid"),
            tool_type: conf.tool_type().to_string(),
            tool_version: conf.get("tool-version").map(str::to_string),
            platform_name: platform(),
            start_ts: posix_epoch(),
        }
    }
}

/// What was run, where, with which environment, and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub environment: Environment,
    pub exit_code: i32,
    pub start_ts: String,
    pub stop_ts: String,
}

impl Execution {
    pub fn executable(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A tool run over an artifact; carries a report reference.
    Assessment,
    /// Anything else worth auditing, such as the tool install.
    NonAssessment,
}

impl RecordKind {
    pub fn tag(self) -> &'static str {
        match self {
            RecordKind::Assessment => "assessment",
            RecordKind::NonAssessment => "non-assessment",
        }
    }
}

/// One executed command's evidence. Never changed once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    pub kind: RecordKind,
    /// Artifact id, or `<id>-<n>` for per-file invocations.
    pub build_artifact_id: Option<String>,
    pub report: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub execution_successful: bool,
    pub execution: Execution,
}

/// Final path component of `path`, as written into the document.
pub(crate) fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
