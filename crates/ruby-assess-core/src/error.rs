use thiserror::Error;

use crate::command::TemplateError;
use crate::config::ConfigError;
use crate::exec::ArchiveError;
use crate::manifest::ManifestError;
use crate::summary::SummaryError;

/// Exit code of a run whose tool archive could not be unpacked.
pub const UNPACK_FAILED_EXIT_CODE: i32 = 5;

#[derive(Debug, Error)]
pub enum AssessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("failed to unpack tool archive: {0}")]
    UnpackArchive(#[from] ArchiveError),

    #[error("Install Tool Failed, Command '{command}' return {exit_code}")]
    InstallFailed { command: String, exit_code: i32 },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AssessError {
    /// Process exit code reported for a run that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AssessError::UnpackArchive(_) => UNPACK_FAILED_EXIT_CODE,
            _ => 1,
        }
    }

    /// Manifest problems the orchestrator turns into a failed run instead
    /// of an error. Unsupported artifact kinds are not among them.
    pub fn is_manifest_error(&self) -> bool {
        matches!(self, AssessError::Manifest(err) if !matches!(err, ManifestError::Unsupported(_)))
    }

    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| AssessError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
