//! Build-summary manifest reader.

pub mod artifact;
pub mod build_summary;

use thiserror::Error;

pub use artifact::{ArtifactKind, BuildArtifact, BuildArtifacts};
pub use build_summary::BuildSummary;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No `{field}` tag found in `{file}` file")]
    MissingField { field: String, file: String },

    #[error("exit-code {exit_code} (not 0) in {file}")]
    BuildFailed { file: String, exit_code: i64 },

    #[error(
        "No Source Files or Class Files to Assess! Looks like no files with 'rb' extension were found."
    )]
    NoArtifacts,

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// The manifest holds an artifact kind the driver cannot assess.
    #[error("assessing `{0}` artifacts is not implemented")]
    Unsupported(String),
}
