//! The assessment summary document: one record per executed command.

pub mod model;
pub mod scope;
pub mod write;

use thiserror::Error;

pub use model::{Execution, InvocationRecord, RecordKind, SummaryHeader};
pub use scope::{AssessmentSummary, with_summary};
pub use write::{render_summary, write_summary};

pub const ASSESSMENT_SUMMARY_XML: &str = "assessment_summary.xml";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to write `{file}`: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize summary: {0}")]
    Xml(String),
}
