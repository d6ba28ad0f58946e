//! Command generation from tool-invoke templates.

pub mod generate;
pub mod template;

use thiserror::Error;

use crate::param::SubstituteError;

pub use generate::{CommandOption, GeneratedCommand, gencmd, generate};
pub use template::{CommandTemplate, TemplateNode};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read command template {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command template line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error(transparent)]
    Substitute(#[from] SubstituteError),

    #[error("command template produced no executable")]
    Empty,
}
