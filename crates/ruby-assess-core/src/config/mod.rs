//! Tool configuration: `key=value` documents and the layered resolver.

pub mod reader;
pub mod resolve;

use thiserror::Error;

use crate::param::SubstituteError;

pub use reader::{parse_conf, read_conf, write_conf};
pub use resolve::{ToolConfig, expand_all, merge_layers, service_overrides};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: expected `key=value`, found `{text}`")]
    Syntax {
        file: String,
        line: usize,
        text: String,
    },

    #[error("required configuration key `{0}` is missing")]
    Missing(String),

    #[error("failed to expand configuration key `{key}`: {source}")]
    Expand {
        key: String,
        #[source]
        source: SubstituteError,
    },

    #[error("configuration key `{key}` has invalid value `{value}`")]
    Invalid { key: String, value: String },

    #[error("configuration key `{key}` is not a valid pattern: {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
}
