pub mod command;
pub mod config;
pub mod error;
pub mod exec;
pub mod manifest;
pub mod param;
pub mod render;
pub mod run;
pub mod summary;
pub mod tool;

pub use error::AssessError;
pub use run::{RunOutcome, RunPaths, assess};

pub const TOOL_NAME: &str = "ruby-assess";
