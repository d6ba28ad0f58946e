use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "ruby-assess",
    version,
    about = "Run a Ruby static analysis tool over a build and record the assessment"
)]
pub struct Args {
    /// Directory holding tool.conf, the tool archive and the command template
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory receiving results.conf, status.out and the results archive
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Directory the tool archive is unpacked into
    #[arg(long)]
    pub tool_dir: PathBuf,

    /// Directory for reports and the assessment summary [default: <output-dir>/results]
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Build summary document [default: <input-dir>/build_summary.xml]
    #[arg(long)]
    pub build_summary: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
