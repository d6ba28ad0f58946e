use anyhow::Result;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use ruby_assess_core::render;
use ruby_assess_core::{RunPaths, assess};

mod args;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // stdout carries only the run outcome
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

fn main() -> Result<()> {
    let args = args::Args::parse();

    init_tracing(args.json, if args.verbose { Level::DEBUG } else { Level::INFO });

    let paths = RunPaths {
        results_dir: args
            .results_dir
            .clone()
            .unwrap_or_else(|| args.output_dir.join("results")),
        build_summary: args
            .build_summary
            .clone()
            .unwrap_or_else(|| args.input_dir.join("build_summary.xml")),
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        tool_dir: args.tool_dir,
    };

    let outcome = match assess(&paths) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("assessment failed: {err}");
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let output = match args.format {
        args::OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
        args::OutputFormat::Text => render::render_text(&outcome),
    };
    println!("{}", output.trim_end());

    std::process::exit(outcome.exit_code);
}
