mod analysis;
mod chart;
mod config;
mod error;
mod manager;
mod model;
mod progress;
mod reader;
mod stats;

use crate::manager::{Manager, RunOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// CSV file with the run log.
    log_file: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chart output path (overrides the configuration).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the chart and print the summary instead.
    #[arg(long)]
    no_plot: bool,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.log_file, args.config.as_deref())
        .context("failed to construct mgr")?;

    let opts = RunOptions {
        output: args.output,
        no_plot: args.no_plot,
    };
    mgr.run(&opts)?;

    Ok(())
}
