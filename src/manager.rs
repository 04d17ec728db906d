use crate::analysis::Analysis;
use crate::chart;
use crate::config::Config;
use crate::progress::check_progress_rate;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

/// Per-invocation options that override the configuration.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub no_plot: bool,
}

pub struct Manager {
    log_file: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(log_file: P, cfg_file: Option<&Path>) -> Result<Self> {
        let log_file = log_file.as_ref().to_path_buf();

        let cfg = match cfg_file {
            Some(cfg_file) => Config::from_file(cfg_file).context("failed to construct cfg")?,
            None => Config::default(),
        };
        log::info!("{cfg:#?}");

        Ok(Self { log_file, cfg })
    }

    /// Load the log, report notices and warnings, then draw the chart.
    pub fn run(&self, opts: &RunOptions) -> Result<()> {
        let ana = Analysis::from_file(&self.log_file, &self.cfg)
            .with_context(|| format!("failed to analyze {:?}", self.log_file))?;
        let n_extra = ana.table.last().record.extra.len();
        if n_extra > 0 {
            log::debug!("ignoring {n_extra} extra columns");
        }

        for notice in ana.summary.pb_notices() {
            println!("{notice}");
        }

        let warnings = check_progress_rate(&ana.table, &self.cfg.progress)
            .context("failed to check progress rate")?;
        for warning in &warnings {
            println!("{warning}");
        }

        if opts.no_plot {
            print!("{}", ana.summary_text());
            return Ok(());
        }

        let output = opts.output.as_ref().unwrap_or(&self.cfg.chart.output);
        let today = Local::now().date_naive();
        chart::render(&ana, &self.cfg.chart, output, today).context("failed to render chart")?;
        log::info!("saved chart to {output:?}");

        Ok(())
    }
}
