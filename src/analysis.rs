use crate::config::Config;
use crate::error::HistoryError;
use crate::model::RunTable;
use crate::reader::read_records;
use crate::stats::{compute_max, compute_mean};
use anyhow::{Context, Result};
use std::path::Path;

/// Scalar aggregates over the whole run table.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub run_count: usize,
    /// Whole weeks between the first and the last run date.
    pub weeks: i64,
    pub mean_distance: f64,
    pub mean_speed: f64,
    pub pb_distance: f64,
    pub pb_speed: f64,
    pub last_distance: f64,
    pub last_speed: f64,
}

impl Summary {
    /// Compute the aggregates of a table.
    ///
    /// # Errors
    /// Returns [`HistoryError::ShortSpan`] if the runs span less than a week,
    /// as no weekly frequency can be given.
    pub fn new(table: &RunTable) -> Result<Self, HistoryError> {
        let distances = table.distances();
        let speeds = table.speeds();

        let first_date = table.first().date_time().date();
        let last_date = table.last().date_time().date();
        let days = (last_date - first_date).num_days();
        let weeks = days.div_euclid(7);
        if weeks == 0 {
            return Err(HistoryError::ShortSpan { days });
        }

        Ok(Self {
            run_count: table.len(),
            weeks,
            mean_distance: compute_mean(&distances),
            mean_speed: compute_mean(&speeds),
            pb_distance: compute_max(&distances),
            pb_speed: compute_max(&speeds),
            last_distance: table.last().distance(),
            last_speed: table.last().avg_speed,
        })
    }

    /// Runs per week.
    pub fn run_freq(&self) -> f64 {
        self.run_count as f64 / self.weeks as f64
    }

    /// Multi-line block with the overall and last run stats.
    pub fn text(&self) -> String {
        format!(
            "Overall stats:\n\
             ---------------------\n\
             run_count: {}\n\
             run_freq: {:.1} runs/week\n\
             mean_dist: {:.2} km\n\
             mean_speed: {:.2} km/hr\n\
             PB distance: {:?} km\n\
             PB speed: {:.2} km/hr\n\
             \n\
             Last run:\n\
             ---------------\n\
             distance: {:?}km\n\
             speed: {:.2}km/hr\n",
            self.run_count,
            self.run_freq(),
            self.mean_distance,
            self.mean_speed,
            self.pb_distance,
            self.pb_speed,
            self.last_distance,
            self.last_speed,
        )
    }

    /// Notices for a last run matching a personal best.
    ///
    /// Equality is exact, so a last run tying an earlier best also counts.
    pub fn pb_notices(&self) -> Vec<String> {
        let mut notices = Vec::new();
        if self.pb_distance == self.last_distance {
            notices.push(format!("New PB distance! {:.2}km", self.pb_distance));
        }
        if self.pb_speed == self.last_speed {
            notices.push(format!("New PB speed! {:.2}km/hr", self.pb_speed));
        }
        notices
    }
}

/// Loaded run log with its derived statistics.
#[derive(Debug)]
pub struct Analysis {
    pub table: RunTable,
    pub summary: Summary,
}

impl Analysis {
    /// Derive the table and summary from records already in memory.
    pub fn new(table: RunTable) -> Result<Self> {
        let summary = Summary::new(&table).context("failed to compute summary")?;
        Ok(Self { table, summary })
    }

    /// Load the run log from a CSV file and derive all statistics.
    pub fn from_file<P: AsRef<Path>>(file: P, cfg: &Config) -> Result<Self> {
        let file = file.as_ref();
        let records = read_records(file, &cfg.input)?;
        let table = RunTable::new(records, cfg.stats.rolling_window)
            .with_context(|| format!("failed to build run table from {file:?}"))?;
        log::info!("loaded {} runs from {file:?}", table.len());

        let n_inf = table
            .rows()
            .iter()
            .filter(|row| row.avg_speed.is_infinite())
            .count();
        if n_inf > 0 {
            log::warn!("{n_inf} runs logged at midnight have an infinite speed");
        }

        Self::new(table)
    }

    pub fn summary_text(&self) -> String {
        self.summary.text()
    }

    pub fn avg_speed(&self) -> f64 {
        self.summary.mean_speed
    }

    pub fn avg_distance(&self) -> f64 {
        self.summary.mean_distance
    }
}
