use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path, path::PathBuf};

/// Input configuration parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Header of the timestamp column.
    pub date_time_column: String,
    /// Header of the distance column (kilometers).
    pub distance_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            date_time_column: "DateTime".to_string(),
            distance_column: "Distance".to_string(),
        }
    }
}

/// Statistics configuration parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    /// Number of runs in each trailing rolling mean.
    pub rolling_window: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { rolling_window: 5 }
    }
}

/// Progress check configuration parameters.
///
/// The baseline window covers `[last - window_start_days, last - window_end_days]`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressConfig {
    /// Days before the last run where the window starts.
    pub window_start_days: i64,
    /// Days before the last run where the window ends.
    pub window_end_days: i64,
    /// Relative excess over the baseline that triggers a warning.
    pub threshold: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            window_start_days: 8,
            window_end_days: 1,
            threshold: 0.1,
        }
    }
}

/// Chart configuration parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    /// Output file; the extension selects PNG or SVG.
    pub output: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Title prefix.
    pub title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("runlog.png"),
            width: 2000,
            height: 1000,
            title: "Run log".to_string(),
        }
    }
}

/// Analysis configuration parameters.
///
/// Every section is optional and falls back to its defaults.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: InputConfig,
    pub stats: StatsConfig,
    pub progress: ProgressConfig,
    pub chart: ChartConfig,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded. Performs validation on all parameters
    /// before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_name(&self.input.date_time_column).context("invalid date time column")?;
        check_name(&self.input.distance_column).context("invalid distance column")?;
        if self.input.date_time_column == self.input.distance_column {
            bail!("date time and distance columns must differ");
        }

        check_num(self.stats.rolling_window, 1..1000).context("invalid rolling window")?;

        let progress = &self.progress;
        check_num(progress.window_start_days, 0..366).context("invalid window start")?;
        check_num(progress.window_end_days, 0..366).context("invalid window end")?;
        if progress.window_start_days <= progress.window_end_days {
            bail!(
                "window start ({} days) must lie before window end ({} days)",
                progress.window_start_days,
                progress.window_end_days
            );
        }
        check_num(progress.threshold, 0.0..10.0).context("invalid progress threshold")?;

        check_num(self.chart.width, 200..10_000).context("invalid chart width")?;
        check_num(self.chart.height, 200..10_000).context("invalid chart height")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("column name must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        cfg.validate().expect("default config should validate");
        assert_eq!(cfg.input.date_time_column, "DateTime");
        assert_eq!(cfg.stats.rolling_window, 5);
        assert_eq!(cfg.progress.window_start_days, 8);
        assert_eq!(cfg.progress.window_end_days, 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str("[progress]\nthreshold = 0.25\n").unwrap();
        assert_eq!(cfg.progress.threshold, 0.25);
        assert_eq!(cfg.progress.window_start_days, 8);
        assert_eq!(cfg.chart, ChartConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = Config::default();
        cfg.stats.rolling_window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.progress.window_start_days = 1;
        cfg.progress.window_end_days = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.input.distance_column = "DateTime".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[stats]\nwindow = 3\n").is_err());
    }
}
