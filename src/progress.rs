use crate::config::ProgressConfig;
use crate::error::HistoryError;
use crate::model::RunTable;
use crate::stats::{compute_max, compute_mean};
use chrono::TimeDelta;
use std::fmt;

/// Baseline the last run is compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub n_runs: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
}

/// Warning about a last run well above its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressWarning {
    /// Excess over the window average, in percent.
    AboveAverage(f64),
    /// Excess over the window maximum, in percent.
    AboveMax(f64),
}

impl fmt::Display for ProgressWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AboveAverage(pct) => {
                write!(f, "The last run exceeded the previous week average by {pct:.0}%.")
            }
            Self::AboveMax(pct) => {
                write!(f, "The last run exceeded the previous week max by {pct:.0}%.")
            }
        }
    }
}

/// Collect the distances logged in the window before the last run.
///
/// # Errors
/// Returns [`HistoryError::EmptyWindow`] if no run falls in the window.
pub fn baseline(table: &RunTable, cfg: &ProgressConfig) -> Result<Baseline, HistoryError> {
    let last = table.last().date_time();
    let start = last - TimeDelta::days(cfg.window_start_days);
    let end = last - TimeDelta::days(cfg.window_end_days);

    let distances: Vec<f64> = table
        .rows()
        .iter()
        .filter(|row| (start..=end).contains(&row.date_time()))
        .map(|row| row.distance())
        .collect();
    log::debug!("{} runs between {start} and {end}", distances.len());

    if distances.is_empty() {
        return Err(HistoryError::EmptyWindow { start, end });
    }

    Ok(Baseline {
        n_runs: distances.len(),
        avg_distance: compute_mean(&distances),
        max_distance: compute_max(&distances),
    })
}

/// Compare the last run's distance against the window average and maximum.
///
/// Both checks are independent, so zero, one or two warnings are returned.
pub fn check_progress_rate(
    table: &RunTable,
    cfg: &ProgressConfig,
) -> Result<Vec<ProgressWarning>, HistoryError> {
    let base = baseline(table, cfg)?;
    log::debug!(
        "baseline of {} runs: avg {:.2} km, max {:.2} km",
        base.n_runs,
        base.avg_distance,
        base.max_distance
    );

    let last = table.last().distance();
    let mut warnings = Vec::new();
    if last > base.avg_distance + base.avg_distance * cfg.threshold {
        let pct = excess_pct(last, base.avg_distance);
        warnings.push(ProgressWarning::AboveAverage(pct));
    }
    if last > base.max_distance + base.max_distance * cfg.threshold {
        let pct = excess_pct(last, base.max_distance);
        warnings.push(ProgressWarning::AboveMax(pct));
    }
    Ok(warnings)
}

fn excess_pct(val: f64, reference: f64) -> f64 {
    (val - reference) * 100.0 / reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunRecord;
    use crate::model::tests::at;

    fn table(runs: &[(u32, f64)]) -> RunTable {
        let records = runs
            .iter()
            .map(|&(day, distance)| RunRecord::new(at(day, 0, 30), distance))
            .collect();
        RunTable::new(records, 5).unwrap()
    }

    fn check(runs: &[(u32, f64)]) -> Result<Vec<ProgressWarning>, HistoryError> {
        check_progress_rate(&table(runs), &ProgressConfig::default())
    }

    #[test]
    fn only_average_warning() {
        // Window average 10, max 11.
        let warnings = check(&[(10, 9.0), (12, 11.0), (15, 10.0), (17, 12.0)]).unwrap();
        assert_eq!(warnings, vec![ProgressWarning::AboveAverage(20.0)]);
        assert_eq!(
            warnings[0].to_string(),
            "The last run exceeded the previous week average by 20%."
        );
    }

    #[test]
    fn max_warning_implies_average_warning() {
        // Window average 8, max 10. Any run beyond the max threshold also
        // beats the lower average threshold.
        let warnings = check(&[(10, 6.0), (14, 10.0), (17, 11.5)]).unwrap();
        assert_eq!(warnings.len(), 2);
        let ProgressWarning::AboveMax(pct) = warnings[1] else {
            panic!("expected a max warning, got {warnings:?}");
        };
        assert!((pct - 15.0).abs() < 1e-9);
    }

    #[test]
    fn zero_threshold_warns_on_any_excess() {
        // Window average 10, max 11.
        let cfg = ProgressConfig {
            threshold: 0.0,
            ..ProgressConfig::default()
        };
        let warnings = check_progress_rate(&table(&[(10, 9.0), (14, 11.0), (17, 10.5)]), &cfg);
        assert_eq!(warnings.unwrap(), vec![ProgressWarning::AboveAverage(5.0)]);
    }

    #[test]
    fn both_warnings() {
        let warnings = check(&[(10, 5.0), (14, 7.0), (17, 9.0)]).unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], ProgressWarning::AboveAverage(50.0));
        assert_eq!(warnings[1], ProgressWarning::AboveMax(200.0 / 7.0));
        assert_eq!(
            warnings[1].to_string(),
            "The last run exceeded the previous week max by 29%."
        );
    }

    #[test]
    fn no_warning() {
        assert!(check(&[(10, 9.0), (14, 11.0), (17, 10.5)]).unwrap().is_empty());
    }

    #[test]
    fn window_is_inclusive_and_skips_last_day() {
        // Day 9 is exactly 8 days before the last run, day 16 exactly 1 day.
        let base = baseline(
            &table(&[(8, 100.0), (9, 4.0), (16, 6.0), (17, 5.0)]),
            &ProgressConfig::default(),
        )
        .unwrap();
        assert_eq!(base.n_runs, 2);
        assert_eq!(base.avg_distance, 5.0);
        assert_eq!(base.max_distance, 6.0);
    }

    #[test]
    fn empty_window_is_an_error() {
        let err = check(&[(1, 5.0), (17, 6.0)]).unwrap_err();
        assert!(matches!(err, HistoryError::EmptyWindow { .. }));
    }
}
