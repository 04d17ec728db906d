//! Run log data types.

use crate::error::HistoryError;
use crate::stats::rolling_mean;
use chrono::{NaiveDateTime, Timelike};

/// One logged run as read from the log file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Start of the run (naive local time).
    pub date_time: NaiveDateTime,
    /// Distance in kilometers.
    pub distance: f64,
    /// Remaining columns as `(header, value)` pairs.
    pub extra: Vec<(String, String)>,
}

impl RunRecord {
    #[cfg(test)]
    pub fn new(date_time: NaiveDateTime, distance: f64) -> Self {
        Self {
            date_time,
            distance,
            extra: Vec::new(),
        }
    }

    /// Minutes since midnight of the run's day.
    ///
    /// This is the clock time of the record, not the duration of the run.
    pub fn total_time(&self) -> f64 {
        let time = self.date_time.time();
        time.hour() as f64 * 60.0 + time.minute() as f64 + time.second() as f64 / 60.0
    }
}

/// Run record with its derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub record: RunRecord,
    /// See [`RunRecord::total_time`].
    pub total_time: f64,
    /// Distance over `total_time`, in km/h.
    pub avg_speed: f64,
    pub speed_rolling_mean: Option<f64>,
    pub distance_rolling_mean: Option<f64>,
    pub runtime_rolling_mean: Option<f64>,
}

impl RunRow {
    pub fn date_time(&self) -> NaiveDateTime {
        self.record.date_time
    }

    pub fn distance(&self) -> f64 {
        self.record.distance
    }
}

/// Chronologically ordered run table.
///
/// Built once from the records and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunTable {
    rows: Vec<RunRow>,
    rolling_window: usize,
}

impl RunTable {
    /// Sort the records, reject duplicate timestamps and derive all columns.
    pub fn new(mut records: Vec<RunRecord>, rolling_window: usize) -> Result<Self, HistoryError> {
        if records.is_empty() {
            return Err(HistoryError::EmptyLog);
        }
        records.sort_by_key(|rec| rec.date_time);
        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[0].date_time == pair[1].date_time)
        {
            return Err(HistoryError::DuplicateTimestamp(pair[0].date_time));
        }

        let total_times: Vec<f64> = records.iter().map(RunRecord::total_time).collect();
        let speeds: Vec<f64> = records
            .iter()
            .zip(&total_times)
            .map(|(rec, &total_time)| rec.distance / total_time * 60.0)
            .collect();
        let distances: Vec<f64> = records.iter().map(|rec| rec.distance).collect();

        let speed_means = rolling_mean(&speeds, rolling_window);
        let distance_means = rolling_mean(&distances, rolling_window);
        let runtime_means = rolling_mean(&total_times, rolling_window);

        let rows = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| RunRow {
                record,
                total_time: total_times[idx],
                avg_speed: speeds[idx],
                speed_rolling_mean: speed_means[idx],
                distance_rolling_mean: distance_means[idx],
                runtime_rolling_mean: runtime_means[idx],
            })
            .collect();

        Ok(Self {
            rows,
            rolling_window,
        })
    }

    pub fn rows(&self) -> &[RunRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rolling_window(&self) -> usize {
        self.rolling_window
    }

    pub fn first(&self) -> &RunRow {
        &self.rows[0]
    }

    pub fn last(&self) -> &RunRow {
        &self.rows[self.rows.len() - 1]
    }

    pub fn distances(&self) -> Vec<f64> {
        self.rows.iter().map(RunRow::distance).collect()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.avg_speed).collect()
    }

    pub fn total_times(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.total_time).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn total_time_is_clock_minutes() {
        let rec = RunRecord::new(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 25, 30)
                .unwrap(),
            5.0,
        );
        assert!((rec.total_time() - 25.5).abs() < 1e-12);
    }

    #[test]
    fn derives_speed_and_sorts() {
        let records = vec![
            RunRecord::new(at(3, 0, 30), 6.0),
            RunRecord::new(at(1, 0, 20), 4.0),
        ];
        let table = RunTable::new(records, 5).unwrap();
        assert_eq!(table.first().date_time(), at(1, 0, 20));
        assert!((table.first().avg_speed - 12.0).abs() < 1e-12);
        assert!((table.last().avg_speed - 12.0).abs() < 1e-12);
        assert!(table.rows().iter().all(|row| row.speed_rolling_mean.is_none()));
    }

    #[test]
    fn rolling_columns_start_at_fifth_row() {
        let records: Vec<_> = (1..=6)
            .map(|day| RunRecord::new(at(day, 0, 30), day as f64))
            .collect();
        let table = RunTable::new(records, 5).unwrap();
        let rows = table.rows();
        for row in &rows[..4] {
            assert!(row.distance_rolling_mean.is_none());
            assert!(row.speed_rolling_mean.is_none());
            assert!(row.runtime_rolling_mean.is_none());
        }
        assert!((rows[4].distance_rolling_mean.unwrap() - 3.0).abs() < 1e-12);
        assert!((rows[5].distance_rolling_mean.unwrap() - 4.0).abs() < 1e-12);
        assert!((rows[5].speed_rolling_mean.unwrap() - 8.0).abs() < 1e-12);
        assert!((rows[5].runtime_rolling_mean.unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert_eq!(RunTable::new(Vec::new(), 5).unwrap_err(), HistoryError::EmptyLog);

        let records = vec![
            RunRecord::new(at(2, 0, 30), 5.0),
            RunRecord::new(at(2, 0, 30), 6.0),
        ];
        assert_eq!(
            RunTable::new(records, 5).unwrap_err(),
            HistoryError::DuplicateTimestamp(at(2, 0, 30))
        );
    }
}
