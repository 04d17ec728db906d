use chrono::NaiveDateTime;
use thiserror::Error;

/// Conditions under which the log holds too little history to derive a statistic.
#[derive(Debug, PartialEq, Error)]
pub enum HistoryError {
    #[error("run log contains no records")]
    EmptyLog,

    #[error("run log contains more than one record at {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("run log spans {days} days, at least 7 are needed for a weekly frequency")]
    ShortSpan { days: i64 },

    #[error("no runs between {start} and {end} to compare the last run against")]
    EmptyWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}
