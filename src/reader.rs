use crate::config::InputConfig;
use crate::model::RunRecord;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::{fs::File, io::Read, path::Path};

const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Read all run records from a CSV file.
///
/// # Errors
/// Returns an error if the file cannot be opened, lacks one of the configured
/// columns or holds a field that cannot be parsed.
pub fn read_records<P: AsRef<Path>>(file: P, cfg: &InputConfig) -> Result<Vec<RunRecord>> {
    let file = file.as_ref();
    let reader = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    parse_records(reader, cfg).with_context(|| format!("failed to read records from {file:?}"))
}

pub fn parse_records<R: Read>(reader: R, cfg: &InputConfig) -> Result<Vec<RunRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers().context("failed to read header row")?.clone();
    let i_date_time = find_column(&headers, &cfg.date_time_column)?;
    let i_distance = find_column(&headers, &cfg.distance_column)?;

    let mut records = Vec::new();
    for (i_row, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = i_row + 2;
        let row = row.with_context(|| format!("failed to read line {line}"))?;

        let date_time = row.get(i_date_time).unwrap_or_default();
        let date_time = parse_date_time(date_time)
            .with_context(|| format!("invalid {} on line {line}", cfg.date_time_column))?;

        let distance = row.get(i_distance).unwrap_or_default();
        let distance = parse_distance(distance)
            .with_context(|| format!("invalid {} on line {line}", cfg.distance_column))?;

        let extra = headers
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(idx, _)| *idx != i_date_time && *idx != i_distance)
            .map(|(_, (name, val))| (name.to_string(), val.to_string()))
            .collect();

        records.push(RunRecord {
            date_time,
            distance,
            extra,
        });
    }

    log::debug!("parsed {} records", records.len());

    Ok(records)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .with_context(|| format!("missing column {name:?} in header {headers:?}"))
}

pub fn parse_date_time(val: &str) -> Result<NaiveDateTime> {
    for fmt in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(val, fmt) {
            return Ok(date_time);
        }
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(val) {
        return Ok(date_time.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(val, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    bail!("cannot parse {val:?} as a date and time")
}

fn parse_distance(val: &str) -> Result<f64> {
    let distance: f64 = val
        .parse()
        .with_context(|| format!("cannot parse {val:?} as a number"))?;
    if !distance.is_finite() || distance <= 0.0 {
        bail!("distance must be a positive number, but is {distance}");
    }
    Ok(distance)
}
