//! CSV price-bar loader.
//!
//! Expects a header row followed by `timestamp,open,high,low,close,volume`.
//! The timestamp may be epoch milliseconds or one of the text formats in
//! [`TIMESTAMP_FORMATS`]; a bare date is taken as midnight.

use crate::domain::error::StratError;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;

pub const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvAdapter;

impl CsvAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse CSV text already in memory.
    pub fn parse(&self, content: &str) -> Result<PriceSeries, StratError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            // header is line 1
            let line = row + 2;
            let record = result.map_err(|e| StratError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = parse_timestamp(field(&record, line, 0, "timestamp")?).ok_or_else(
                || StratError::Data {
                    reason: format!("line {}: unrecognised timestamp", line),
                },
            )?;

            bars.push(PriceBar {
                timestamp,
                open: number(&record, line, 1, "open")?,
                high: number(&record, line, 2, "high")?,
                low: number(&record, line, 3, "low")?,
                close: number(&record, line, 4, "close")?,
                volume: number(&record, line, 5, "volume")?,
            });
        }

        PriceSeries::new(bars)
    }
}

impl DataPort for CsvAdapter {
    fn load_series(&self, path: &Path) -> Result<PriceSeries, StratError> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    line: usize,
    idx: usize,
    name: &str,
) -> Result<&'r str, StratError> {
    record.get(idx).ok_or_else(|| StratError::Data {
        reason: format!("line {}: missing {} column", line, name),
    })
}

fn number(
    record: &csv::StringRecord,
    line: usize,
    idx: usize,
    name: &str,
) -> Result<f64, StratError> {
    let raw = field(record, line, idx, name)?;
    let value = raw.parse::<f64>().map_err(|e| StratError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(StratError::Data {
            reason: format!(
                "line {}: {} must be finite and non-negative, got '{}'",
                line, name, raw
            ),
        });
    }
    Ok(value)
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
