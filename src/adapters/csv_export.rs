//! CSV export of run output: trades, equity curve and signal stream.
//!
//! Records are written through `serde::Serialize`, so the header row follows
//! the struct field names.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::domain::error::StratError;
use crate::domain::indicator::{IndicatorSeries, IndicatorValue};
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;
use crate::domain::signal::SignalStream;

pub fn write_trades<W: io::Write>(out: W, trades: &[Trade]) -> Result<(), StratError> {
    write_records(out, trades)
}

pub fn write_equity_curve<W: io::Write>(
    out: W,
    curve: &[EquityPoint],
) -> Result<(), StratError> {
    write_records(out, curve)
}

/// Every bar, HOLD included.
pub fn write_signals<W: io::Write>(out: W, stream: &SignalStream) -> Result<(), StratError> {
    write_records(out, &stream.points)
}

#[derive(Debug, Serialize)]
struct IndicatorRow {
    timestamp: chrono::NaiveDateTime,
    valid: bool,
    value: Option<f64>,
    upper: Option<f64>,
    middle: Option<f64>,
    lower: Option<f64>,
    line: Option<f64>,
    signal: Option<f64>,
    histogram: Option<f64>,
}

/// One row per bar; fields that do not apply to the indicator are empty.
pub fn write_indicator<W: io::Write>(out: W, series: &IndicatorSeries) -> Result<(), StratError> {
    let rows: Vec<IndicatorRow> = series
        .values
        .iter()
        .map(|point| {
            let mut row = IndicatorRow {
                timestamp: point.timestamp,
                valid: point.valid,
                value: None,
                upper: None,
                middle: None,
                lower: None,
                line: None,
                signal: None,
                histogram: None,
            };
            if point.valid {
                match point.value {
                    IndicatorValue::Simple(v) => row.value = Some(v),
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    } => {
                        row.upper = Some(upper);
                        row.middle = Some(middle);
                        row.lower = Some(lower);
                    }
                    IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    } => {
                        row.line = Some(line);
                        row.signal = Some(signal);
                        row.histogram = Some(histogram);
                    }
                }
            }
            row
        })
        .collect();
    write_records(out, &rows)
}

/// Create (or truncate) `path` for one of the writers above.
pub fn create_file(path: &Path) -> Result<File, StratError> {
    Ok(File::create(path)?)
}

fn write_records<W: io::Write, T: Serialize>(out: W, records: &[T]) -> Result<(), StratError> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer.serialize(record).map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}
