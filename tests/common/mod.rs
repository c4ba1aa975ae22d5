#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use stratbench::domain::error::StratError;
use stratbench::domain::ohlcv::{PriceBar, PriceSeries};
use stratbench::domain::signal::{Signal, SignalPoint, SignalStream};
use stratbench::ports::data_port::DataPort;
use tempfile::NamedTempFile;

/// In-memory price source keyed by path.
pub struct MockDataPort {
    pub series: HashMap<PathBuf, PriceSeries>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    pub fn with_series(mut self, path: &str, series: PriceSeries) -> Self {
        self.series.insert(PathBuf::from(path), series);
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, path: &Path) -> Result<PriceSeries, StratError> {
        self.series.get(path).cloned().ok_or_else(|| StratError::Data {
            reason: format!("no series at {}", path.display()),
        })
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly bars from 2024-01-01 with open = high = low = close.
pub fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: start() + Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn make_series(prices: &[f64]) -> PriceSeries {
    PriceSeries::new(make_bars(prices)).unwrap()
}

/// Bars with a spread around the close, for ATR-based strategies.
pub fn make_ranged_series(prices: &[f64]) -> PriceSeries {
    let bars = make_bars(prices)
        .into_iter()
        .map(|bar| PriceBar {
            high: bar.close + 2.0,
            low: bar.close - 3.0,
            ..bar
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

/// Hand-written signals aligned with `series`.
pub fn stream_from(series: &PriceSeries, signals: &[Signal]) -> SignalStream {
    assert_eq!(series.len(), signals.len());
    SignalStream {
        points: series
            .bars()
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(index, (bar, &signal))| SignalPoint {
                index,
                timestamp: bar.timestamp,
                signal,
            })
            .collect(),
    }
}

/// Oscillating series with a slow upward drift.
pub fn wave(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let i = i as f64;
            100.0 + 10.0 * (i / 6.0).sin() + 4.0 * (i / 2.5).cos() + i * 0.05
        })
        .collect()
}

/// CSV text in the loader's format, one row per price.
pub fn bars_csv(prices: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for bar in make_bars(prices) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.close + 1.0,
            bar.close - 1.0,
            bar.close,
            bar.volume
        ));
    }
    out
}

pub fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
