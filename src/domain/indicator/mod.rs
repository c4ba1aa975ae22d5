//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values aligned with the price series
//!
//! Batch calculations live in one file per indicator; [`rolling`] holds the
//! incremental accumulators used for live bar-by-bar evaluation.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::error::StratError;
use crate::domain::ohlcv::PriceSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        n_std: f64,
    },
}

impl IndicatorType {
    pub fn bollinger(period: usize, n_std: f64) -> Self {
        IndicatorType::Bollinger { period, n_std }
    }

    /// Index of the first bar carrying a valid value.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Atr(p)
            | IndicatorType::Bollinger { period: p, .. } => p.saturating_sub(1),
            IndicatorType::Rsi(p) => *p,
            IndicatorType::Macd { slow, signal, .. } => {
                slow.saturating_sub(1) + signal.saturating_sub(1)
            }
        }
    }

    pub fn validate(&self) -> Result<(), StratError> {
        let positive = |key: &str, v: usize| {
            if v == 0 {
                Err(StratError::invalid("indicator", key, "period must be positive"))
            } else {
                Ok(())
            }
        };
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Rsi(p)
            | IndicatorType::Atr(p) => positive("period", *p),
            IndicatorType::Bollinger { period, n_std } => {
                positive("period", *period)?;
                if !(n_std.is_finite() && *n_std > 0.0) {
                    return Err(StratError::invalid(
                        "indicator",
                        "n_std",
                        "standard deviation multiplier must be positive",
                    ));
                }
                Ok(())
            }
            IndicatorType::Macd { fast, slow, signal } => {
                positive("fast", *fast)?;
                positive("slow", *slow)?;
                positive("signal", *signal)?;
                if fast >= slow {
                    return Err(StratError::invalid(
                        "indicator",
                        "fast",
                        "fast period must be less than slow period",
                    ));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Single-valued view; `None` for warm-up points and multi-field values.
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .map(|p| match (p.valid, p.value) {
                (true, IndicatorValue::Simple(v)) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, n_std } => {
                write!(f, "BOLLINGER({},{})", period, n_std)
            }
        }
    }
}

/// Compute any supported indicator over a price series.
pub fn compute_indicator(
    series: &PriceSeries,
    kind: &IndicatorType,
) -> Result<IndicatorSeries, StratError> {
    kind.validate()?;
    if series.is_empty() {
        return Err(StratError::EmptySeries);
    }
    let bars = series.bars();
    let computed = match *kind {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::Ema(period) => calculate_ema(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        IndicatorType::Atr(period) => calculate_atr(bars, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
        IndicatorType::Bollinger { period, n_std } => calculate_bollinger(bars, period, n_std),
    };
    Ok(computed)
}

/// Warm-up placeholder shared by the batch calculations.
pub(crate) fn invalid_point(timestamp: NaiveDateTime, value: IndicatorValue) -> IndicatorPoint {
    IndicatorPoint {
        timestamp,
        valid: false,
        value,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_bars;
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        assert_eq!(IndicatorType::bollinger(20, 2.0).to_string(), "BOLLINGER(20,2)");
        assert_eq!(IndicatorType::bollinger(20, 2.5).to_string(), "BOLLINGER(20,2.5)");
    }

    #[test]
    fn bollinger_keeps_exact_multiplier() {
        let bars = make_bars(&[4.0, 5.0, 6.0, 5.5, 7.0]);
        let series = PriceSeries::new(bars.clone()).unwrap();
        for n_std in [2.123, 0.004] {
            let computed = compute_indicator(&series, &IndicatorType::bollinger(3, n_std)).unwrap();
            assert_eq!(computed, calculate_bollinger(&bars, 3, n_std));
        }
    }

    #[test]
    fn bollinger_rejects_non_positive_multiplier() {
        let series = PriceSeries::new(make_bars(&[1.0, 2.0, 3.0])).unwrap();
        for n_std in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                compute_indicator(&series, &IndicatorType::bollinger(3, n_std)),
                Err(StratError::InvalidConfig { key, .. }) if key == "n_std"
            ));
        }
    }

    #[test]
    fn warmup_per_kind() {
        assert_eq!(IndicatorType::Sma(5).warmup(), 4);
        assert_eq!(IndicatorType::Rsi(14).warmup(), 14);
        assert_eq!(
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .warmup(),
            33
        );
    }

    #[test]
    fn compute_dispatches_and_aligns() {
        let series = PriceSeries::new(make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        let sma = compute_indicator(&series, &IndicatorType::Sma(2)).unwrap();
        assert_eq!(sma.len(), series.len());
        assert_eq!(sma.indicator_type, IndicatorType::Sma(2));
        assert_eq!(sma.simple_values()[0], None);
        assert_eq!(sma.simple_values()[1], Some(1.5));
    }

    #[test]
    fn compute_rejects_zero_period() {
        let series = PriceSeries::new(make_bars(&[1.0, 2.0])).unwrap();
        let err = compute_indicator(&series, &IndicatorType::Ema(0)).unwrap_err();
        assert!(matches!(err, StratError::InvalidConfig { .. }));
    }

    #[test]
    fn compute_rejects_inverted_macd() {
        let series = PriceSeries::new(make_bars(&[1.0, 2.0])).unwrap();
        let kind = IndicatorType::Macd {
            fast: 26,
            slow: 12,
            signal: 9,
        };
        assert!(matches!(
            compute_indicator(&series, &kind),
            Err(StratError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn compute_rejects_empty_series() {
        let series = PriceSeries::default();
        assert!(matches!(
            compute_indicator(&series, &IndicatorType::Sma(3)),
            Err(StratError::EmptySeries)
        ));
    }
}
