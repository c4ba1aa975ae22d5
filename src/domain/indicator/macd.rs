//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars

use crate::domain::indicator::ema::ema_of;
use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// Per-bar MACD components, `None` until each part has warmed up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacdComponents {
    pub line: Option<f64>,
    pub signal: Option<f64>,
}

impl MacdComponents {
    pub fn histogram(&self) -> Option<f64> {
        Some(self.line? - self.signal?)
    }
}

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let components = macd_components(bars, fast, slow, signal_period);

    let values = components
        .iter()
        .zip(bars)
        .map(|(c, bar)| match (c.line, c.signal) {
            (Some(line), Some(signal)) => IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            },
            (line, _) => invalid_point(
                bar.timestamp,
                IndicatorValue::Macd {
                    line: line.unwrap_or(0.0),
                    signal: 0.0,
                    histogram: 0.0,
                },
            ),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Macd {
            fast,
            slow,
            signal: signal_period,
        },
        values,
    }
}

pub(crate) fn macd_components(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<MacdComponents> {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return vec![MacdComponents::default(); bars.len()];
    }

    let ema_fast = ema_of(bars.iter().map(|b| b.close), fast);
    let ema_slow = ema_of(bars.iter().map(|b| b.close), slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let line_start = line.iter().position(Option::is_some).unwrap_or(line.len());
    let mut signal = vec![None; line_start];
    signal.extend(ema_of(line[line_start..].iter().flatten().copied(), signal_period));

    line.into_iter()
        .zip(signal)
        .map(|(line, signal)| MacdComponents { line, signal })
        .collect()
}
