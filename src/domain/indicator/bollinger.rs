//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1); a one-bar window
//! has zero width.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::sma::window_mean;
use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

const EMPTY_BANDS: IndicatorValue = IndicatorValue::Bollinger {
    upper: 0.0,
    middle: 0.0,
    lower: 0.0,
};

pub fn calculate_bollinger(bars: &[PriceBar], period: usize, mult: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(invalid_point(bar.timestamp, EMPTY_BANDS));
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let middle = window_mean(window.iter().map(|b| b.close), period);
        let stddev = sample_stddev(window.iter().map(|b| b.close), middle, period);

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Bollinger {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::bollinger(period, mult),
        values,
    }
}

pub(crate) fn sample_stddev(window: impl Iterator<Item = f64>, mean: f64, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = window
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum();
    (sum_sq / (n - 1) as f64).sqrt()
}
