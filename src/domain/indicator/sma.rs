//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(invalid_point(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }
        let mean = window_mean(bars[i + 1 - period..=i].iter().map(|b| b.close), period);
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(mean),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// Mean of one full window, summed oldest to newest.
///
/// The batch calculations and the incremental accumulators both go through
/// this, so the two agree bit for bit.
pub(crate) fn window_mean(window: impl IntoIterator<Item = f64>, period: usize) -> f64 {
    window.into_iter().sum::<f64>() / period as f64
}
