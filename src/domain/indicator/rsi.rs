//! RSI (Relative Strength Index) indicator implementation.
//!
//! Average gain and average loss are plain means of the last n close-to-close
//! changes (a rolling window, not Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 the ratio is undefined and RSI is reported as neutral 50.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::sma::window_mean;
use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let (gains, losses) = gains_and_losses(bars);
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i < period {
            values.push(invalid_point(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }

        // gains[j - 1] is the change into bar j
        let window = i - period..i;
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(rsi_from_averages(
                window_mean(gains[window.clone()].iter().copied(), period),
                window_mean(losses[window].iter().copied(), period),
            )),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

/// Per-change gain and loss, both non-negative; one entry per bar after the first.
fn gains_and_losses(bars: &[PriceBar]) -> (Vec<f64>, Vec<f64>) {
    bars.windows(2)
        .map(|pair| {
            let change = pair[1].close - pair[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip()
}

pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        NEUTRAL_RSI
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
