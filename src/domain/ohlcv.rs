//! OHLCV bar representation and the ordered price series.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::error::StratError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Every price and the volume must be finite and non-negative.
    pub fn validate(&self) -> Result<(), StratError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(StratError::Data {
                    reason: format!(
                        "bar at {}: {} must be finite and non-negative, got {}",
                        self.timestamp, name, value
                    ),
                });
            }
        }
        Ok(())
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Valid bars with strictly increasing timestamps.
///
/// Bars and their ordering are checked on construction and on every append;
/// out-of-order or duplicate bars are rejected, never reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, StratError> {
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            check_order(&pair[0], &pair[1])?;
        }
        Ok(Self { bars })
    }

    /// Append a bar; the series is left untouched when the bar is late or invalid.
    pub fn push(&mut self, bar: PriceBar) -> Result<(), StratError> {
        bar.validate()?;
        if let Some(last) = self.bars.last() {
            check_order(last, &bar)?;
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

fn check_order(previous: &PriceBar, next: &PriceBar) -> Result<(), StratError> {
    if next.timestamp <= previous.timestamp {
        return Err(StratError::NonMonotonicTimestamp {
            previous: previous.timestamp,
            timestamp: next.timestamp,
        });
    }
    Ok(())
}
