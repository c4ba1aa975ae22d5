//! MACD line / signal line crossover, evaluated on the histogram.
//!
//! With a threshold `t`, BUY needs the histogram to rise through `-t` and
//! SELL needs it to fall through `t`. At `t = 0` this is the plain line /
//! signal crossover.

use crate::domain::error::StratError;
use crate::domain::indicator::macd::{macd_components, DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{crossed_above, crossed_below, CrossingState, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub histogram_threshold: f64,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
            histogram_threshold: 0.0,
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<(), StratError> {
        for (key, value) in [("fast", self.fast), ("slow", self.slow), ("signal", self.signal)] {
            if value == 0 {
                return Err(StratError::invalid("strategy", key, "must be positive"));
            }
        }
        if self.fast >= self.slow {
            return Err(StratError::invalid(
                "strategy",
                "fast",
                "fast period must be less than slow period",
            ));
        }
        if !(self.histogram_threshold.is_finite() && self.histogram_threshold >= 0.0) {
            return Err(StratError::invalid(
                "strategy",
                "histogram_threshold",
                "must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn minimum_bars(&self) -> usize {
        self.slow + self.signal - 1
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MacdRule {
    threshold: f64,
    prev: Option<f64>,
    state: CrossingState,
}

impl MacdRule {
    pub fn new(params: &MacdParams) -> Self {
        Self {
            threshold: params.histogram_threshold,
            prev: None,
            state: CrossingState::Flat,
        }
    }

    pub fn step(&mut self, histogram: Option<f64>) -> Signal {
        let prev = std::mem::replace(&mut self.prev, histogram);
        let (Some(p), Some(h)) = (prev, histogram) else {
            return Signal::Hold;
        };
        let t = self.threshold;
        let candidate = if crossed_above(p, -t, h, -t) {
            Signal::Buy
        } else if crossed_below(p, t, h, t) {
            Signal::Sell
        } else {
            Signal::Hold
        };
        self.state.apply(candidate)
    }
}

pub(crate) fn generate(bars: &[PriceBar], params: &MacdParams) -> Vec<Signal> {
    let mut rule = MacdRule::new(params);
    macd_components(bars, params.fast, params.slow, params.signal)
        .iter()
        .map(|c| rule.step(c.histogram()))
        .collect()
}
