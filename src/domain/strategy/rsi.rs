//! RSI threshold strategy: BUY on a recovery out of oversold, SELL on a
//! drop out of overbought.

use crate::domain::error::StratError;
use crate::domain::indicator::calculate_rsi;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{crossed_above, crossed_below, CrossingState, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<(), StratError> {
        if self.period == 0 {
            return Err(StratError::invalid("strategy", "period", "must be positive"));
        }
        if !self.oversold.is_finite() || !(0.0..=100.0).contains(&self.oversold) {
            return Err(StratError::invalid(
                "strategy",
                "oversold",
                "must be between 0 and 100",
            ));
        }
        if !self.overbought.is_finite() || !(0.0..=100.0).contains(&self.overbought) {
            return Err(StratError::invalid(
                "strategy",
                "overbought",
                "must be between 0 and 100",
            ));
        }
        if self.oversold >= self.overbought {
            return Err(StratError::invalid(
                "strategy",
                "oversold",
                "oversold must be below overbought",
            ));
        }
        Ok(())
    }

    pub fn minimum_bars(&self) -> usize {
        self.period + 1
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RsiRule {
    oversold: f64,
    overbought: f64,
    prev: Option<f64>,
    state: CrossingState,
}

impl RsiRule {
    pub fn new(params: &RsiParams) -> Self {
        Self {
            oversold: params.oversold,
            overbought: params.overbought,
            prev: None,
            state: CrossingState::Flat,
        }
    }

    pub fn step(&mut self, rsi: Option<f64>) -> Signal {
        let prev = std::mem::replace(&mut self.prev, rsi);
        let (Some(p), Some(c)) = (prev, rsi) else {
            return Signal::Hold;
        };
        let candidate = if crossed_above(p, self.oversold, c, self.oversold) {
            Signal::Buy
        } else if crossed_below(p, self.overbought, c, self.overbought) {
            Signal::Sell
        } else {
            Signal::Hold
        };
        self.state.apply(candidate)
    }
}

pub(crate) fn generate(bars: &[PriceBar], params: &RsiParams) -> Vec<Signal> {
    let mut rule = RsiRule::new(params);
    calculate_rsi(bars, params.period)
        .simple_values()
        .into_iter()
        .map(|rsi| rule.step(rsi))
        .collect()
}
