//! Moving-average crossover: BUY when the fast MA crosses above the slow MA,
//! SELL when it crosses back below.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::StratError;
use crate::domain::indicator::{calculate_ema, calculate_sma};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{crossed_above, crossed_below, CrossingState, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaType {
    #[default]
    Sma,
    Ema,
}

impl FromStr for MaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(MaType::Sma),
            "ema" => Ok(MaType::Ema),
            other => Err(format!("unknown moving average type '{}'", other)),
        }
    }
}

impl fmt::Display for MaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaType::Sma => write!(f, "SMA"),
            MaType::Ema => write!(f, "EMA"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub ma_type: MaType,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            ma_type: MaType::Sma,
        }
    }
}

impl MaCrossoverParams {
    pub fn validate(&self) -> Result<(), StratError> {
        if self.fast_period == 0 {
            return Err(StratError::invalid(
                "strategy",
                "fast_period",
                "must be positive",
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StratError::invalid(
                "strategy",
                "fast_period",
                "fast_period must be less than slow_period",
            ));
        }
        Ok(())
    }

    pub fn minimum_bars(&self) -> usize {
        self.slow_period
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MaSnapshot {
    pub fast: f64,
    pub slow: f64,
}

/// Per-bar crossing rule shared by batch and live evaluation.
#[derive(Debug, Clone, Default)]
pub(crate) struct MaCrossoverRule {
    prev: Option<MaSnapshot>,
    state: CrossingState,
}

impl MaCrossoverRule {
    pub fn step(&mut self, current: Option<MaSnapshot>) -> Signal {
        let prev = std::mem::replace(&mut self.prev, current);
        let (Some(p), Some(c)) = (prev, current) else {
            return Signal::Hold;
        };
        let candidate = if crossed_above(p.fast, p.slow, c.fast, c.slow) {
            Signal::Buy
        } else if crossed_below(p.fast, p.slow, c.fast, c.slow) {
            Signal::Sell
        } else {
            Signal::Hold
        };
        self.state.apply(candidate)
    }
}

pub(crate) fn generate(bars: &[PriceBar], params: &MaCrossoverParams) -> Vec<Signal> {
    let (fast, slow) = match params.ma_type {
        MaType::Sma => (
            calculate_sma(bars, params.fast_period).simple_values(),
            calculate_sma(bars, params.slow_period).simple_values(),
        ),
        MaType::Ema => (
            calculate_ema(bars, params.fast_period).simple_values(),
            calculate_ema(bars, params.slow_period).simple_values(),
        ),
    };

    let mut rule = MaCrossoverRule::default();
    fast.into_iter()
        .zip(slow)
        .map(|(f, s)| {
            let snapshot = match (f, s) {
                (Some(fast), Some(slow)) => Some(MaSnapshot { fast, slow }),
                _ => None,
            };
            rule.step(snapshot)
        })
        .collect()
}
