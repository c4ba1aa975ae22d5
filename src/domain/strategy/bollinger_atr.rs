//! Bollinger mean reversion with an ATR protective stop.
//!
//! Entry: close crosses below the lower band. The stop is placed at
//! `close - atr_multiplier * ATR` on the entry bar and, with `trailing_stop`,
//! ratchets upward on later bars. Exit: stop hit (checked first) or close
//! reaching the configured exit band.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::StratError;
use crate::domain::indicator::rolling::Bands;
use crate::domain::indicator::bollinger::{DEFAULT_MULTIPLIER, DEFAULT_PERIOD};
use crate::domain::indicator::{calculate_atr, calculate_bollinger, IndicatorValue};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{crossed_below, CrossingState, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitBand {
    #[default]
    Middle,
    Upper,
}

impl FromStr for ExitBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "middle" => Ok(ExitBand::Middle),
            "upper" => Ok(ExitBand::Upper),
            other => Err(format!("unknown exit band '{}'", other)),
        }
    }
}

impl fmt::Display for ExitBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitBand::Middle => write!(f, "middle"),
            ExitBand::Upper => write!(f, "upper"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerAtrParams {
    pub period: usize,
    pub n_std: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub use_atr_stop: bool,
    pub trailing_stop: bool,
    pub exit_band: ExitBand,
}

impl Default for BollingerAtrParams {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            n_std: DEFAULT_MULTIPLIER,
            atr_period: 14,
            atr_multiplier: 2.0,
            use_atr_stop: true,
            trailing_stop: false,
            exit_band: ExitBand::Middle,
        }
    }
}

impl BollingerAtrParams {
    pub fn validate(&self) -> Result<(), StratError> {
        if self.period == 0 {
            return Err(StratError::invalid("strategy", "period", "must be positive"));
        }
        if !(self.n_std.is_finite() && self.n_std > 0.0) {
            return Err(StratError::invalid("strategy", "n_std", "must be positive"));
        }
        if self.atr_period == 0 {
            return Err(StratError::invalid(
                "strategy",
                "atr_period",
                "must be positive",
            ));
        }
        if !(self.atr_multiplier.is_finite() && self.atr_multiplier > 0.0) {
            return Err(StratError::invalid(
                "strategy",
                "atr_multiplier",
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn minimum_bars(&self) -> usize {
        if self.use_atr_stop {
            self.period.max(self.atr_period)
        } else {
            self.period
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BollingerSnapshot {
    pub close: f64,
    pub bands: Bands,
    pub atr: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct BollingerAtrRule {
    atr_multiplier: f64,
    use_atr_stop: bool,
    trailing_stop: bool,
    exit_band: ExitBand,
    prev: Option<BollingerSnapshot>,
    stop: Option<f64>,
    state: CrossingState,
}

impl BollingerAtrRule {
    pub fn new(params: &BollingerAtrParams) -> Self {
        Self {
            atr_multiplier: params.atr_multiplier,
            use_atr_stop: params.use_atr_stop,
            trailing_stop: params.trailing_stop,
            exit_band: params.exit_band,
            prev: None,
            stop: None,
            state: CrossingState::Flat,
        }
    }

    pub fn step(&mut self, current: Option<BollingerSnapshot>) -> Signal {
        let prev = std::mem::replace(&mut self.prev, current);
        let Some(c) = current else {
            return Signal::Hold;
        };
        match self.state {
            CrossingState::Flat => self.try_enter(prev, c),
            CrossingState::Long => self.try_exit(c),
        }
    }

    fn try_enter(&mut self, prev: Option<BollingerSnapshot>, c: BollingerSnapshot) -> Signal {
        let Some(p) = prev else {
            return Signal::Hold;
        };
        if !crossed_below(p.close, p.bands.lower, c.close, c.bands.lower) {
            return Signal::Hold;
        }
        self.stop = if self.use_atr_stop {
            match c.atr {
                Some(atr) => Some(c.close - self.atr_multiplier * atr),
                None => return Signal::Hold,
            }
        } else {
            None
        };
        self.state.apply(Signal::Buy)
    }

    fn try_exit(&mut self, c: BollingerSnapshot) -> Signal {
        if let Some(stop) = self.stop {
            if c.close <= stop {
                self.stop = None;
                return self.state.apply(Signal::Sell);
            }
        }

        let target = match self.exit_band {
            ExitBand::Middle => c.bands.middle,
            ExitBand::Upper => c.bands.upper,
        };
        if c.close >= target {
            self.stop = None;
            return self.state.apply(Signal::Sell);
        }

        if self.trailing_stop {
            if let (Some(stop), Some(atr)) = (self.stop, c.atr) {
                self.stop = Some(stop.max(c.close - self.atr_multiplier * atr));
            }
        }
        Signal::Hold
    }

    #[cfg(test)]
    pub(crate) fn stop(&self) -> Option<f64> {
        self.stop
    }
}

pub(crate) fn generate(bars: &[PriceBar], params: &BollingerAtrParams) -> Vec<Signal> {
    let bands = calculate_bollinger(bars, params.period, params.n_std);
    let atr = calculate_atr(bars, params.atr_period).simple_values();

    let mut rule = BollingerAtrRule::new(params);
    bars.iter()
        .zip(&bands.values)
        .zip(atr)
        .map(|((bar, point), atr)| {
            let snapshot = match (point.valid, point.value) {
                (
                    true,
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    },
                ) => Some(BollingerSnapshot {
                    close: bar.close,
                    bands: Bands {
                        upper,
                        middle,
                        lower,
                    },
                    atr,
                }),
                _ => None,
            };
            rule.step(snapshot)
        })
        .collect()
}
