//! Bar-by-bar strategy evaluation over incremental indicator state.

use chrono::NaiveDateTime;

use crate::domain::error::StratError;
use crate::domain::indicator::rolling::{
    Accumulator, AtrState, BollingerState, EmaState, MacdState, RsiState, SmaState,
};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{CrossingState, Signal, SignalPoint};
use crate::domain::strategy::bollinger_atr::{BollingerAtrRule, BollingerSnapshot};
use crate::domain::strategy::ma_crossover::{MaCrossoverRule, MaSnapshot};
use crate::domain::strategy::macd::MacdRule;
use crate::domain::strategy::rsi::RsiRule;
use crate::domain::strategy::{CombinationParams, MaType, StrategyConfig};

/// A strategy fed one bar at a time.
///
/// Replaying a series through `push` yields the same signals as
/// [`generate`](super::generate) on that series.
#[derive(Debug, Clone)]
pub struct LiveStrategy {
    config: StrategyConfig,
    engine: Engine,
    last_timestamp: Option<NaiveDateTime>,
    next_index: usize,
}

impl LiveStrategy {
    pub fn new(config: &StrategyConfig) -> Result<Self, StratError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            engine: Engine::build(config),
            last_timestamp: None,
            next_index: 0,
        })
    }

    /// Consume the next bar. A bar that does not advance time, or that carries
    /// a non-finite or negative field, is rejected and leaves the strategy
    /// untouched.
    pub fn push(&mut self, bar: &PriceBar) -> Result<SignalPoint, StratError> {
        bar.validate()?;
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(StratError::NonMonotonicTimestamp {
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
        let signal = self.engine.step(bar);
        let point = SignalPoint {
            index: self.next_index,
            timestamp: bar.timestamp,
            signal,
        };
        self.last_timestamp = Some(bar.timestamp);
        self.next_index += 1;
        Ok(point)
    }

    /// Back to the warm-up point, as if no bar had been seen.
    pub fn reset(&mut self) {
        self.engine = Engine::build(&self.config);
        self.last_timestamp = None;
        self.next_index = 0;
    }

    pub fn bars_seen(&self) -> usize {
        self.next_index
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }
}

#[derive(Debug, Clone)]
enum MovingAverage {
    Sma(SmaState),
    Ema(EmaState),
}

impl MovingAverage {
    fn new(ma_type: MaType, period: usize) -> Self {
        match ma_type {
            MaType::Sma => MovingAverage::Sma(SmaState::new(period)),
            MaType::Ema => MovingAverage::Ema(EmaState::new(period)),
        }
    }

    fn update(&mut self, bar: &PriceBar) -> Option<f64> {
        match self {
            MovingAverage::Sma(s) => s.update(bar),
            MovingAverage::Ema(s) => s.update(bar),
        }
    }
}

#[derive(Debug, Clone)]
enum Engine {
    MaCrossover {
        fast: MovingAverage,
        slow: MovingAverage,
        rule: MaCrossoverRule,
    },
    Rsi {
        rsi: RsiState,
        rule: RsiRule,
    },
    BollingerAtr {
        bands: BollingerState,
        atr: AtrState,
        rule: BollingerAtrRule,
    },
    Macd {
        macd: MacdState,
        rule: MacdRule,
    },
    Combination {
        params: CombinationParams,
        subs: Vec<Engine>,
        votes: Vec<Signal>,
        state: CrossingState,
    },
}

impl Engine {
    fn build(config: &StrategyConfig) -> Self {
        match config {
            StrategyConfig::MaCrossover(p) => Engine::MaCrossover {
                fast: MovingAverage::new(p.ma_type, p.fast_period),
                slow: MovingAverage::new(p.ma_type, p.slow_period),
                rule: MaCrossoverRule::default(),
            },
            StrategyConfig::Rsi(p) => Engine::Rsi {
                rsi: RsiState::new(p.period),
                rule: RsiRule::new(p),
            },
            StrategyConfig::BollingerAtr(p) => Engine::BollingerAtr {
                bands: BollingerState::new(p.period, p.n_std),
                atr: AtrState::new(p.atr_period),
                rule: BollingerAtrRule::new(p),
            },
            StrategyConfig::Macd(p) => Engine::Macd {
                macd: MacdState::new(p.fast, p.slow, p.signal),
                rule: MacdRule::new(p),
            },
            StrategyConfig::Combination(p) => Engine::Combination {
                params: p.clone(),
                subs: p.sub_strategies.iter().map(Engine::build).collect(),
                votes: Vec::with_capacity(p.sub_strategies.len()),
                state: CrossingState::default(),
            },
        }
    }

    fn step(&mut self, bar: &PriceBar) -> Signal {
        match self {
            Engine::MaCrossover { fast, slow, rule } => {
                let fast = fast.update(bar);
                let slow = slow.update(bar);
                let snapshot = match (fast, slow) {
                    (Some(fast), Some(slow)) => Some(MaSnapshot { fast, slow }),
                    _ => None,
                };
                rule.step(snapshot)
            }
            Engine::Rsi { rsi, rule } => rule.step(rsi.update(bar)),
            Engine::BollingerAtr { bands, atr, rule } => {
                let bands = bands.update(bar);
                let atr = atr.update(bar);
                rule.step(bands.map(|bands| BollingerSnapshot {
                    close: bar.close,
                    bands,
                    atr,
                }))
            }
            Engine::Macd { macd, rule } => rule.step(macd.update(bar).map(|v| v.histogram)),
            Engine::Combination {
                params,
                subs,
                votes,
                state,
            } => {
                votes.clear();
                for sub in subs.iter_mut() {
                    votes.push(sub.step(bar));
                }
                state.apply(params.tally(votes))
            }
        }
    }
}
