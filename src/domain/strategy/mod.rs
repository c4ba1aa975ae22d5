//! Strategy configuration and signal generation.
//!
//! A [`StrategyConfig`] names one strategy variant and its parameters.
//! [`generate`] turns a price series into one signal per bar; [`LiveStrategy`]
//! produces the same signals one bar at a time.

pub mod bollinger_atr;
pub mod combination;
pub mod live;
pub mod ma_crossover;
pub mod macd;
pub mod rsi;

pub use bollinger_atr::{BollingerAtrParams, ExitBand};
pub use combination::{CombinationMode, CombinationParams, TieBreak};
pub use live::LiveStrategy;
pub use ma_crossover::{MaCrossoverParams, MaType};
pub use macd::MacdParams;
pub use rsi::RsiParams;

use std::fmt;

use crate::domain::error::StratError;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::domain::signal::{Signal, SignalPoint, SignalStream};

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    MaCrossover(MaCrossoverParams),
    Rsi(RsiParams),
    BollingerAtr(BollingerAtrParams),
    Macd(MacdParams),
    Combination(CombinationParams),
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), StratError> {
        match self {
            StrategyConfig::MaCrossover(p) => p.validate(),
            StrategyConfig::Rsi(p) => p.validate(),
            StrategyConfig::BollingerAtr(p) => p.validate(),
            StrategyConfig::Macd(p) => p.validate(),
            StrategyConfig::Combination(p) => p.validate(),
        }
    }

    /// Shortest series the strategy accepts.
    pub fn minimum_bars(&self) -> usize {
        match self {
            StrategyConfig::MaCrossover(p) => p.minimum_bars(),
            StrategyConfig::Rsi(p) => p.minimum_bars(),
            StrategyConfig::BollingerAtr(p) => p.minimum_bars(),
            StrategyConfig::Macd(p) => p.minimum_bars(),
            StrategyConfig::Combination(p) => p.minimum_bars(),
        }
    }

    /// Config-file name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::MaCrossover(_) => "ma_crossover",
            StrategyConfig::Rsi(_) => "rsi",
            StrategyConfig::BollingerAtr(_) => "bollinger_atr",
            StrategyConfig::Macd(_) => "macd",
            StrategyConfig::Combination(_) => "combination",
        }
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::MaCrossover(p) => write!(
                f,
                "MA Crossover ({} {}/{})",
                p.ma_type, p.fast_period, p.slow_period
            ),
            StrategyConfig::Rsi(p) => write!(
                f,
                "RSI ({}, {}/{})",
                p.period, p.oversold, p.overbought
            ),
            StrategyConfig::BollingerAtr(p) => {
                write!(f, "Bollinger+ATR ({}, {}σ", p.period, p.n_std)?;
                if p.use_atr_stop {
                    write!(f, ", stop {}×ATR({})", p.atr_multiplier, p.atr_period)?;
                    if p.trailing_stop {
                        write!(f, " trailing")?;
                    }
                }
                write!(f, ", exit {})", p.exit_band)
            }
            StrategyConfig::Macd(p) => {
                write!(f, "MACD ({},{},{})", p.fast, p.slow, p.signal)
            }
            StrategyConfig::Combination(p) => {
                write!(f, "Combination {} [", p.mode)?;
                for (i, sub) in p.sub_strategies.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", sub)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Generate one signal per bar.
///
/// Fails with `InvalidConfig` for bad parameters, `EmptySeries` for an empty
/// series and `InsufficientData` when the series is shorter than
/// [`StrategyConfig::minimum_bars`]. Warm-up bars are HOLD.
pub fn generate(series: &PriceSeries, config: &StrategyConfig) -> Result<SignalStream, StratError> {
    config.validate()?;
    if series.is_empty() {
        return Err(StratError::EmptySeries);
    }
    let minimum = config.minimum_bars();
    if series.len() < minimum {
        return Err(StratError::InsufficientData {
            bars: series.len(),
            minimum,
        });
    }

    let bars = series.bars();
    let points = signals_for(bars, config)
        .into_iter()
        .zip(bars)
        .enumerate()
        .map(|(index, (signal, bar))| SignalPoint {
            index,
            timestamp: bar.timestamp,
            signal,
        })
        .collect();
    Ok(SignalStream { points })
}

fn signals_for(bars: &[PriceBar], config: &StrategyConfig) -> Vec<Signal> {
    match config {
        StrategyConfig::MaCrossover(p) => ma_crossover::generate(bars, p),
        StrategyConfig::Rsi(p) => rsi::generate(bars, p),
        StrategyConfig::BollingerAtr(p) => bollinger_atr::generate(bars, p),
        StrategyConfig::Macd(p) => macd::generate(bars, p),
        StrategyConfig::Combination(p) => {
            let subs: Vec<Vec<Signal>> = p
                .sub_strategies
                .iter()
                .map(|sub| signals_for(bars, sub))
                .collect();
            combination::combine(p, &subs, bars.len())
        }
    }
}
