//! Discrete trading signals and the per-bar signal stream.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalPoint {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub signal: Signal,
}

/// One signal per bar, in bar order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalStream {
    pub points: Vec<SignalPoint>,
}

impl SignalStream {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.points.iter().map(|p| p.signal).collect()
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.points.iter().filter(|p| p.signal == signal).count()
    }
}

/// Last non-HOLD action of a strategy instance.
///
/// BUY is only emitted from `Flat` and SELL only from `Long`; anything else
/// collapses to HOLD. Independent of the simulator's position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrossingState {
    #[default]
    Flat,
    Long,
}

impl CrossingState {
    pub fn apply(&mut self, candidate: Signal) -> Signal {
        match (*self, candidate) {
            (CrossingState::Flat, Signal::Buy) => {
                *self = CrossingState::Long;
                Signal::Buy
            }
            (CrossingState::Long, Signal::Sell) => {
                *self = CrossingState::Flat;
                Signal::Sell
            }
            _ => Signal::Hold,
        }
    }
}

/// True when `a` moves from at-or-below `b` to strictly above it.
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// True when `a` moves from at-or-above `b` to strictly below it.
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}
