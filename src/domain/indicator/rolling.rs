//! Incremental indicator accumulators for bar-by-bar (live) evaluation.
//!
//! Each accumulator keeps only fixed-size state: a ring buffer of the last n
//! inputs, or a running EMA value. Window means and deviations go through the
//! same helpers as the batch calculations, so feeding a series bar by bar
//! reproduces the batch values exactly.

use std::collections::VecDeque;

use crate::domain::indicator::bollinger::sample_stddev;
use crate::domain::indicator::rsi::rsi_from_averages;
use crate::domain::indicator::sma::window_mean;
use crate::domain::ohlcv::PriceBar;

/// A per-indicator accumulator fed one bar at a time.
pub trait Accumulator {
    type Output;

    /// Consume the next bar; `None` while still warming up.
    fn update(&mut self, bar: &PriceBar) -> Option<Self::Output>;
}

#[derive(Debug, Clone)]
struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period),
        }
    }

    fn push(&mut self, x: f64) {
        if self.period == 0 {
            return;
        }
        if self.values.len() == self.period {
            self.values.pop_front();
        }
        self.values.push_back(x);
    }

    fn is_full(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    fn mean(&self) -> Option<f64> {
        self.is_full()
            .then(|| window_mean(self.values.iter().copied(), self.period))
    }
}

#[derive(Debug, Clone)]
pub struct SmaState {
    window: RollingWindow,
}

impl SmaState {
    pub fn new(period: usize) -> Self {
        Self {
            window: RollingWindow::new(period),
        }
    }
}

impl Accumulator for SmaState {
    type Output = f64;

    fn update(&mut self, bar: &PriceBar) -> Option<f64> {
        self.window.push(bar.close);
        self.window.mean()
    }
}

/// SMA-seeded EMA; also usable over derived inputs through [`EmaState::push_value`].
#[derive(Debug, Clone)]
pub struct EmaState {
    period: usize,
    k: f64,
    seen: usize,
    seed_sum: f64,
    ema: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            ema: None,
        }
    }

    pub fn push_value(&mut self, x: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.seen += 1;
        self.ema = match self.ema {
            Some(prev) => Some(x * self.k + prev * (1.0 - self.k)),
            None => {
                self.seed_sum += x;
                (self.seen == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        self.ema
    }
}

impl Accumulator for EmaState {
    type Output = f64;

    fn update(&mut self, bar: &PriceBar) -> Option<f64> {
        self.push_value(bar.close)
    }
}

#[derive(Debug, Clone)]
pub struct RsiState {
    prev_close: Option<f64>,
    gains: RollingWindow,
    losses: RollingWindow,
}

impl RsiState {
    pub fn new(period: usize) -> Self {
        Self {
            prev_close: None,
            gains: RollingWindow::new(period),
            losses: RollingWindow::new(period),
        }
    }
}

impl Accumulator for RsiState {
    type Output = f64;

    fn update(&mut self, bar: &PriceBar) -> Option<f64> {
        let prev = self.prev_close.replace(bar.close)?;
        let change = bar.close - prev;
        self.gains.push(change.max(0.0));
        self.losses.push((-change).max(0.0));
        Some(rsi_from_averages(self.gains.mean()?, self.losses.mean()?))
    }
}

#[derive(Debug, Clone)]
pub struct AtrState {
    prev_close: Option<f64>,
    window: RollingWindow,
}

impl AtrState {
    pub fn new(period: usize) -> Self {
        Self {
            prev_close: None,
            window: RollingWindow::new(period),
        }
    }
}

impl Accumulator for AtrState {
    type Output = f64;

    fn update(&mut self, bar: &PriceBar) -> Option<f64> {
        let tr = match self.prev_close.replace(bar.close) {
            Some(prev) => bar.true_range(prev),
            None => bar.high - bar.low,
        };
        self.window.push(tr);
        self.window.mean()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct BollingerState {
    window: RollingWindow,
    mult: f64,
}

impl BollingerState {
    pub fn new(period: usize, mult: f64) -> Self {
        Self {
            window: RollingWindow::new(period),
            mult,
        }
    }
}

impl Accumulator for BollingerState {
    type Output = Bands;

    fn update(&mut self, bar: &PriceBar) -> Option<Bands> {
        self.window.push(bar.close);
        let middle = self.window.mean()?;
        let stddev = sample_stddev(self.window.values.iter().copied(), middle, self.window.period);
        Some(Bands {
            upper: middle + self.mult * stddev,
            middle,
            lower: middle - self.mult * stddev,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone)]
pub struct MacdState {
    fast: EmaState,
    slow: EmaState,
    signal: EmaState,
}

impl MacdState {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: EmaState::new(fast),
            slow: EmaState::new(slow),
            signal: EmaState::new(signal),
        }
    }
}

impl Accumulator for MacdState {
    type Output = MacdValue;

    fn update(&mut self, bar: &PriceBar) -> Option<MacdValue> {
        let fast = self.fast.push_value(bar.close);
        let slow = self.slow.push_value(bar.close);
        let line = fast? - slow?;
        let signal = self.signal.push_value(line)?;
        Some(MacdValue {
            line,
            signal,
            histogram: line - signal,
        })
    }
}
