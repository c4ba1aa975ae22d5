//! Long-only, full-capital backtest simulator.
//!
//! Signals are acted on at the close of the bar they are emitted for. A BUY
//! while flat invests all cash; a SELL while long liquidates the position;
//! everything else leaves the ledger untouched. A BUY on a bar closing at zero
//! cannot size a position and is skipped. One equity point is recorded
//! per bar.

use crate::domain::error::StratError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::portfolio::{BacktestState, EquityPoint};
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::signal::{Signal, SignalStream};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged on every fill, in `[0, 1)`.
    pub fee_rate: f64,
    /// Close a position still open on the last bar at its close.
    pub force_liquidate_at_end: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            fee_rate: 0.0,
            force_liquidate_at_end: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), StratError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(StratError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 || self.fee_rate >= 1.0 {
            return Err(StratError::invalid(
                "backtest",
                "fee_rate",
                "fee_rate must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_cash: f64,
    /// Position left open at the end when forced liquidation is off.
    pub open_position: Option<Position>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }

    pub fn total_fees(&self) -> f64 {
        let closed: f64 = self.trades.iter().map(|t| t.fee_paid).sum();
        closed + self.open_position.as_ref().map_or(0.0, |p| p.entry_fee)
    }
}

pub fn run_backtest(
    series: &PriceSeries,
    signals: &SignalStream,
    config: &BacktestConfig,
) -> Result<BacktestResult, StratError> {
    config.validate()?;
    if series.is_empty() {
        return Err(StratError::EmptySeries);
    }
    check_alignment(series, signals)?;

    let bars = series.bars();
    let last = bars.len() - 1;
    let mut state = BacktestState::new(config.initial_capital);

    for (i, (bar, point)) in bars.iter().zip(&signals.points).enumerate() {
        match point.signal {
            Signal::Buy => state.open_long(bar.timestamp, bar.close, config.fee_rate),
            Signal::Sell => {
                state.close_long(bar.timestamp, bar.close, config.fee_rate, ExitReason::Signal)
            }
            Signal::Hold => {}
        }

        if i == last && config.force_liquidate_at_end {
            state.close_long(
                bar.timestamp,
                bar.close,
                config.fee_rate,
                ExitReason::EndOfSeries,
            );
        }

        state.record_equity(bar.timestamp, bar.close);
    }

    Ok(BacktestResult {
        trades: state.trades,
        equity_curve: state.equity_curve,
        final_cash: state.cash,
        open_position: state.position,
    })
}

fn check_alignment(series: &PriceSeries, signals: &SignalStream) -> Result<(), StratError> {
    let misaligned = StratError::MisalignedSignals {
        signals: signals.len(),
        bars: series.len(),
    };
    if signals.len() != series.len() {
        return Err(misaligned);
    }
    let out_of_step = series
        .bars()
        .iter()
        .zip(&signals.points)
        .enumerate()
        .any(|(i, (bar, point))| point.index != i || point.timestamp != bar.timestamp);
    if out_of_step {
        return Err(misaligned);
    }
    Ok(())
}
