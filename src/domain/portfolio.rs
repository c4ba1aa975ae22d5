//! Cash / position ledger and equity tracking for a single-instrument run.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::position::{ExitReason, Position, Side, Trade};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub cash: f64,
    pub position_value: f64,
}

/// Mutable state of one backtest. All capital is either cash or the single
/// open position, never both partially.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestState {
    pub cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestState {
    pub fn new(initial_capital: f64) -> Self {
        BacktestState {
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        if self.position.is_some() {
            Side::Long
        } else {
            Side::Flat
        }
    }

    /// Spend all cash on a position at `price`; no-op when already long or
    /// when `price` is not positive.
    pub fn open_long(&mut self, timestamp: NaiveDateTime, price: f64, fee_rate: f64) {
        if self.position.is_some() || !(price > 0.0) {
            return;
        }
        let entry_fee = self.cash * fee_rate;
        let quantity = (self.cash - entry_fee) / price;
        self.position = Some(Position {
            entry_timestamp: timestamp,
            entry_price: price,
            quantity,
            entry_fee,
        });
        self.cash = 0.0;
    }

    /// Sell the whole position at `price`; no-op when flat.
    pub fn close_long(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        fee_rate: f64,
        reason: ExitReason,
    ) {
        let Some(position) = self.position.take() else {
            return;
        };
        let gross = position.market_value(price);
        let exit_fee = gross * fee_rate;
        self.cash = gross - exit_fee;
        self.trades
            .push(Trade::close(&position, timestamp, price, exit_fee, reason));
    }

    pub fn position_value(&self, price: f64) -> f64 {
        self.position
            .as_ref()
            .map(|p| p.market_value(price))
            .unwrap_or(0.0)
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position_value(price)
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, price: f64) {
        let position_value = self.position_value(price);
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.cash + position_value,
            cash: self.cash,
            position_value,
        });
    }
}
