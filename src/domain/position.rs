//! Open position and closed trade records.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Which side of the market the simulator currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Flat,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_fee: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    EndOfSeries,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::EndOfSeries => write!(f, "end_of_series"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_timestamp: NaiveDateTime,
    pub exit_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Entry plus exit fee.
    pub fee_paid: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Close `position` at `price`, charging `exit_fee`.
    pub fn close(
        position: &Position,
        exit_timestamp: NaiveDateTime,
        exit_price: f64,
        exit_fee: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = (exit_price - position.entry_price) * position.quantity
            - position.entry_fee
            - exit_fee;
        Trade {
            entry_timestamp: position.entry_timestamp,
            exit_timestamp,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            fee_paid: position.entry_fee + exit_fee,
            pnl,
            exit_reason,
        }
    }

    pub fn return_pct(&self) -> f64 {
        let cost = self.entry_price * self.quantity;
        if cost > 0.0 { self.pnl / cost } else { 0.0 }
    }

    pub fn bars_held(&self, bar: chrono::Duration) -> i64 {
        let held = self.exit_timestamp - self.entry_timestamp;
        match bar.num_seconds() {
            0 => 0,
            secs => held.num_seconds() / secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample_position() -> Position {
        Position {
            entry_timestamp: ts(1),
            entry_price: 50.0,
            quantity: 10.0,
            entry_fee: 1.0,
        }
    }

    #[test]
    fn market_value_marks_quantity() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 550.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_accounts_for_both_fees() {
        let trade = Trade::close(&sample_position(), ts(5), 60.0, 0.6, ExitReason::Signal);
        assert!((trade.pnl - (100.0 - 1.0 - 0.6)).abs() < 1e-12);
        assert!((trade.fee_paid - 1.6).abs() < 1e-12);
        assert_eq!(trade.entry_timestamp, ts(1));
        assert_eq!(trade.exit_reason, ExitReason::Signal);
    }

    #[test]
    fn losing_trade() {
        let trade = Trade::close(&sample_position(), ts(2), 45.0, 0.0, ExitReason::EndOfSeries);
        assert!((trade.pnl - (-51.0)).abs() < 1e-12);
        assert!(trade.return_pct() < 0.0);
    }

    #[test]
    fn bars_held_counts_whole_bars() {
        let trade = Trade::close(&sample_position(), ts(5), 50.0, 0.0, ExitReason::Signal);
        assert_eq!(trade.bars_held(Duration::hours(1)), 4);
        assert_eq!(trade.bars_held(Duration::zero()), 0);
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::Signal.to_string(), "signal");
        assert_eq!(ExitReason::EndOfSeries.to_string(), "end_of_series");
    }
}
