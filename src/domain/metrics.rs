//! Performance metrics over an equity curve and trade log.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::Serialize;

use super::portfolio::EquityPoint;
use super::position::Trade;

/// Bar interval of the evaluated series, used for annualization.
///
/// Periods per year assume a market that trades around the clock, every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[default]
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn bar_duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    pub fn periods_per_year(&self) -> f64 {
        365.0 * 1440.0 / self.minutes() as f64
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(format!(
                "unknown timeframe '{}', expected one of 1m, 5m, 15m, 1h, 4h, 1d",
                other
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceConfig {
    pub timeframe: Timeframe,
    /// Annual rate, spread evenly over the timeframe's periods.
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    /// NaN when per-bar returns have no dispersion.
    pub sharpe_ratio: f64,
    /// NaN when no bar returned less than the risk-free rate.
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous peak.
    pub max_drawdown_duration: usize,
    pub trade_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    /// NaN when there are no trades.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    pub total_fees: f64,
}

/// Daily bars, zero risk-free rate.
pub fn evaluate_performance(
    trades: &[Trade],
    equity_curve: &[EquityPoint],
    initial_capital: f64,
) -> Metrics {
    evaluate_performance_with(
        trades,
        equity_curve,
        initial_capital,
        &PerformanceConfig::default(),
    )
}

pub fn evaluate_performance_with(
    trades: &[Trade],
    equity_curve: &[EquityPoint],
    initial_capital: f64,
    config: &PerformanceConfig,
) -> Metrics {
    let periods_per_year = config.timeframe.periods_per_year();

    let total_return = match equity_curve.last() {
        Some(last) if initial_capital > 0.0 => last.equity / initial_capital - 1.0,
        _ => 0.0,
    };

    let years = equity_curve.len().saturating_sub(1) as f64 / periods_per_year;
    let annualized_return = if years > 0.0 && total_return > -1.0 {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

    let per_period_rf = config.risk_free_rate / periods_per_year;
    let (sharpe_ratio, sortino_ratio) =
        compute_risk_adjusted(equity_curve, per_period_rf, periods_per_year);

    let mut trades_won = 0usize;
    let mut trades_lost = 0usize;
    let mut trades_breakeven = 0usize;
    let mut total_wins = 0.0_f64;
    let mut total_losses = 0.0_f64;
    let mut largest_win = 0.0_f64;
    let mut largest_loss = 0.0_f64;
    let mut total_bars_held = 0i64;
    let mut total_fees = 0.0_f64;

    let bar = config.timeframe.bar_duration();
    for trade in trades {
        let pnl = trade.pnl;
        if pnl > 0.0 {
            trades_won += 1;
            total_wins += pnl;
            largest_win = largest_win.max(pnl);
        } else if pnl < 0.0 {
            trades_lost += 1;
            total_losses += pnl.abs();
            largest_loss = largest_loss.max(pnl.abs());
        } else {
            trades_breakeven += 1;
        }
        total_bars_held += trade.bars_held(bar);
        total_fees += trade.fee_paid;
    }

    let trade_count = trades.len();
    let win_rate = if trade_count > 0 {
        trades_won as f64 / trade_count as f64
    } else {
        f64::NAN
    };

    let profit_factor = if total_losses > 0.0 {
        total_wins / total_losses
    } else if total_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let avg_win = if trades_won > 0 {
        total_wins / trades_won as f64
    } else {
        0.0
    };
    let avg_loss = if trades_lost > 0 {
        total_losses / trades_lost as f64
    } else {
        0.0
    };
    let avg_bars_held = if trade_count > 0 {
        total_bars_held as f64 / trade_count as f64
    } else {
        0.0
    };

    Metrics {
        total_return,
        annualized_return,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_duration,
        trade_count,
        trades_won,
        trades_lost,
        trades_breakeven,
        win_rate,
        profit_factor,
        avg_win,
        avg_loss,
        largest_win,
        largest_loss,
        avg_bars_held,
        total_fees,
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    per_period_rf: f64,
    periods_per_year: f64,
) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (f64::NAN, f64::NAN);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess = mean - per_period_rf;
    let scale = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        excess / stddev * scale
    } else {
        f64::NAN
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|r| **r < per_period_rf)
        .map(|r| (r - per_period_rf).powi(2))
        .sum();
    let downside_dev = (downside_sq / n).sqrt();
    let sortino = if downside_dev > 0.0 {
        excess / downside_dev * scale
    } else {
        f64::NAN
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i)
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                timestamp: ts(i as i64),
                equity: v,
                cash: v,
                position_value: 0.0,
            })
            .collect()
    }

    fn trade(pnl: f64, days: i64) -> Trade {
        Trade {
            entry_timestamp: ts(0),
            exit_timestamp: ts(days),
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 10.0,
            quantity: 10.0,
            fee_paid: 1.0,
            pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn total_return_from_final_equity() {
        let m = evaluate_performance(&[], &curve(&[1000.0, 1100.0]), 1000.0);
        assert_relative_eq!(m.total_return, 0.1, epsilon = 1e-12);
        let m = evaluate_performance(&[], &curve(&[1000.0, 900.0]), 1000.0);
        assert_relative_eq!(m.total_return, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn empty_curve_has_zero_return() {
        let m = evaluate_performance(&[], &[], 1000.0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert!(m.sharpe_ratio.is_nan());
    }

    #[test]
    fn max_drawdown_from_peak() {
        let m = evaluate_performance(&[], &curve(&[1000.0, 1200.0, 900.0]), 1000.0);
        assert_relative_eq!(m.max_drawdown, 0.25, epsilon = 1e-12);
        assert_eq!(m.max_drawdown_duration, 1);
    }

    #[test]
    fn monotonic_curve_has_no_drawdown() {
        let m = evaluate_performance(&[], &curve(&[100.0, 100.0, 101.0, 105.0]), 100.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.max_drawdown_duration, 0);
    }

    #[test]
    fn drawdown_duration_counts_bars_under_water() {
        let (dd, duration) = compute_drawdown(&curve(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0, 120.0, 119.0]));
        assert_relative_eq!(dd, 25.0 / 110.0, epsilon = 1e-12);
        assert_eq!(duration, 4);
    }

    #[test]
    fn win_rate_is_nan_without_trades() {
        let m = evaluate_performance(&[], &curve(&[1.0, 2.0]), 1.0);
        assert!(m.win_rate.is_nan());
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![trade(100.0, 5), trade(-50.0, 3), trade(200.0, 10), trade(0.0, 2)];
        let m = evaluate_performance(&trades, &curve(&[1000.0, 1250.0]), 1000.0);

        assert_eq!(m.trade_count, 4);
        assert_eq!((m.trades_won, m.trades_lost, m.trades_breakeven), (2, 1, 1));
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.profit_factor, 6.0);
        assert_relative_eq!(m.avg_win, 150.0);
        assert_relative_eq!(m.avg_loss, 50.0);
        assert_relative_eq!(m.largest_win, 200.0);
        assert_relative_eq!(m.largest_loss, 50.0);
        assert_relative_eq!(m.avg_bars_held, 5.0);
        assert_relative_eq!(m.total_fees, 4.0);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let m = evaluate_performance(&[trade(10.0, 1)], &curve(&[1.0, 2.0]), 1.0);
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn sharpe_nan_for_flat_curve() {
        let m = evaluate_performance(&[], &curve(&[100.0; 10]), 100.0);
        assert!(m.sharpe_ratio.is_nan());
        assert!(m.sortino_ratio.is_nan());
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        // returns: +10%, -10%
        let values = [100.0, 110.0, 99.0];
        let m = evaluate_performance(&[], &curve(&values), 100.0);
        let r: [f64; 2] = [0.1, -0.1];
        let mean = (r[0] + r[1]) / 2.0;
        let sd = (((r[0] - mean).powi(2) + (r[1] - mean).powi(2)) / 2.0).sqrt();
        assert_relative_eq!(m.sharpe_ratio, mean / sd * 365f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i % 5) as f64 + i as f64 * 0.3).collect();
        let base = evaluate_performance(&[], &curve(&values), 100.0);
        let with_rf = evaluate_performance_with(
            &[],
            &curve(&values),
            100.0,
            &PerformanceConfig {
                timeframe: Timeframe::D1,
                risk_free_rate: 0.05,
            },
        );
        assert!(with_rf.sharpe_ratio < base.sharpe_ratio);
    }

    #[test]
    fn timeframe_annualization() {
        assert_relative_eq!(Timeframe::D1.periods_per_year(), 365.0);
        assert_relative_eq!(Timeframe::H1.periods_per_year(), 8760.0);
        assert_relative_eq!(Timeframe::M1.periods_per_year(), 525_600.0);
        assert_relative_eq!(Timeframe::H4.periods_per_year(), 2190.0);
    }

    #[test]
    fn timeframe_round_trips_through_text() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("2h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn annualized_return_over_one_year() {
        let mut values = vec![100.0; 366];
        values[365] = 110.0;
        let m = evaluate_performance(&[], &curve(&values), 100.0);
        assert_relative_eq!(m.annualized_return, 0.1, epsilon = 1e-9);
    }
}
