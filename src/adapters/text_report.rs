//! Plain-text report adapter implementing ReportPort.
//!
//! Renders a strategy summary, the metrics table and a trade log as aligned
//! columns. Undefined ratios print as `n/a`.

use std::io;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratError;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::StrategyConfig;
use crate::domain::sweep::SweepOutcome;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy)]
pub struct TextReportAdapter {
    /// Print the trade log after the metrics.
    pub include_trades: bool,
}

impl Default for TextReportAdapter {
    fn default() -> Self {
        Self {
            include_trades: true,
        }
    }
}

impl TextReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary_only() -> Self {
        Self {
            include_trades: false,
        }
    }

    /// One line per sweep job, in job order. Failed jobs show their error.
    pub fn write_sweep(
        &self,
        outcomes: &[SweepOutcome],
        out: &mut dyn io::Write,
    ) -> Result<(), StratError> {
        writeln!(
            out,
            "{:<20} {:>10} {:>8} {:>10} {:>7} {:>9}  Strategy",
            "Name", "Return", "Sharpe", "Max DD", "Trades", "Win rate"
        )?;
        for outcome in outcomes {
            match &outcome.report {
                Ok(report) => writeln!(
                    out,
                    "{:<20} {:>10} {:>8} {:>10} {:>7} {:>9}  {}",
                    outcome.name,
                    pct(report.metrics.total_return),
                    ratio(report.metrics.sharpe_ratio),
                    pct(report.metrics.max_drawdown),
                    report.metrics.trade_count,
                    pct(report.metrics.win_rate),
                    outcome.strategy
                )?,
                Err(e) => writeln!(out, "{:<20} error: {}", outcome.name, e)?,
            }
        }
        Ok(())
    }
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        strategy: &StrategyConfig,
        out: &mut dyn io::Write,
    ) -> Result<(), StratError> {
        writeln!(out, "Strategy: {}", strategy)?;
        if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last())
        {
            writeln!(
                out,
                "Period:   {} .. {} ({} bars)",
                first.timestamp.format(TIMESTAMP_FORMAT),
                last.timestamp.format(TIMESTAMP_FORMAT),
                result.equity_curve.len()
            )?;
        }
        writeln!(out)?;

        writeln!(out, "Performance")?;
        row(out, "Final equity", money(result.final_equity().unwrap_or(result.final_cash)))?;
        row(out, "Total return", pct(metrics.total_return))?;
        row(out, "Annualized return", pct(metrics.annualized_return))?;
        row(out, "Sharpe ratio", ratio(metrics.sharpe_ratio))?;
        row(out, "Sortino ratio", ratio(metrics.sortino_ratio))?;
        row(out, "Max drawdown", pct(metrics.max_drawdown))?;
        row(
            out,
            "Max drawdown bars",
            metrics.max_drawdown_duration.to_string(),
        )?;
        row(out, "Total fees", money(metrics.total_fees))?;
        writeln!(out)?;

        writeln!(out, "Trades")?;
        row(out, "Count", metrics.trade_count.to_string())?;
        row(
            out,
            "Won / lost / even",
            format!(
                "{} / {} / {}",
                metrics.trades_won, metrics.trades_lost, metrics.trades_breakeven
            ),
        )?;
        row(out, "Win rate", pct(metrics.win_rate))?;
        row(out, "Profit factor", ratio(metrics.profit_factor))?;
        row(out, "Average win", money(metrics.avg_win))?;
        row(out, "Average loss", money(metrics.avg_loss))?;
        row(out, "Largest win", money(metrics.largest_win))?;
        row(out, "Largest loss", money(metrics.largest_loss))?;
        row(out, "Average bars held", format!("{:.1}", metrics.avg_bars_held))?;

        if let Some(position) = &result.open_position {
            writeln!(out)?;
            writeln!(
                out,
                "Open position: {:.4} @ {:.4} since {}",
                position.quantity,
                position.entry_price,
                position.entry_timestamp.format(TIMESTAMP_FORMAT)
            )?;
        }

        if self.include_trades && !result.trades.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "{:<17} {:<17} {:>12} {:>12} {:>12} {:>8}  Exit",
                "Entry", "Exit", "Entry px", "Exit px", "P&L", "Return"
            )?;
            for trade in &result.trades {
                writeln!(
                    out,
                    "{:<17} {:<17} {:>12.4} {:>12.4} {:>12.2} {:>8}  {}",
                    trade.entry_timestamp.format(TIMESTAMP_FORMAT),
                    trade.exit_timestamp.format(TIMESTAMP_FORMAT),
                    trade.entry_price,
                    trade.exit_price,
                    trade.pnl,
                    pct(trade.return_pct()),
                    trade.exit_reason
                )?;
            }
        }
        Ok(())
    }
}

fn row(out: &mut dyn io::Write, label: &str, value: String) -> io::Result<()> {
    writeln!(out, "  {:<20} {:>14}", label, value)
}

fn pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:+.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn ratio(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.3}", value)
    }
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}
