//! Parallel evaluation of several strategy configurations over one series.
//!
//! Jobs are split into contiguous chunks, one scoped thread per chunk. Every
//! job owns its own strategy and backtest state; the series is shared
//! read-only. Outcomes come back in job order.

use std::num::NonZeroUsize;
use std::thread;

use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::error::StratError;
use crate::domain::metrics::{evaluate_performance_with, Metrics, PerformanceConfig};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{generate, StrategyConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct SweepJob {
    pub name: String,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub backtest: BacktestResult,
    pub metrics: Metrics,
    pub buy_signals: usize,
    pub sell_signals: usize,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub name: String,
    pub strategy: StrategyConfig,
    pub report: Result<RunReport, StratError>,
}

/// Generate, simulate and evaluate one configuration.
pub fn run_single(
    series: &PriceSeries,
    strategy: &StrategyConfig,
    backtest: &BacktestConfig,
    performance: &PerformanceConfig,
) -> Result<RunReport, StratError> {
    let signals = generate(series, strategy)?;
    let result = run_backtest(series, &signals, backtest)?;
    let metrics = evaluate_performance_with(
        &result.trades,
        &result.equity_curve,
        backtest.initial_capital,
        performance,
    );
    Ok(RunReport {
        buy_signals: signals.count(Signal::Buy),
        sell_signals: signals.count(Signal::Sell),
        backtest: result,
        metrics,
    })
}

/// Run every job, using at most `available_parallelism` threads.
pub fn run_sweep(
    series: &PriceSeries,
    jobs: &[SweepJob],
    backtest: &BacktestConfig,
    performance: &PerformanceConfig,
) -> Vec<SweepOutcome> {
    let threads = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    run_sweep_with_threads(series, jobs, backtest, performance, threads)
}

pub fn run_sweep_with_threads(
    series: &PriceSeries,
    jobs: &[SweepJob],
    backtest: &BacktestConfig,
    performance: &PerformanceConfig,
    threads: usize,
) -> Vec<SweepOutcome> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let threads = threads.clamp(1, jobs.len());
    let chunk_size = jobs.len().div_ceil(threads);

    let run_chunk = |chunk: &[SweepJob]| -> Vec<SweepOutcome> {
        chunk
            .iter()
            .map(|job| SweepOutcome {
                name: job.name.clone(),
                strategy: job.strategy.clone(),
                report: run_single(series, &job.strategy, backtest, performance),
            })
            .collect()
    };

    if threads == 1 {
        return run_chunk(jobs);
    }

    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || run_chunk(chunk)))
            .collect();

        let mut outcomes = Vec::with_capacity(jobs.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => outcomes.extend(chunk),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        outcomes
    })
}
