//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_export;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report::TextReportAdapter;
use crate::domain::config_validation::{
    load_backtest_config, load_performance_config, load_strategy_config,
};
use crate::domain::error::StratError;
use crate::domain::indicator::{bollinger, compute_indicator, macd, IndicatorType};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{self, StrategyConfig};
use crate::domain::sweep::{run_single, run_sweep, SweepJob};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Trading strategy signal engine and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate signals, simulate and print a performance report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Write closed trades as CSV
        #[arg(long)]
        trades: Option<PathBuf>,
        /// Write the equity curve as CSV
        #[arg(long)]
        equity: Option<PathBuf>,
        /// Omit the trade log from the report
        #[arg(long)]
        summary_only: bool,
    },
    /// Write the per-bar signal stream as CSV
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute a single indicator and write it as CSV
    Indicator {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, value_enum)]
        kind: IndicatorKind,
        #[arg(long, default_value_t = bollinger::DEFAULT_PERIOD)]
        period: usize,
        #[arg(long, default_value_t = macd::DEFAULT_FAST)]
        fast: usize,
        #[arg(long, default_value_t = macd::DEFAULT_SLOW)]
        slow: usize,
        #[arg(long, default_value_t = macd::DEFAULT_SIGNAL)]
        signal: usize,
        #[arg(long, default_value_t = bollinger::DEFAULT_MULTIPLIER)]
        n_std: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest several strategy files against one series
    Sweep {
        /// Backtest settings; only the [backtest] section is read
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Strategy file, repeatable
        #[arg(short = 's', long = "strategy", required = true)]
        strategies: Vec<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Atr,
    Macd,
    Bollinger,
}

impl IndicatorKind {
    fn to_indicator_type(
        self,
        period: usize,
        fast: usize,
        slow: usize,
        signal: usize,
        n_std: f64,
    ) -> IndicatorType {
        match self {
            IndicatorKind::Sma => IndicatorType::Sma(period),
            IndicatorKind::Ema => IndicatorType::Ema(period),
            IndicatorKind::Rsi => IndicatorType::Rsi(period),
            IndicatorKind::Atr => IndicatorType::Atr(period),
            IndicatorKind::Macd => IndicatorType::Macd { fast, slow, signal },
            IndicatorKind::Bollinger => IndicatorType::bollinger(period, n_std),
        }
    }
}

/// Run a parsed command line, writing reports to stdout.
pub fn run(cli: Cli) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(&e)
        }
    }
}

/// Dispatch one command; reports and CSV without an output path go to `out`.
pub fn execute(command: Command, out: &mut dyn Write) -> Result<(), StratError> {
    match command {
        Command::Backtest {
            config,
            data,
            trades,
            equity,
            summary_only,
        } => run_backtest(
            &config,
            &data,
            trades.as_deref(),
            equity.as_deref(),
            summary_only,
            out,
        ),
        Command::Signals {
            config,
            data,
            output,
        } => run_signals(&config, &data, output.as_deref(), out),
        Command::Indicator {
            data,
            kind,
            period,
            fast,
            slow,
            signal,
            n_std,
            output,
        } => {
            let indicator = kind.to_indicator_type(period, fast, slow, signal, n_std);
            run_indicator(&data, &indicator, output.as_deref(), out)
        }
        Command::Sweep {
            config,
            data,
            strategies,
        } => run_sweep_command(&config, &data, &strategies, out),
        Command::Validate { config } => run_validate(&config, out),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn load_series(path: &Path) -> Result<PriceSeries, StratError> {
    info!("Loading bars from {}", path.display());
    let series = CsvAdapter::new().load_series(path)?;
    info!(bars = series.len(), "Loaded price series");
    Ok(series)
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    trades_path: Option<&Path>,
    equity_path: Option<&Path>,
    summary_only: bool,
    out: &mut dyn Write,
) -> Result<(), StratError> {
    // Stage 1: config
    let adapter = load_config(config_path)?;
    let strategy = load_strategy_config(&adapter)?;
    let backtest = load_backtest_config(&adapter)?;
    let performance = load_performance_config(&adapter)?;
    info!("Strategy: {}", strategy);

    // Stage 2: data
    let series = load_series(data_path)?;

    // Stage 3: signals, simulation, metrics
    let report = run_single(&series, &strategy, &backtest, &performance)?;
    info!(
        buys = report.buy_signals,
        sells = report.sell_signals,
        trades = report.backtest.trades.len(),
        "Backtest complete"
    );

    // Stage 4: output
    let reporter = if summary_only {
        TextReportAdapter::summary_only()
    } else {
        TextReportAdapter::new()
    };
    reporter.write(&report.backtest, &report.metrics, &strategy, out)?;

    if let Some(path) = trades_path {
        csv_export::write_trades(csv_export::create_file(path)?, &report.backtest.trades)?;
        info!("Trades written to {}", path.display());
    }
    if let Some(path) = equity_path {
        csv_export::write_equity_curve(
            csv_export::create_file(path)?,
            &report.backtest.equity_curve,
        )?;
        info!("Equity curve written to {}", path.display());
    }
    Ok(())
}

fn run_signals(
    config_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), StratError> {
    let adapter = load_config(config_path)?;
    let strategy = load_strategy_config(&adapter)?;
    let series = load_series(data_path)?;

    let stream = strategy::generate(&series, &strategy)?;
    info!(
        buys = stream.count(Signal::Buy),
        sells = stream.count(Signal::Sell),
        "Signals generated for {}",
        strategy
    );

    match output_path {
        Some(path) => {
            csv_export::write_signals(csv_export::create_file(path)?, &stream)?;
            info!("Signals written to {}", path.display());
        }
        None => csv_export::write_signals(out, &stream)?,
    }
    Ok(())
}

fn run_indicator(
    data_path: &Path,
    indicator: &IndicatorType,
    output_path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), StratError> {
    let series = load_series(data_path)?;
    let computed = compute_indicator(&series, indicator)?;
    let valid = computed.values.iter().filter(|p| p.valid).count();
    info!(valid, "Computed {}", indicator);

    match output_path {
        Some(path) => {
            csv_export::write_indicator(csv_export::create_file(path)?, &computed)?;
            info!("{} written to {}", indicator, path.display());
        }
        None => csv_export::write_indicator(out, &computed)?,
    }
    Ok(())
}

fn run_sweep_command(
    config_path: &Path,
    data_path: &Path,
    strategy_paths: &[PathBuf],
    out: &mut dyn Write,
) -> Result<(), StratError> {
    let adapter = load_config(config_path)?;
    let backtest = load_backtest_config(&adapter)?;
    let performance = load_performance_config(&adapter)?;

    let jobs = strategy_paths
        .iter()
        .map(|path| {
            let strategy = load_strategy_config(&load_config(path)?)?;
            Ok(SweepJob {
                name: job_name(path),
                strategy,
            })
        })
        .collect::<Result<Vec<_>, StratError>>()?;

    let series = load_series(data_path)?;
    info!(jobs = jobs.len(), "Running sweep");
    let outcomes = run_sweep(&series, &jobs, &backtest, &performance);

    TextReportAdapter::new().write_sweep(&outcomes, out)?;

    let mut first_failure = None;
    for outcome in outcomes {
        if let Err(e) = outcome.report {
            warn!("{} failed: {}", outcome.name, e);
            first_failure.get_or_insert(e);
        }
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_validate(config_path: &Path, out: &mut dyn Write) -> Result<(), StratError> {
    let adapter = load_config(config_path)?;
    let strategy = load_strategy_config(&adapter)?;
    let backtest = load_backtest_config(&adapter)?;
    let performance = load_performance_config(&adapter)?;

    writeln!(out, "Strategy:        {}", strategy)?;
    writeln!(out, "Minimum bars:    {}", strategy.minimum_bars())?;
    if let StrategyConfig::Combination(params) = &strategy {
        writeln!(out, "Sub-strategies:  {}", params.sub_strategies.len())?;
    }
    writeln!(out, "Initial capital: {:.2}", backtest.initial_capital)?;
    writeln!(out, "Fee rate:        {}", backtest.fee_rate)?;
    writeln!(out, "Force liquidate: {}", backtest.force_liquidate_at_end)?;
    writeln!(out, "Timeframe:       {}", performance.timeframe)?;
    writeln!(out, "\nConfiguration is valid.")?;
    Ok(())
}

/// Sweep job name: the strategy file's stem.
fn job_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
