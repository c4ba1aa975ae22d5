//! Report generation port trait.

use std::io;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratError;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::StrategyConfig;

/// Port for writing a finished run.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        strategy: &StrategyConfig,
        out: &mut dyn io::Write,
    ) -> Result<(), StratError>;
}
