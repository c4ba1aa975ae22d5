//! Typed configuration loading and validation.
//!
//! Reads the `[backtest]` and `[strategy]` sections through a [`ConfigPort`].
//! Combination sub-strategies live in `[strategy.<name>]` sections and may
//! nest up to [`MAX_NESTING`] levels. Values that fail to parse are errors,
//! never silently replaced by defaults.

use std::str::FromStr;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::StratError;
use crate::domain::metrics::{PerformanceConfig, Timeframe};
use crate::domain::strategy::{
    BollingerAtrParams, CombinationMode, CombinationParams, ExitBand, MaCrossoverParams, MaType,
    MacdParams, RsiParams, StrategyConfig, TieBreak,
};
use crate::ports::config_port::ConfigPort;

pub const MAX_NESTING: usize = 8;

const BACKTEST: &str = "backtest";
const STRATEGY: &str = "strategy";

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StratError> {
    let defaults = BacktestConfig::default();
    let backtest = BacktestConfig {
        initial_capital: parse_f64(config, BACKTEST, "initial_capital", defaults.initial_capital)?,
        fee_rate: parse_f64(config, BACKTEST, "fee_rate", defaults.fee_rate)?,
        force_liquidate_at_end: parse_bool(
            config,
            BACKTEST,
            "force_liquidate_at_end",
            defaults.force_liquidate_at_end,
        )?,
    };
    backtest.validate()?;
    Ok(backtest)
}

pub fn load_performance_config(config: &dyn ConfigPort) -> Result<PerformanceConfig, StratError> {
    let timeframe: Timeframe = parse_enum(config, BACKTEST, "timeframe", Timeframe::default())?;
    let risk_free_rate = parse_f64(config, BACKTEST, "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(StratError::invalid(
            BACKTEST,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(PerformanceConfig {
        timeframe,
        risk_free_rate,
    })
}

/// Load the strategy rooted at `[strategy]`.
pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, StratError> {
    load_strategy_section(config, STRATEGY, 0)
}

fn load_strategy_section(
    config: &dyn ConfigPort,
    section: &str,
    depth: usize,
) -> Result<StrategyConfig, StratError> {
    if depth > MAX_NESTING {
        return Err(StratError::invalid(
            section,
            "sub_strategies",
            format!("strategies nest deeper than {} levels", MAX_NESTING),
        ));
    }

    let kind = required(config, section, "kind")?;
    let strategy = match kind.to_lowercase().as_str() {
        "ma_crossover" => StrategyConfig::MaCrossover(load_ma_crossover(config, section)?),
        "rsi" => StrategyConfig::Rsi(load_rsi(config, section)?),
        "bollinger_atr" => StrategyConfig::BollingerAtr(load_bollinger_atr(config, section)?),
        "macd" => StrategyConfig::Macd(load_macd(config, section)?),
        "combination" => {
            StrategyConfig::Combination(load_combination(config, section, depth)?)
        }
        other => {
            return Err(StratError::invalid(
                section,
                "kind",
                format!("unknown strategy kind '{}'", other),
            ))
        }
    };

    strategy.validate().map_err(|e| in_section(e, section))?;
    Ok(strategy)
}

fn load_ma_crossover(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<MaCrossoverParams, StratError> {
    let d = MaCrossoverParams::default();
    Ok(MaCrossoverParams {
        fast_period: parse_usize(config, section, "fast_period", d.fast_period)?,
        slow_period: parse_usize(config, section, "slow_period", d.slow_period)?,
        ma_type: parse_enum::<MaType>(config, section, "ma_type", d.ma_type)?,
    })
}

fn load_rsi(config: &dyn ConfigPort, section: &str) -> Result<RsiParams, StratError> {
    let d = RsiParams::default();
    Ok(RsiParams {
        period: parse_usize(config, section, "period", d.period)?,
        oversold: parse_f64(config, section, "oversold", d.oversold)?,
        overbought: parse_f64(config, section, "overbought", d.overbought)?,
    })
}

fn load_bollinger_atr(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<BollingerAtrParams, StratError> {
    let d = BollingerAtrParams::default();
    Ok(BollingerAtrParams {
        period: parse_usize(config, section, "period", d.period)?,
        n_std: parse_f64(config, section, "n_std", d.n_std)?,
        atr_period: parse_usize(config, section, "atr_period", d.atr_period)?,
        atr_multiplier: parse_f64(config, section, "atr_multiplier", d.atr_multiplier)?,
        use_atr_stop: parse_bool(config, section, "use_atr_stop", d.use_atr_stop)?,
        trailing_stop: parse_bool(config, section, "trailing_stop", d.trailing_stop)?,
        exit_band: parse_enum::<ExitBand>(config, section, "exit_band", d.exit_band)?,
    })
}

fn load_macd(config: &dyn ConfigPort, section: &str) -> Result<MacdParams, StratError> {
    let d = MacdParams::default();
    Ok(MacdParams {
        fast: parse_usize(config, section, "fast", d.fast)?,
        slow: parse_usize(config, section, "slow", d.slow)?,
        signal: parse_usize(config, section, "signal", d.signal)?,
        histogram_threshold: parse_f64(
            config,
            section,
            "histogram_threshold",
            d.histogram_threshold,
        )?,
    })
}

fn load_combination(
    config: &dyn ConfigPort,
    section: &str,
    depth: usize,
) -> Result<CombinationParams, StratError> {
    let names = split_list(&required(config, section, "sub_strategies")?);
    let sub_strategies = names
        .iter()
        .map(|name| {
            let sub_section = format!("{}.{}", STRATEGY, name.to_lowercase());
            load_strategy_section(config, &sub_section, depth + 1)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let weights = match config.get_string(section, "weights") {
        Some(raw) if !raw.trim().is_empty() => Some(
            split_list(&raw)
                .iter()
                .map(|w| {
                    w.parse::<f64>().map_err(|_| {
                        StratError::invalid(section, "weights", format!("'{}' is not a number", w))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => None,
    };

    Ok(CombinationParams {
        sub_strategies,
        mode: parse_enum::<CombinationMode>(config, section, "mode", CombinationMode::default())?,
        tie_break: parse_enum::<TieBreak>(config, section, "tie_break", TieBreak::default())?,
        weights,
    })
}

fn in_section(err: StratError, section: &str) -> StratError {
    match err {
        StratError::InvalidConfig { key, reason, .. } => StratError::InvalidConfig {
            section: section.to_string(),
            key,
            reason,
        },
        other => other,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn value(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, StratError> {
    value(config, section, key).ok_or_else(|| StratError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn parse_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, StratError> {
    match value(config, section, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(StratError::invalid(
                section,
                key,
                format!("'{}' is not a finite number", raw),
            )),
        },
    }
}

fn parse_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, StratError> {
    match value(config, section, key) {
        None => Ok(default),
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            StratError::invalid(
                section,
                key,
                format!("'{}' is not a non-negative integer", raw),
            )
        }),
    }
}

fn parse_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, StratError> {
    match value(config, section, key) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(StratError::invalid(
                section,
                key,
                format!("'{}' is not a boolean", raw),
            )),
        },
    }
}

fn parse_enum<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, StratError>
where
    T: FromStr<Err = String>,
{
    match value(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|reason| StratError::invalid(section, key, reason)),
    }
}
