//! CLI integration tests: every subcommand against real files on disk.

mod common;

use clap::Parser;
use common::*;
use std::path::Path;
use std::process::ExitCode;
use stratbench::cli::{self, Cli, Command};
use stratbench::domain::error::StratError;

const BACKTEST_INI: &str = r#"
[backtest]
initial_capital = 10000
fee_rate = 0.001
force_liquidate_at_end = true
timeframe = 1h

[strategy]
kind = ma_crossover
fast_period = 5
slow_period = 20
"#;

const RSI_INI: &str = "[strategy]\nkind = rsi\nperiod = 14\n";

const TOO_LONG_INI: &str = "[strategy]\nkind = ma_crossover\nfast_period = 50\nslow_period = 500\n";

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["stratbench"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn execute(args: &[&str]) -> (Result<(), StratError>, String) {
    let mut out = Vec::new();
    let result = cli::execute(parse(args).command, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn same_code(actual: ExitCode, expected: u8) -> bool {
    // ExitCode doesn't implement PartialEq
    format!("{:?}", actual) == format!("{:?}", ExitCode::from(expected))
}

mod backtest_command {
    use super::*;

    #[test]
    fn prints_report_and_writes_csv() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(200)));
        let dir = tempfile::tempdir().unwrap();
        let trades = dir.path().join("trades.csv");
        let equity = dir.path().join("equity.csv");

        let (result, report) = execute(&[
            "backtest",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
            "--trades",
            path(&trades),
            "--equity",
            path(&equity),
        ]);
        result.unwrap();

        assert!(report.starts_with("Strategy: MA Crossover (SMA 5/20)"), "{}", report);
        assert!(report.contains("Total return"));

        let trades = std::fs::read_to_string(&trades).unwrap();
        assert!(trades.starts_with("entry_timestamp,"), "{}", trades);
        let equity = std::fs::read_to_string(&equity).unwrap();
        assert_eq!(equity.lines().count(), 201);
    }

    #[test]
    fn summary_only_omits_trade_log() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(200)));
        let (result, report) = execute(&[
            "backtest",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
            "--summary-only",
        ]);
        result.unwrap();
        assert!(!report.contains("Exit px"));
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(10)));
        let (result, _) = execute(&[
            "backtest",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
        ]);
        assert!(matches!(
            result,
            Err(StratError::InsufficientData {
                bars: 10,
                minimum: 20
            })
        ));
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let config = write_temp(BACKTEST_INI);
        let bad_config = write_temp("[strategy]\nkind = ma_crossover\nfast_period = ten\n");
        let data = write_temp(&bars_csv(&wave(50)));
        let garbage = write_temp("timestamp,open,high,low,close,volume\nnot-a-date,1,1,1,1,1\n");

        let code = cli::run(parse(&[
            "backtest",
            "-c",
            path(bad_config.path()),
            "-d",
            path(data.path()),
        ]));
        assert!(same_code(code, 2), "{:?}", code);

        let code = cli::run(parse(&[
            "backtest",
            "-c",
            path(config.path()),
            "-d",
            path(garbage.path()),
        ]));
        assert!(same_code(code, 3), "{:?}", code);

        let code = cli::run(parse(&[
            "backtest",
            "-c",
            path(config.path()),
            "-d",
            "/nonexistent/bars.csv",
        ]));
        assert!(same_code(code, 1), "{:?}", code);
    }
}

mod signals_command {
    use super::*;

    #[test]
    fn writes_stream_to_stdout() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(60)));
        let (result, csv) = execute(&["signals", "-c", path(config.path()), "-d", path(data.path())]);
        result.unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("index,timestamp,signal"));
        assert_eq!(lines.count(), 60);
    }

    #[test]
    fn writes_stream_to_file() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(60)));
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("signals.csv");
        let (result, stdout) = execute(&[
            "signals",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
            "-o",
            path(&output),
        ]);
        result.unwrap();
        assert!(stdout.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap().lines().count(), 61);
    }

    #[test]
    fn out_of_order_data_is_rejected() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(
            "timestamp,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n2024-01-01,1,1,1,1,1\n",
        );
        let (result, _) = execute(&["signals", "-c", path(config.path()), "-d", path(data.path())]);
        assert!(matches!(
            result,
            Err(StratError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn non_finite_price_exits_with_data_code() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(
            "timestamp,open,high,low,close,volume\n2024-01-01,1,1,1,1,1\n2024-01-02,1,1,1,NaN,1\n",
        );
        let code = cli::run(parse(&["signals", "-c", path(config.path()), "-d", path(data.path())]));
        assert!(same_code(code, 3), "{:?}", code);
    }
}

mod indicator_command {
    use super::*;

    #[test]
    fn sma_column_is_filled_after_warmup() {
        let data = write_temp(&bars_csv(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        let (result, csv) = execute(&[
            "indicator",
            "-d",
            path(data.path()),
            "--kind",
            "sma",
            "--period",
            "3",
        ]);
        result.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[2].contains(",false,"), "{}", lines[2]);
        let row: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(row[1], "true");
        assert_eq!(row[2].parse::<f64>().unwrap(), 2.0);
    }

    #[test]
    fn macd_with_bad_periods_is_invalid_config() {
        let data = write_temp(&bars_csv(&wave(40)));
        let (result, _) = execute(&[
            "indicator",
            "-d",
            path(data.path()),
            "--kind",
            "macd",
            "--fast",
            "30",
            "--slow",
            "10",
        ]);
        assert!(matches!(result, Err(StratError::InvalidConfig { .. })));
    }
}

mod sweep_command {
    use super::*;

    #[test]
    fn reports_each_strategy_file() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(200)));
        let dir = tempfile::tempdir().unwrap();
        let ma = dir.path().join("ma.ini");
        let rsi = dir.path().join("rsi.ini");
        std::fs::write(&ma, BACKTEST_INI).unwrap();
        std::fs::write(&rsi, RSI_INI).unwrap();

        let (result, table) = execute(&[
            "sweep",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
            "-s",
            path(&ma),
            "-s",
            path(&rsi),
        ]);
        result.unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("ma "), "{}", table);
        assert!(lines[2].starts_with("rsi "), "{}", table);
    }

    #[test]
    fn failed_job_is_listed_and_returned() {
        let config = write_temp(BACKTEST_INI);
        let data = write_temp(&bars_csv(&wave(100)));
        let dir = tempfile::tempdir().unwrap();
        let rsi = dir.path().join("rsi.ini");
        let long = dir.path().join("long.ini");
        std::fs::write(&rsi, RSI_INI).unwrap();
        std::fs::write(&long, TOO_LONG_INI).unwrap();

        let (result, table) = execute(&[
            "sweep",
            "-c",
            path(config.path()),
            "-d",
            path(data.path()),
            "-s",
            path(&rsi),
            "-s",
            path(&long),
        ]);
        assert!(matches!(result, Err(StratError::InsufficientData { .. })));
        assert!(table.contains("long"), "{}", table);
        assert!(table.contains("error: insufficient data"), "{}", table);
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_is_described() {
        let config = write_temp(BACKTEST_INI);
        let (result, text) = execute(&["validate", "-c", path(config.path())]);
        result.unwrap();
        assert!(text.contains("MA Crossover (SMA 5/20)"), "{}", text);
        assert!(text.contains("Minimum bars:    20"), "{}", text);
        assert!(text.contains("Timeframe:       1h"), "{}", text);
        assert!(text.contains("Configuration is valid."));
    }

    #[test]
    fn missing_kind_is_config_missing() {
        let config = write_temp("[strategy]\nfast_period = 5\n");
        let (result, _) = execute(&["validate", "-c", path(config.path())]);
        assert!(matches!(
            result,
            Err(StratError::ConfigMissing { key, .. }) if key == "kind"
        ));
    }

    #[test]
    fn unknown_kind_is_invalid_config() {
        let config = write_temp("[strategy]\nkind = turtle\n");
        let (result, _) = execute(&["validate", "-c", path(config.path())]);
        assert!(matches!(
            result,
            Err(StratError::InvalidConfig { key, .. }) if key == "kind"
        ));
    }

    #[test]
    fn self_referencing_combination_hits_depth_cap() {
        let config = write_temp(
            "[strategy]\nkind = combination\nsub_strategies = loop, loop\n\
             [strategy.loop]\nkind = combination\nsub_strategies = loop, loop\n",
        );
        let (result, _) = execute(&["validate", "-c", path(config.path())]);
        assert!(matches!(
            result,
            Err(StratError::InvalidConfig { key, .. }) if key == "sub_strategies"
        ));
    }

    #[test]
    fn parsed_command_matches_subcommand() {
        assert!(matches!(
            parse(&["validate", "-c", "x.ini"]).command,
            Command::Validate { .. }
        ));
    }
}
