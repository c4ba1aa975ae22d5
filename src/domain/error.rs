//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratError {
    #[error("invalid config value [{section}] {key}: {reason}")]
    InvalidConfig {
        section: String,
        key: String,
        reason: String,
    },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("price series is empty")]
    EmptySeries,

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("signal stream does not line up with price series: {signals} signals for {bars} bars")]
    MisalignedSignals { signals: usize, bars: usize },

    #[error("bar at {timestamp} does not follow {previous}")]
    NonMonotonicTimestamp {
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StratError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        StratError::InvalidConfig {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&StratError> for std::process::ExitCode {
    fn from(err: &StratError) -> Self {
        let code: u8 = match err {
            StratError::Io(_) => 1,
            StratError::InvalidConfig { .. }
            | StratError::ConfigMissing { .. }
            | StratError::ConfigParse { .. } => 2,
            StratError::Data { .. } => 3,
            StratError::EmptySeries
            | StratError::InsufficientData { .. }
            | StratError::NonMonotonicTimestamp { .. } => 5,
            StratError::MisalignedSignals { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
