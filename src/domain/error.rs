//! Domain error types.

/// Failures of the opaque classifier, at load time or per prediction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("failed to load model {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("invalid model artifact: {reason}")]
    Invalid { reason: String },

    #[error("prediction failed: {reason}")]
    Prediction { reason: String },
}

/// Top-level error type for tradechip.
#[derive(Debug, thiserror::Error)]
pub enum TradechipError {
    #[error("input error for {symbol}: {reason}")]
    Input { symbol: String, reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("insufficient history for {symbol}: have {rows} rows, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradechipError {
    pub fn input(symbol: &str, reason: impl Into<String>) -> Self {
        TradechipError::Input {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            TradechipError::Io(_) | TradechipError::Csv(_) => 1,
            TradechipError::ConfigParse { .. }
            | TradechipError::ConfigMissing { .. }
            | TradechipError::ConfigInvalid { .. } => 2,
            TradechipError::Model(_) => 3,
            TradechipError::Input { .. } | TradechipError::InsufficientHistory { .. } => 5,
        }
    }
}

impl From<&TradechipError> for std::process::ExitCode {
    fn from(err: &TradechipError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_message() {
        let err = TradechipError::InsufficientHistory {
            symbol: "TCS".into(),
            rows: 15,
            minimum: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for TCS: have 15 rows, need 20"
        );
    }

    #[test]
    fn model_error_is_transparent() {
        let err: TradechipError = ModelError::Invalid {
            reason: "no trees".into(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid model artifact: no trees");
    }

    #[test]
    fn exit_codes_by_category() {
        let input = TradechipError::input("INFY", "no Close column");
        assert_eq!(input.exit_status(), 5);
        let config = TradechipError::ConfigMissing {
            section: "model".into(),
            key: "path".into(),
        };
        assert_eq!(config.exit_status(), 2);
        let model = TradechipError::Model(ModelError::Load {
            path: "m.json".into(),
            reason: "missing".into(),
        });
        assert_eq!(model.exit_status(), 3);
    }
}
