//! Configuration validation.
//!
//! Checks every configured value before any data is read. Absent keys are
//! fine (defaults apply); present but unusable values are rejected.

use crate::domain::error::TradechipError;
use crate::ports::config_port::ConfigPort;

pub const DATA_FORMATS: [&str; 2] = ["processed", "raw"];
pub const MODEL_KINDS: [&str; 2] = ["xgboost", "rules"];

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradechipError {
    TradechipError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradechipError> {
    validate_choice(config, "data", "format", &DATA_FORMATS)?;
    validate_choice(config, "model", "kind", &MODEL_KINDS)?;
    validate_rsi_thresholds(config)?;
    validate_initial_capital(config)?;
    validate_min_rows(config)?;
    validate_flag(config, "simulation", "exclude_last_bar")?;
    validate_flag(config, "batch", "parallel")?;
    Ok(())
}

fn validate_choice(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), TradechipError> {
    if let Some(value) = config.get_string(section, key) {
        let value = value.trim().to_lowercase();
        if !allowed.contains(&value.as_str()) {
            return Err(invalid(
                section,
                key,
                format!("'{}' is not one of {}", value, allowed.join(", ")),
            ));
        }
    }
    Ok(())
}

/// Numeric keys are read as text first so a typo is an error rather than
/// a silent fallback to the default.
fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TradechipError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("'{}' is not a number", raw))),
    }
}

fn validate_rsi_thresholds(config: &dyn ConfigPort) -> Result<(), TradechipError> {
    let oversold = parse_number(config, "model", "rsi_oversold")?.unwrap_or(30.0);
    let overbought = parse_number(config, "model", "rsi_overbought")?.unwrap_or(70.0);
    if !(0.0..=100.0).contains(&oversold) {
        return Err(invalid("model", "rsi_oversold", "must be between 0 and 100"));
    }
    if !(0.0..=100.0).contains(&overbought) {
        return Err(invalid("model", "rsi_overbought", "must be between 0 and 100"));
    }
    if oversold >= overbought {
        return Err(invalid(
            "model",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TradechipError> {
    if let Some(value) = parse_number(config, "simulation", "initial_capital")? {
        if value <= 0.0 {
            return Err(invalid(
                "simulation",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_min_rows(config: &dyn ConfigPort) -> Result<(), TradechipError> {
    if let Some(raw) = config.get_string("simulation", "min_rows") {
        match raw.trim().parse::<i64>() {
            Ok(n) if n >= 1 => {}
            Ok(_) => return Err(invalid("simulation", "min_rows", "min_rows must be at least 1")),
            Err(_) => {
                return Err(invalid(
                    "simulation",
                    "min_rows",
                    format!("'{}' is not an integer", raw),
                ));
            }
        }
    }
    Ok(())
}

fn validate_flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TradechipError> {
    if let Some(raw) = config.get_string(section, key) {
        let known = matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "false" | "no" | "0"
        );
        if !known {
            return Err(invalid(section, key, format!("'{}' is not a boolean", raw)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn invalid_key(result: Result<(), TradechipError>) -> String {
        match result {
            Err(TradechipError::ConfigInvalid { key, .. }) => key,
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&MapConfig::new(&[])).is_ok());
    }

    #[test]
    fn full_valid_config() {
        let config = MapConfig::new(&[
            ("data", "format", "Raw"),
            ("model", "kind", "xgboost"),
            ("model", "rsi_oversold", "20"),
            ("model", "rsi_overbought", "80"),
            ("simulation", "initial_capital", "5000"),
            ("simulation", "min_rows", "1"),
            ("simulation", "exclude_last_bar", "false"),
            ("batch", "parallel", "yes"),
        ]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_format_and_kind() {
        let config = MapConfig::new(&[("data", "format", "parquet")]);
        assert_eq!(invalid_key(validate_config(&config)), "format");

        let config = MapConfig::new(&[("model", "kind", "lstm")]);
        assert_eq!(invalid_key(validate_config(&config)), "kind");
    }

    #[test]
    fn capital_must_be_positive_number() {
        let config = MapConfig::new(&[("simulation", "initial_capital", "0")]);
        assert_eq!(invalid_key(validate_config(&config)), "initial_capital");

        let config = MapConfig::new(&[("simulation", "initial_capital", "ten grand")]);
        assert_eq!(invalid_key(validate_config(&config)), "initial_capital");
    }

    #[test]
    fn min_rows_must_be_positive_integer() {
        let config = MapConfig::new(&[("simulation", "min_rows", "0")]);
        assert_eq!(invalid_key(validate_config(&config)), "min_rows");

        let config = MapConfig::new(&[("simulation", "min_rows", "2.5")]);
        assert_eq!(invalid_key(validate_config(&config)), "min_rows");
    }

    #[test]
    fn rsi_thresholds_ordered_and_bounded() {
        let config = MapConfig::new(&[
            ("model", "rsi_oversold", "70"),
            ("model", "rsi_overbought", "30"),
        ]);
        assert_eq!(invalid_key(validate_config(&config)), "rsi_oversold");

        let config = MapConfig::new(&[("model", "rsi_overbought", "120")]);
        assert_eq!(invalid_key(validate_config(&config)), "rsi_overbought");

        // oversold alone above the default overbought
        let config = MapConfig::new(&[("model", "rsi_oversold", "75")]);
        assert_eq!(invalid_key(validate_config(&config)), "rsi_oversold");
    }

    #[test]
    fn flags_must_be_boolean() {
        let config = MapConfig::new(&[("batch", "parallel", "sometimes")]);
        assert_eq!(invalid_key(validate_config(&config)), "parallel");
    }
}
