//! Latest-signal query: the classifier's call on the most recent bar.

use chrono::NaiveDate;

use crate::domain::error::{ModelError, TradechipError};
use crate::domain::features::{derive_feature_series, FeatureVector, SMA_LONG};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;
use crate::ports::classifier_port::SignalClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct LatestSignal {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub features: FeatureVector,
    pub signal: Signal,
}

/// Predict on the last feature-complete bar of `bars`.
pub fn latest_signal(
    symbol: &str,
    bars: &[PriceBar],
    classifier: &dyn SignalClassifier,
) -> Result<LatestSignal, TradechipError> {
    let series = derive_feature_series(symbol, bars)?;
    let row = series
        .rows
        .last()
        .ok_or_else(|| TradechipError::InsufficientHistory {
            symbol: symbol.to_string(),
            rows: bars.len(),
            minimum: SMA_LONG,
        })?;

    if !row.features.is_finite() {
        return Err(ModelError::Prediction {
            reason: format!("non-finite feature values on {}", row.date()),
        }
        .into());
    }

    let signal = classifier.predict(&row.features)?;
    Ok(LatestSignal {
        symbol: symbol.to_string(),
        date: row.date(),
        close: row.close(),
        features: row.features,
        signal,
    })
}
