//! Deterministic threshold classifier over RSI and the MACD/EMA trend.
//!
//! Precedence: RSI extremes first, then trend agreement, else Hold.
//! - RSI >= overbought, or MACD diff < 0 with EMA_20 < EMA_50: Sell
//! - RSI <= oversold, or MACD diff > 0 with EMA_20 > EMA_50: Buy

use crate::domain::error::ModelError;
use crate::domain::features::FeatureVector;
use crate::domain::signal::Signal;
use crate::ports::classifier_port::SignalClassifier;

pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleClassifier {
    oversold: f64,
    overbought: f64,
}

impl RuleClassifier {
    pub fn new(oversold: f64, overbought: f64) -> Result<Self, ModelError> {
        if !(0.0..=100.0).contains(&oversold)
            || !(0.0..=100.0).contains(&overbought)
            || oversold >= overbought
        {
            return Err(ModelError::Invalid {
                reason: format!(
                    "RSI thresholds must satisfy 0 <= oversold < overbought <= 100, got {} and {}",
                    oversold, overbought
                ),
            });
        }
        Ok(Self {
            oversold,
            overbought,
        })
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self {
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }
}

impl SignalClassifier for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    fn predict(&self, features: &FeatureVector) -> Result<Signal, ModelError> {
        if !features.is_finite() {
            return Err(ModelError::Prediction {
                reason: "feature vector contains non-finite values".into(),
            });
        }

        let f = features;
        if f.rsi_14 >= self.overbought {
            return Ok(Signal::Sell);
        }
        if f.rsi_14 <= self.oversold {
            return Ok(Signal::Buy);
        }
        if f.macd_diff < 0.0 && f.ema_20 < f.ema_50 {
            return Ok(Signal::Sell);
        }
        if f.macd_diff > 0.0 && f.ema_20 > f.ema_50 {
            return Ok(Signal::Buy);
        }
        Ok(Signal::Hold)
    }
}
