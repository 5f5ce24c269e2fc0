//! Discrete trading signal emitted by a classifier.

use crate::domain::error::ModelError;
use std::fmt;

/// Ordinal encoding matches the classifier's class indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Sell = 0,
    Hold = 1,
    Buy = 2,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Sell, Signal::Hold, Signal::Buy];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::Sell => "Sell",
            Signal::Hold => "Hold",
            Signal::Buy => "Buy",
        }
    }
}

impl TryFrom<i64> for Signal {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Signal::Sell),
            1 => Ok(Signal::Hold),
            2 => Ok(Signal::Buy),
            other => Err(ModelError::Prediction {
                reason: format!("class {} is outside {{0, 1, 2}}", other),
            }),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
