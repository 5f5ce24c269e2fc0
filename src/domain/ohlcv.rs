//! Daily price bar representation.

use chrono::NaiveDate;

/// One trading-day observation. Only `close` is guaranteed finite and positive;
/// the other fields may carry NaN when the source value failed coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// A bar whose OHLC fields all equal `close`.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        PriceBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Coerce a raw text field to a number; anything that does not parse becomes `None`.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Parse a leading `YYYY-MM-DD`, tolerating a trailing time component.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let head = trimmed.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// True when `close` is usable by the engine.
pub fn is_valid_close(close: f64) -> bool {
    close.is_finite() && close > 0.0
}
