//! Per-instrument series storage port.

use crate::domain::error::TradechipError;
use crate::domain::features::FeatureSeries;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Raw daily bars, coerced, chronological, one bar per date.
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PriceBar>, TradechipError>;

    /// Feature-complete rows of a processed table. Incomplete rows are dropped.
    fn fetch_feature_table(&self, symbol: &str) -> Result<FeatureSeries, TradechipError>;

    /// Persist a feature-complete series so `fetch_feature_table` can read it back.
    fn store_feature_table(&self, series: &FeatureSeries) -> Result<(), TradechipError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradechipError>;
}
