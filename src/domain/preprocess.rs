//! Indicator materialisation: raw price files to feature tables.

use tracing::{info, warn};

use crate::domain::batch::SkippedInstrument;
use crate::domain::error::TradechipError;
use crate::domain::features::{derive_feature_series, FeatureSeries, SMA_LONG};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreprocessSummary {
    pub written: Vec<String>,
    pub skipped: Vec<SkippedInstrument>,
}

fn process_symbol(
    source: &dyn DataPort,
    sink: &dyn DataPort,
    symbol: &str,
) -> Result<FeatureSeries, TradechipError> {
    let bars = source.fetch_prices(symbol)?;
    let series = derive_feature_series(symbol, &bars)?;
    if series.is_empty() {
        return Err(TradechipError::InsufficientHistory {
            symbol: symbol.to_string(),
            rows: bars.len(),
            minimum: SMA_LONG,
        });
    }
    sink.store_feature_table(&series)?;
    Ok(series)
}

/// Derive and store features for every symbol `source` lists. Per-file
/// failures are skipped; only failing to list the source is fatal.
pub fn preprocess_all(
    source: &dyn DataPort,
    sink: &dyn DataPort,
) -> Result<PreprocessSummary, TradechipError> {
    let mut summary = PreprocessSummary::default();
    for symbol in source.list_symbols()? {
        match process_symbol(source, sink, &symbol) {
            Ok(series) => {
                info!(symbol = %symbol, rows = series.len(), "processed");
                summary.written.push(symbol);
            }
            Err(e) => {
                warn!(symbol = %symbol, reason = %e, "skipping file");
                summary.skipped.push(SkippedInstrument {
                    symbol,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(summary)
}
