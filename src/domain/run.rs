//! Single-instrument run: feature series through the classifier and simulator.

use tracing::debug;

use crate::domain::error::TradechipError;
use crate::domain::features::{FeatureRow, FeatureSeries, FeatureVector};
use crate::domain::signal::Signal;
use crate::domain::simulation::{
    simulate, RunResult, SignalBar, SimulationConfig, SimulationOutcome,
};
use crate::ports::classifier_port::SignalClassifier;

pub const MIN_FEATURE_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    /// Series with fewer feature-complete rows are not simulated.
    pub min_rows: usize,
    /// Drop the final bar, whose next-day outcome is unknown.
    pub exclude_last_bar: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            simulation: SimulationConfig::default(),
            min_rows: MIN_FEATURE_ROWS,
            exclude_last_bar: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRun {
    pub symbol: String,
    pub signals: Vec<Signal>,
    pub outcome: SimulationOutcome,
    pub result: RunResult,
}

/// Rows the simulator replays, after the min-rows guard and last-bar policy.
pub fn tradeable_rows<'a>(
    series: &'a FeatureSeries,
    config: &RunConfig,
) -> Result<&'a [FeatureRow], TradechipError> {
    if series.len() < config.min_rows {
        return Err(TradechipError::InsufficientHistory {
            symbol: series.symbol.clone(),
            rows: series.len(),
            minimum: config.min_rows,
        });
    }
    let rows = series.rows.as_slice();
    if config.exclude_last_bar && !rows.is_empty() {
        Ok(&rows[..rows.len() - 1])
    } else {
        Ok(rows)
    }
}

pub fn run_instrument(
    series: &FeatureSeries,
    classifier: &dyn SignalClassifier,
    config: &RunConfig,
) -> Result<InstrumentRun, TradechipError> {
    let rows = tradeable_rows(series, config)?;

    let features: Vec<FeatureVector> = rows.iter().map(|r| r.features).collect();
    let signals = classifier.predict_batch(&features)?;

    let bars: Vec<SignalBar> = rows
        .iter()
        .zip(&signals)
        .map(|(row, &signal)| SignalBar {
            date: row.date(),
            price: row.close(),
            signal,
        })
        .collect();

    let outcome = simulate(&bars, &config.simulation);
    debug!(
        symbol = %series.symbol,
        bars = bars.len(),
        trades = outcome.trade_count(),
        no_ops = outcome.no_ops.len(),
        "simulated"
    );

    let result = outcome.run_result(&series.symbol);
    Ok(InstrumentRun {
        symbol: series.symbol.clone(),
        signals,
        outcome,
        result,
    })
}
