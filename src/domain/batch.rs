//! Batch runner across many instruments.
//!
//! Each instrument is loaded and simulated independently; any failure skips
//! that instrument with a logged reason. Results are merged in input order
//! and ranked by net profit, highest first, ties keeping input order.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::error::TradechipError;
use crate::domain::features::FeatureSeries;
use crate::domain::run::{run_instrument, RunConfig};
use crate::domain::simulation::RunResult;
use crate::ports::classifier_port::SignalClassifier;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchConfig {
    pub run: RunConfig,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every instrument produced a result.
    Complete,
    /// Some instruments were skipped.
    Partial,
    /// No instrument produced a result.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub ranked: Vec<RunResult>,
    pub skipped: Vec<SkippedInstrument>,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        if self.ranked.is_empty() {
            BatchStatus::Empty
        } else if self.skipped.is_empty() {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial
        }
    }
}

/// Stable sort, so equal profits keep their input order.
pub fn rank_results(results: &mut [RunResult]) {
    results.sort_by(|a, b| b.net_profit.total_cmp(&a.net_profit));
}

pub struct BatchRunner<'a> {
    classifier: &'a dyn SignalClassifier,
    config: BatchConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(classifier: &'a dyn SignalClassifier, config: BatchConfig) -> Self {
        Self { classifier, config }
    }

    /// Run every symbol, loading its feature series through `load`.
    pub fn run<F>(&self, symbols: &[String], load: F) -> BatchReport
    where
        F: Fn(&str) -> Result<FeatureSeries, TradechipError> + Sync,
    {
        let run_one = |symbol: &String| -> Result<RunResult, TradechipError> {
            let series = load(symbol)?;
            run_instrument(&series, self.classifier, &self.config.run).map(|run| run.result)
        };

        let outcomes: Vec<Result<RunResult, TradechipError>> = if self.config.parallel {
            symbols.par_iter().map(run_one).collect()
        } else {
            symbols.iter().map(run_one).collect()
        };

        let mut report = BatchReport::default();
        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    info!(
                        symbol = %symbol,
                        net_profit = result.net_profit,
                        trades = result.trade_count,
                        "instrument complete"
                    );
                    report.ranked.push(result);
                }
                Err(e) => {
                    warn!(symbol = %symbol, reason = %e, "skipping instrument");
                    report.skipped.push(SkippedInstrument {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        rank_results(&mut report.ranked);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, net_profit: f64) -> RunResult {
        RunResult {
            symbol: symbol.into(),
            final_value: 10_000.0 + net_profit,
            net_profit,
            trade_count: 2,
        }
    }

    #[test]
    fn rank_descending_with_stable_ties() {
        let mut results = vec![
            result("A", 10.0),
            result("B", 50.0),
            result("C", 10.0),
            result("D", -5.0),
        ];
        rank_results(&mut results);
        let order: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn status_distinguishes_empty_and_partial() {
        let mut report = BatchReport::default();
        assert_eq!(report.status(), BatchStatus::Empty);

        report.skipped.push(SkippedInstrument {
            symbol: "X".into(),
            reason: "bad".into(),
        });
        assert_eq!(report.status(), BatchStatus::Empty);

        report.ranked.push(result("A", 1.0));
        assert_eq!(report.status(), BatchStatus::Partial);

        report.skipped.clear();
        assert_eq!(report.status(), BatchStatus::Complete);
    }
}
