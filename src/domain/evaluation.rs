//! Classifier evaluation against realised next-day moves.
//!
//! The realised label of a row compares the next row's close with its own:
//! up is Buy, down is Sell, unchanged is Hold. The final row has no successor
//! and is dropped.

use std::fmt;

use chrono::NaiveDate;

use crate::domain::error::TradechipError;
use crate::domain::features::{FeatureSeries, FeatureVector};
use crate::domain::signal::Signal;
use crate::ports::classifier_port::SignalClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub real: Signal,
    pub predicted: Signal,
}

pub fn realised_label(close: f64, next_close: f64) -> Signal {
    if next_close > close {
        Signal::Buy
    } else if next_close < close {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Confusion matrix rows are realised classes, columns are predictions,
/// both indexed by signal code.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub confusion: [[usize; 3]; 3],
    pub per_class: [ClassMetrics; 3],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    pub fn from_pairs(pairs: &[(Signal, Signal)]) -> Self {
        let mut confusion = [[0usize; 3]; 3];
        for &(real, predicted) in pairs {
            confusion[real.code() as usize][predicted.code() as usize] += 1;
        }

        let total = pairs.len();
        let mut per_class = [ClassMetrics::default(); 3];
        for (c, metrics) in per_class.iter_mut().enumerate() {
            let tp = confusion[c][c];
            let support: usize = confusion[c].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[c]).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            *metrics = ClassMetrics {
                precision,
                recall,
                f1,
                support,
            };
        }

        let correct: usize = (0..3).map(|c| confusion[c][c]).sum();
        let macro_avg = ClassMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / 3.0,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / 3.0,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / 3.0,
            support: total,
        };
        let weighted = |field: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                per_class
                    .iter()
                    .map(|m| field(m) * m.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            confusion,
            per_class,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn total(&self) -> usize {
        self.macro_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for signal in Signal::ALL {
            let m = &self.per_class[signal.code() as usize];
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                signal.label(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total()
        )?;
        for (label, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows real, columns predicted: Sell Hold Buy)")?;
        for (signal, row) in Signal::ALL.iter().zip(&self.confusion) {
            writeln!(f, "{:>14} {:>6} {:>6} {:>6}", signal.label(), row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub records: Vec<PredictionRecord>,
    pub report: ClassificationReport,
}

pub fn evaluate(
    series: &FeatureSeries,
    classifier: &dyn SignalClassifier,
) -> Result<Evaluation, TradechipError> {
    if series.len() < 2 {
        return Err(TradechipError::InsufficientHistory {
            symbol: series.symbol.clone(),
            rows: series.len(),
            minimum: 2,
        });
    }

    let labelled = &series.rows[..series.len() - 1];
    let features: Vec<FeatureVector> = labelled.iter().map(|r| r.features).collect();
    let predictions = classifier.predict_batch(&features)?;

    let records: Vec<PredictionRecord> = labelled
        .iter()
        .zip(series.rows.iter().skip(1))
        .zip(predictions)
        .map(|((row, next), predicted)| PredictionRecord {
            date: row.date(),
            close: row.close(),
            real: realised_label(row.close(), next.close()),
            predicted,
        })
        .collect();

    let pairs: Vec<(Signal, Signal)> = records.iter().map(|r| (r.real, r.predicted)).collect();
    let report = ClassificationReport::from_pairs(&pairs);
    Ok(Evaluation { records, report })
}
