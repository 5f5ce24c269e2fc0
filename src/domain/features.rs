//! Feature derivation: price bars to the fixed eight-column feature matrix.
//!
//! Rows lacking any feature (anything before the SMA(50) warm-up completes)
//! are dropped, so the first usable row is bar index 49.

use crate::domain::error::TradechipError;
use crate::domain::indicator::{
    calculate_ema, calculate_macd_default, calculate_rsi, calculate_sma, IndicatorSeries,
};
use crate::domain::ohlcv::{is_valid_close, PriceBar};
use chrono::NaiveDate;
use tracing::trace;

pub const RSI_PERIOD: usize = 14;
pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
pub const EMA_SHORT: usize = 20;
pub const EMA_LONG: usize = 50;

/// Column names in the order the classifier expects them.
pub const FEATURE_NAMES: [&str; 8] = [
    "RSI_14",
    "MACD",
    "MACD_signal",
    "MACD_diff",
    "SMA_20",
    "SMA_50",
    "EMA_20",
    "EMA_50",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub rsi_14: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_diff: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub ema_20: f64,
    pub ema_50: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.rsi_14,
            self.macd,
            self.macd_signal,
            self.macd_diff,
            self.sma_20,
            self.sma_50,
            self.ema_20,
            self.ema_50,
        ]
    }

    pub fn from_array(values: [f64; 8]) -> Self {
        FeatureVector {
            rsi_14: values[0],
            macd: values[1],
            macd_signal: values[2],
            macd_diff: values[3],
            sma_20: values[4],
            sma_50: values[5],
            ema_20: values[6],
            ema_50: values[7],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// One feature-complete bar: the price the simulator trades at plus its features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub bar: PriceBar,
    pub features: FeatureVector,
}

impl FeatureRow {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}

/// Feature-complete series for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSeries {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
}

impl FeatureSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parallel per-bar features; `None` where any indicator is still warming up.
pub fn compute_features(bars: &[PriceBar]) -> Vec<Option<FeatureVector>> {
    let rsi = calculate_rsi(bars, RSI_PERIOD);
    let macd = calculate_macd_default(bars);
    let sma_short = calculate_sma(bars, SMA_SHORT);
    let sma_long = calculate_sma(bars, SMA_LONG);
    let ema_short = calculate_ema(bars, EMA_SHORT);
    let ema_long = calculate_ema(bars, EMA_LONG);

    for series in [&rsi, &macd, &sma_short, &sma_long, &ema_short, &ema_long] {
        log_warm_up(series);
    }

    (0..bars.len())
        .map(|i| {
            let (line, signal, histogram) = macd.macd_at(i)?;
            Some(FeatureVector {
                rsi_14: rsi.simple_at(i)?,
                macd: line,
                macd_signal: signal,
                macd_diff: histogram,
                sma_20: sma_short.simple_at(i)?,
                sma_50: sma_long.simple_at(i)?,
                ema_20: ema_short.simple_at(i)?,
                ema_50: ema_long.simple_at(i)?,
            })
        })
        .collect()
}

fn log_warm_up(series: &IndicatorSeries) {
    let first_valid = series.first_valid_index();
    trace!(
        indicator = ?series.indicator_type,
        first_valid = ?first_valid,
        first_valid_date = ?first_valid.map(|i| series.values[i].date),
        "indicator warm-up"
    );
}

/// Derive the feature-complete series, dropping warm-up rows.
///
/// Fails with an input error when no bar carries a usable close.
pub fn derive_feature_series(
    symbol: &str,
    bars: &[PriceBar],
) -> Result<FeatureSeries, TradechipError> {
    let usable: Vec<PriceBar> = bars.iter().filter(|b| is_valid_close(b.close)).cloned().collect();
    if usable.is_empty() {
        return Err(TradechipError::input(symbol, "no numeric Close values"));
    }

    let features = compute_features(&usable);
    let rows = usable
        .into_iter()
        .zip(features)
        .filter_map(|(bar, f)| f.map(|features| FeatureRow { bar, features }))
        .collect();

    Ok(FeatureSeries {
        symbol: symbol.to_string(),
        rows,
    })
}
