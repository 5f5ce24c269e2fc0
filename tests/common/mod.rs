#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tradechip::domain::error::{ModelError, TradechipError};
use tradechip::domain::features::{FeatureRow, FeatureSeries, FeatureVector, FEATURE_NAMES};
pub use tradechip::domain::ohlcv::PriceBar;
pub use tradechip::domain::signal::Signal;
use tradechip::ports::classifier_port::SignalClassifier;
use tradechip::ports::data_port::DataPort;

pub struct MockDataPort {
    pub prices: HashMap<String, Vec<PriceBar>>,
    pub series: HashMap<String, FeatureSeries>,
    pub errors: HashMap<String, String>,
    pub stored: Mutex<HashMap<String, FeatureSeries>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            series: HashMap::new(),
            errors: HashMap::new(),
            stored: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_prices(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.prices.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_series(mut self, series: FeatureSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn stored(&self, symbol: &str) -> Option<FeatureSeries> {
        self.stored.lock().unwrap().get(symbol).cloned()
    }

    fn check(&self, symbol: &str) -> Result<(), TradechipError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(TradechipError::input(symbol, reason.clone())),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PriceBar>, TradechipError> {
        self.check(symbol)?;
        self.prices
            .get(symbol)
            .cloned()
            .ok_or_else(|| TradechipError::input(symbol, "no such file"))
    }

    fn fetch_feature_table(&self, symbol: &str) -> Result<FeatureSeries, TradechipError> {
        self.check(symbol)?;
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| TradechipError::input(symbol, "no such file"))
    }

    fn store_feature_table(&self, series: &FeatureSeries) -> Result<(), TradechipError> {
        self.stored
            .lock()
            .unwrap()
            .insert(series.symbol.clone(), series.clone());
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradechipError> {
        let mut symbols: Vec<String> = self
            .prices
            .keys()
            .chain(self.series.keys())
            .chain(self.errors.keys())
            .cloned()
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

/// Emits the signal whose code is stored in the RSI feature. A negative
/// code fails the prediction.
pub struct ScriptedClassifier;

impl SignalClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(&self, features: &FeatureVector) -> Result<Signal, ModelError> {
        let code = features.rsi_14 as i64;
        if code < 0 {
            return Err(ModelError::Prediction {
                reason: "scripted failure".into(),
            });
        }
        Signal::try_from(code)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn scripted_features(signal_code: f64) -> FeatureVector {
    FeatureVector::from_array([signal_code, 0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 100.0])
}

/// One row per `(close, signal)`, on consecutive days from 2024-01-01.
pub fn feature_series(symbol: &str, points: &[(f64, Signal)]) -> FeatureSeries {
    let start = date(2024, 1, 1);
    FeatureSeries {
        symbol: symbol.to_string(),
        rows: points
            .iter()
            .enumerate()
            .map(|(i, &(close, signal))| FeatureRow {
                bar: PriceBar::from_close(start + Duration::days(i as i64), close),
                features: scripted_features(signal.code() as f64),
            })
            .collect(),
    }
}

/// A series whose first row fails prediction.
pub fn failing_series(symbol: &str, len: usize) -> FeatureSeries {
    let mut series = feature_series(symbol, &vec![(100.0, Signal::Hold); len]);
    if let Some(row) = series.rows.first_mut() {
        row.features = scripted_features(-1.0);
    }
    series
}

/// Oscillating closes with a mild drift, enough to swing RSI both ways.
pub fn generate_bars(n: usize, base: f64) -> Vec<PriceBar> {
    let start = date(2023, 1, 2);
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = base + (t * 0.3).sin() * base * 0.08 + t * 0.05;
            PriceBar {
                date: start + Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 + t,
            }
        })
        .collect()
}

pub fn write_price_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) -> PathBuf {
    let mut content = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.close, b.volume
        ));
    }
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{}.csv", symbol));
    fs::write(&path, content).unwrap();
    path
}

/// Three one-split trees on RSI: Sell above 70, Buy below 30, otherwise Hold.
pub fn stump_model_json() -> String {
    let names = serde_json::to_string(&FEATURE_NAMES).unwrap();
    format!(
        r#"{{
  "learner": {{
    "feature_names": {names},
    "gradient_booster": {{
      "name": "gbtree",
      "model": {{
        "tree_info": [0, 1, 2],
        "trees": [
          {{"left_children": [1, -1, -1], "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0], "split_conditions": [70.0, -1.0, 1.0],
            "default_left": [0, 0, 0]}},
          {{"left_children": [-1], "right_children": [-1],
            "split_indices": [0], "split_conditions": [0.0], "default_left": [0]}},
          {{"left_children": [1, -1, -1], "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0], "split_conditions": [30.0, 1.0, -1.0],
            "default_left": [1, 0, 0]}}
        ]
      }}
    }},
    "learner_model_param": {{"base_score": "5E-1", "num_class": "3", "num_feature": "8"}}
  }}
}}"#
    )
}

pub fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("trade_model.json");
    fs::write(&path, stump_model_json()).unwrap();
    path
}
