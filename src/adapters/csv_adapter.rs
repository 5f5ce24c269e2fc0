//! CSV directory data adapter: one `<SYMBOL>.csv` file per instrument.
//!
//! Columns are located by header name, so extra columns (`Adj Close`,
//! `Ticker`) and any column order are accepted.

use std::fs;
use std::path::PathBuf;

use csv::StringRecord;
use serde::Serialize;

use crate::domain::error::TradechipError;
use crate::domain::features::{FeatureRow, FeatureSeries, FeatureVector, FEATURE_NAMES};
use crate::domain::ohlcv::{coerce_date, coerce_number, is_valid_close, PriceBar};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn locate(symbol: &str, headers: &StringRecord) -> Result<Self, TradechipError> {
        let date = find_column(headers, "Date");
        let close = find_column(headers, "Close");
        match (date, close) {
            (Some(date), Some(close)) => Ok(Columns {
                date,
                close,
                open: find_column(headers, "Open"),
                high: find_column(headers, "High"),
                low: find_column(headers, "Low"),
                volume: find_column(headers, "Volume"),
            }),
            (None, _) => Err(TradechipError::input(symbol, "no Date column")),
            (_, None) => Err(TradechipError::input(symbol, "no Close column")),
        }
    }

    /// `None` when the date or close fails coercion.
    fn bar(&self, record: &StringRecord) -> Option<PriceBar> {
        let date = coerce_date(record.get(self.date)?)?;
        let close = coerce_number(record.get(self.close)?)?;
        if !is_valid_close(close) {
            return None;
        }
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .and_then(coerce_number)
                .unwrap_or(f64::NAN)
        };
        Some(PriceBar {
            date,
            open: field(self.open),
            high: field(self.high),
            low: field(self.low),
            close,
            volume: field(self.volume),
        })
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Chronological order, first occurrence of each date wins.
fn sort_and_dedup<T>(items: &mut Vec<T>, date_of: impl Fn(&T) -> chrono::NaiveDate) {
    items.sort_by_key(|item| date_of(item));
    items.dedup_by_key(|item| date_of(item));
}

#[derive(Serialize)]
struct FeatureRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
    #[serde(rename = "RSI_14")]
    rsi_14: f64,
    #[serde(rename = "MACD")]
    macd: f64,
    #[serde(rename = "MACD_signal")]
    macd_signal: f64,
    #[serde(rename = "MACD_diff")]
    macd_diff: f64,
    #[serde(rename = "SMA_20")]
    sma_20: f64,
    #[serde(rename = "SMA_50")]
    sma_50: f64,
    #[serde(rename = "EMA_20")]
    ema_20: f64,
    #[serde(rename = "EMA_50")]
    ema_50: f64,
}

impl From<&FeatureRow> for FeatureRecord {
    fn from(row: &FeatureRow) -> Self {
        let f = &row.features;
        FeatureRecord {
            date: row.bar.date.format("%Y-%m-%d").to_string(),
            open: row.bar.open,
            high: row.bar.high,
            low: row.bar.low,
            close: row.bar.close,
            volume: row.bar.volume,
            rsi_14: f.rsi_14,
            macd: f.macd,
            macd_signal: f.macd_signal,
            macd_diff: f.macd_diff,
            sma_20: f.sma_20,
            sma_50: f.sma_50,
            ema_20: f.ema_20,
            ema_50: f.ema_50,
        }
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_records(
        &self,
        symbol: &str,
    ) -> Result<(StringRecord, Vec<StringRecord>), TradechipError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            TradechipError::input(symbol, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok((headers, records))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PriceBar>, TradechipError> {
        let (headers, records) = self.read_records(symbol)?;
        let columns = Columns::locate(symbol, &headers)?;

        let mut bars: Vec<PriceBar> = records.iter().filter_map(|r| columns.bar(r)).collect();
        if bars.is_empty() {
            return Err(TradechipError::input(symbol, "no rows with a numeric Close"));
        }
        sort_and_dedup(&mut bars, |b| b.date);
        Ok(bars)
    }

    fn fetch_feature_table(&self, symbol: &str) -> Result<FeatureSeries, TradechipError> {
        let (headers, records) = self.read_records(symbol)?;
        let columns = Columns::locate(symbol, &headers)?;

        let mut feature_columns = [0usize; 8];
        let mut missing = Vec::new();
        for (slot, name) in feature_columns.iter_mut().zip(FEATURE_NAMES) {
            match find_column(&headers, name) {
                Some(idx) => *slot = idx,
                None => missing.push(name),
            }
        }
        if !missing.is_empty() {
            return Err(TradechipError::input(
                symbol,
                format!("missing feature columns: {}", missing.join(", ")),
            ));
        }

        let mut rows: Vec<FeatureRow> = records
            .iter()
            .filter_map(|record| {
                let bar = columns.bar(record)?;
                let mut values = [0.0; 8];
                for (value, &idx) in values.iter_mut().zip(&feature_columns) {
                    *value = record.get(idx).and_then(coerce_number).filter(|v| v.is_finite())?;
                }
                Some(FeatureRow {
                    bar,
                    features: FeatureVector::from_array(values),
                })
            })
            .collect();
        sort_and_dedup(&mut rows, |r| r.bar.date);

        Ok(FeatureSeries {
            symbol: symbol.to_string(),
            rows,
        })
    }

    fn store_feature_table(&self, series: &FeatureSeries) -> Result<(), TradechipError> {
        fs::create_dir_all(&self.base_path)?;
        let mut wtr = csv::Writer::from_path(self.csv_path(&series.symbol))?;
        for row in &series.rows {
            wtr.serialize(FeatureRecord::from(row))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradechipError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            let is_csv = path.extension().is_some_and(|ext| ext == "csv");
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
