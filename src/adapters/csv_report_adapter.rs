//! CSV report writer.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::account::{TradeEvent, TrajectoryPoint};
use crate::domain::error::TradechipError;
use crate::domain::evaluation::PredictionRecord;
use crate::domain::simulation::RunResult;
use crate::ports::report_port::ReportPort;

/// Round a monetary amount for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

const SUMMARY_HEADERS: [&str; 4] = ["Symbol", "FinalValue", "NetProfit", "TotalTrades"];
const TRADE_HEADERS: [&str; 5] = ["Date", "Action", "Quantity", "Price", "Balance"];
const TRAJECTORY_HEADERS: [&str; 4] = ["Date", "Close", "Signal", "PortfolioValue"];
const PREDICTION_HEADERS: [&str; 4] = ["Date", "Close", "Real", "Prediction"];

#[derive(Serialize)]
struct SummaryRow<'a> {
    symbol: &'a str,
    final_value: f64,
    net_profit: f64,
    total_trades: usize,
}

#[derive(Serialize)]
struct TradeRow {
    date: String,
    action: &'static str,
    quantity: u64,
    price: f64,
    balance: f64,
}

#[derive(Serialize)]
struct TrajectoryRow {
    date: String,
    close: f64,
    signal: &'static str,
    portfolio_value: f64,
}

#[derive(Serialize)]
struct PredictionRow {
    date: String,
    close: f64,
    real: u8,
    prediction: u8,
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    /// The header is written up front so an empty report is still a valid table.
    fn write_rows<T: Serialize>(
        &self,
        headers: &[&str],
        rows: impl IntoIterator<Item = T>,
        path: &Path,
    ) -> Result<(), TradechipError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        wtr.write_record(headers)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_summary(&self, ranked: &[RunResult], path: &Path) -> Result<(), TradechipError> {
        let rows = ranked.iter().map(|r| SummaryRow {
            symbol: &r.symbol,
            final_value: round2(r.final_value),
            net_profit: round2(r.net_profit),
            total_trades: r.trade_count,
        });
        self.write_rows(&SUMMARY_HEADERS, rows, path)
    }

    fn write_trade_log(&self, trades: &[TradeEvent], path: &Path) -> Result<(), TradechipError> {
        let rows = trades.iter().map(|t| TradeRow {
            date: t.date.to_string(),
            action: t.action.label(),
            quantity: t.quantity,
            price: round2(t.price),
            balance: round2(t.resulting_cash),
        });
        self.write_rows(&TRADE_HEADERS, rows, path)
    }

    fn write_trajectory(
        &self,
        trajectory: &[TrajectoryPoint],
        path: &Path,
    ) -> Result<(), TradechipError> {
        let rows = trajectory.iter().map(|p| TrajectoryRow {
            date: p.date.to_string(),
            close: p.price,
            signal: p.signal.label(),
            portfolio_value: round2(p.value),
        });
        self.write_rows(&TRAJECTORY_HEADERS, rows, path)
    }

    fn write_predictions(
        &self,
        records: &[PredictionRecord],
        path: &Path,
    ) -> Result<(), TradechipError> {
        let rows = records.iter().map(|r| PredictionRow {
            date: r.date.to_string(),
            close: r.close,
            real: r.real.code(),
            prediction: r.predicted.code(),
        });
        self.write_rows(&PREDICTION_HEADERS, rows, path)
    }
}
