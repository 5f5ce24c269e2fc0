//! Report output port.

use std::path::Path;

use crate::domain::account::{TradeEvent, TrajectoryPoint};
use crate::domain::error::TradechipError;
use crate::domain::evaluation::PredictionRecord;
use crate::domain::simulation::RunResult;

/// Writers for the tabular artifacts a run produces. Monetary values are
/// rounded to two decimals here and nowhere earlier.
pub trait ReportPort {
    /// Ranked batch summary: `Symbol,FinalValue,NetProfit,TotalTrades`.
    fn write_summary(&self, ranked: &[RunResult], path: &Path) -> Result<(), TradechipError>;

    /// `Date,Action,Quantity,Price,Balance`.
    fn write_trade_log(&self, trades: &[TradeEvent], path: &Path) -> Result<(), TradechipError>;

    /// `Date,Close,Signal,PortfolioValue`.
    fn write_trajectory(
        &self,
        trajectory: &[TrajectoryPoint],
        path: &Path,
    ) -> Result<(), TradechipError>;

    /// `Date,Close,Real,Prediction`.
    fn write_predictions(
        &self,
        records: &[PredictionRecord],
        path: &Path,
    ) -> Result<(), TradechipError>;
}
