//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{round2, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::rule_classifier::{RuleClassifier, DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD};
use crate::adapters::xgboost_adapter::XgboostClassifier;
use crate::domain::account::{TradeAction, TradeEvent, STARTING_CAPITAL};
use crate::domain::batch::{BatchConfig, BatchRunner, BatchStatus};
use crate::domain::config_validation::validate_config;
use crate::domain::error::TradechipError;
use crate::domain::evaluation::evaluate;
use crate::domain::features::{derive_feature_series, FeatureSeries, FEATURE_NAMES};
use crate::domain::live_signal::latest_signal;
use crate::domain::preprocess::preprocess_all;
use crate::domain::run::{run_instrument, RunConfig, MIN_FEATURE_ROWS};
use crate::domain::simulation::{RunResult, SimulationConfig};
use crate::ports::classifier_port::SignalClassifier;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_DIR: &str = "data/processed";
pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_MODEL_PATH: &str = "models/trade_model.json";
pub const DEFAULT_BATCH_OUTPUT: &str = "batch_backtest_results.csv";

#[derive(Parser, Debug)]
#[command(name = "tradechip", about = "Classifier-driven trading signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Derive indicator features from raw price files
    Preprocess {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Simulate every instrument in a directory and rank by net profit
    Batch {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read raw price files and derive features on the fly
        #[arg(long)]
        raw: bool,
        #[arg(long)]
        parallel: bool,
    },
    /// Simulate one instrument and print its trade log
    Simulate {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(long)]
        raw: bool,
        #[arg(long)]
        trade_log: Option<PathBuf>,
        #[arg(long)]
        trajectory: Option<PathBuf>,
    },
    /// Print the latest signal for a raw price file
    Signal {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Score predictions against realised next-day moves
    Evaluate {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(long)]
        raw: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Xgboost,
    Rules,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub kind: ModelKind,
    pub path: PathBuf,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub raw: bool,
    pub model: ModelSettings,
    pub run: RunConfig,
    pub output: PathBuf,
    pub parallel: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Preprocess {
            config,
            input_dir,
            output_dir,
        } => run_preprocess(config.as_deref(), input_dir, output_dir),
        Command::Batch {
            config,
            data_dir,
            model,
            output,
            raw,
            parallel,
        } => run_batch(config.as_deref(), data_dir, model, output, raw, parallel),
        Command::Simulate {
            file,
            config,
            model,
            raw,
            trade_log,
            trajectory,
        } => run_simulate(
            &file,
            config.as_deref(),
            model,
            raw,
            trade_log.as_deref(),
            trajectory.as_deref(),
        ),
        Command::Signal {
            file,
            config,
            model,
        } => run_signal(&file, config.as_deref(), model),
        Command::Evaluate {
            file,
            config,
            model,
            raw,
            output,
        } => run_evaluate(&file, config.as_deref(), model, raw, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load an INI file, or an empty configuration when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TradechipError> {
    match path {
        None => Ok(FileConfigAdapter::empty()),
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| TradechipError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, TradechipError> {
    let kind = match config.get_string_or("model", "kind", "xgboost").to_lowercase().as_str() {
        "xgboost" => ModelKind::Xgboost,
        "rules" => ModelKind::Rules,
        other => {
            return Err(TradechipError::ConfigInvalid {
                section: "model".into(),
                key: "kind".into(),
                reason: format!("unknown model kind '{}'", other),
            });
        }
    };

    if config
        .get_string("model", "path")
        .is_some_and(|p| p.trim().is_empty())
        && kind == ModelKind::Xgboost
    {
        return Err(TradechipError::ConfigMissing {
            section: "model".into(),
            key: "path".into(),
        });
    }

    let min_rows = config.get_int("simulation", "min_rows", MIN_FEATURE_ROWS as i64);
    let min_rows = usize::try_from(min_rows)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| TradechipError::ConfigInvalid {
            section: "simulation".into(),
            key: "min_rows".into(),
            reason: "min_rows must be at least 1".into(),
        })?;

    let format = config.get_string_or("data", "format", "processed").to_lowercase();

    Ok(Settings {
        data_dir: PathBuf::from(config.get_string_or("data", "dir", DEFAULT_DATA_DIR)),
        raw_dir: PathBuf::from(config.get_string_or("data", "raw_dir", DEFAULT_RAW_DIR)),
        raw: format == "raw",
        model: ModelSettings {
            kind,
            path: PathBuf::from(config.get_string_or("model", "path", DEFAULT_MODEL_PATH)),
            rsi_oversold: config.get_double("model", "rsi_oversold", DEFAULT_OVERSOLD),
            rsi_overbought: config.get_double("model", "rsi_overbought", DEFAULT_OVERBOUGHT),
        },
        run: RunConfig {
            simulation: SimulationConfig {
                initial_capital: config.get_double(
                    "simulation",
                    "initial_capital",
                    STARTING_CAPITAL,
                ),
            },
            min_rows,
            exclude_last_bar: config.get_bool("simulation", "exclude_last_bar", true),
        },
        output: PathBuf::from(config.get_string_or("batch", "output", DEFAULT_BATCH_OUTPUT)),
        parallel: config.get_bool("batch", "parallel", false),
    })
}

/// Config file, validation, then settings, in that order.
fn load_settings(config_path: Option<&Path>) -> Result<Settings, TradechipError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    build_settings(&adapter)
}

pub fn load_classifier(model: &ModelSettings) -> Result<Box<dyn SignalClassifier>, TradechipError> {
    let classifier: Box<dyn SignalClassifier> = match model.kind {
        ModelKind::Rules => {
            Box::new(RuleClassifier::new(model.rsi_oversold, model.rsi_overbought)?)
        }
        ModelKind::Xgboost => Box::new(XgboostClassifier::from_path(&model.path)?),
    };
    info!(classifier = classifier.name(), "classifier loaded");
    Ok(classifier)
}

/// Split `dir/SYMBOL.csv` into a data adapter over `dir` and the symbol.
///
/// The adapter always reads `<SYMBOL>.csv`, so any other extension is rejected
/// rather than silently swapped for a sibling file.
pub fn resolve_file(file: &Path) -> Result<(CsvAdapter, String), TradechipError> {
    let shown = file.display().to_string();
    let is_csv = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(TradechipError::input(&shown, "expected a .csv file"));
    }
    let symbol = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TradechipError::input(&shown, "not a file path"))?;
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((CsvAdapter::new(dir), symbol))
}

fn load_series(
    data: &dyn DataPort,
    symbol: &str,
    raw: bool,
) -> Result<FeatureSeries, TradechipError> {
    if raw {
        let bars = data.fetch_prices(symbol)?;
        derive_feature_series(symbol, &bars)
    } else {
        data.fetch_feature_table(symbol)
    }
}

pub fn format_trade(trade: &TradeEvent) -> String {
    let line = format!(
        "{} {} @ {:.2} on {} | Balance: {:.2}",
        trade.action, trade.quantity, trade.price, trade.date, trade.resulting_cash
    );
    if trade.action == TradeAction::ForcedSell {
        format!("{line} (end of series)")
    } else {
        line
    }
}

fn print_ranked(ranked: &[RunResult]) {
    println!(
        "{:<16} {:>14} {:>14} {:>12}",
        "Symbol", "FinalValue", "NetProfit", "TotalTrades"
    );
    for r in ranked {
        println!(
            "{:<16} {:>14.2} {:>14.2} {:>12}",
            r.symbol,
            round2(r.final_value),
            round2(r.net_profit),
            r.trade_count
        );
    }
}

pub fn run_preprocess(
    config_path: Option<&Path>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<(), TradechipError> {
    let settings = load_settings(config_path)?;
    let input = input_dir.unwrap_or(settings.raw_dir);
    let output = output_dir.unwrap_or(settings.data_dir);
    info!(input = %input.display(), output = %output.display(), "preprocessing");

    let summary = preprocess_all(&CsvAdapter::new(input), &CsvAdapter::new(output.clone()))?;

    for skipped in &summary.skipped {
        println!("skipped {}: {}", skipped.symbol, skipped.reason);
    }
    println!(
        "Processed {} file(s) into {}, skipped {}",
        summary.written.len(),
        output.display(),
        summary.skipped.len()
    );
    Ok(())
}

pub fn run_batch(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    model: Option<PathBuf>,
    output: Option<PathBuf>,
    raw: bool,
    parallel: bool,
) -> Result<(), TradechipError> {
    let mut settings = load_settings(config_path)?;
    if let Some(path) = model {
        settings.model.path = path;
    }
    let raw = raw || settings.raw;
    let classifier = load_classifier(&settings.model)?;

    let dir = match data_dir {
        Some(dir) => dir,
        None if raw => settings.raw_dir.clone(),
        None => settings.data_dir.clone(),
    };
    let output = output.unwrap_or(settings.output.clone());

    let data = CsvAdapter::new(dir.clone());
    let symbols = data.list_symbols()?;
    info!(dir = %dir.display(), instruments = symbols.len(), raw, "starting batch");

    let runner = BatchRunner::new(
        classifier.as_ref(),
        BatchConfig {
            run: settings.run.clone(),
            parallel: parallel || settings.parallel,
        },
    );
    let report = runner.run(&symbols, |symbol| load_series(&data, symbol, raw));

    for skipped in &report.skipped {
        println!("skipped {}: {}", skipped.symbol, skipped.reason);
    }

    if report.status() == BatchStatus::Empty {
        println!(
            "No instruments produced a result. Make sure {} holds CSV files with {}.",
            dir.display(),
            if raw {
                "Date and Close columns and enough history".to_string()
            } else {
                format!("the indicator columns ({})", FEATURE_NAMES.join(", "))
            }
        );
        return Ok(());
    }
    if report.status() == BatchStatus::Partial {
        warn!(
            skipped = report.skipped.len(),
            succeeded = report.ranked.len(),
            "batch completed with skipped instruments"
        );
    }

    CsvReportAdapter.write_summary(&report.ranked, &output)?;
    print_ranked(&report.ranked);
    println!("Results saved to {}", output.display());
    Ok(())
}

pub fn run_simulate(
    file: &Path,
    config_path: Option<&Path>,
    model: Option<PathBuf>,
    raw: bool,
    trade_log: Option<&Path>,
    trajectory: Option<&Path>,
) -> Result<(), TradechipError> {
    let mut settings = load_settings(config_path)?;
    if let Some(path) = model {
        settings.model.path = path;
    }
    let classifier = load_classifier(&settings.model)?;

    let (data, symbol) = resolve_file(file)?;
    let series = load_series(&data, &symbol, raw || settings.raw)?;
    let run = run_instrument(&series, classifier.as_ref(), &settings.run)?;
    let outcome = &run.outcome;

    println!("Trade log ({}):", symbol);
    for trade in &outcome.trades {
        println!("  {}", format_trade(trade));
    }
    if !outcome.no_ops.is_empty() {
        println!("Ignored signals: {}", outcome.no_ops.len());
    }
    println!();
    println!("Final portfolio value: {:.2}", round2(run.result.final_value));
    println!("Net profit: {:.2}", round2(run.result.net_profit));
    println!("Total trades: {}", run.result.trade_count);

    if let Some(path) = trade_log {
        CsvReportAdapter.write_trade_log(&outcome.trades, path)?;
        info!(path = %path.display(), "trade log written");
    }
    if let Some(path) = trajectory {
        CsvReportAdapter.write_trajectory(&outcome.trajectory, path)?;
        info!(path = %path.display(), "trajectory written");
    }
    Ok(())
}

pub fn run_signal(
    file: &Path,
    config_path: Option<&Path>,
    model: Option<PathBuf>,
) -> Result<(), TradechipError> {
    let mut settings = load_settings(config_path)?;
    if let Some(path) = model {
        settings.model.path = path;
    }
    let classifier = load_classifier(&settings.model)?;

    let (data, symbol) = resolve_file(file)?;
    let bars = data.fetch_prices(&symbol)?;
    let latest = latest_signal(&symbol, &bars, classifier.as_ref())?;

    println!("{} on {} (close {:.2}): {}", latest.symbol, latest.date, latest.close, latest.signal);
    for (name, value) in FEATURE_NAMES.iter().zip(latest.features.to_array()) {
        println!("  {name}: {value:.4}");
    }
    Ok(())
}

pub fn run_evaluate(
    file: &Path,
    config_path: Option<&Path>,
    model: Option<PathBuf>,
    raw: bool,
    output: Option<&Path>,
) -> Result<(), TradechipError> {
    let mut settings = load_settings(config_path)?;
    if let Some(path) = model {
        settings.model.path = path;
    }
    let classifier = load_classifier(&settings.model)?;

    let (data, symbol) = resolve_file(file)?;
    let series = load_series(&data, &symbol, raw || settings.raw)?;
    let evaluation = evaluate(&series, classifier.as_ref())?;

    println!("Classification report ({}):", symbol);
    println!();
    print!("{}", evaluation.report);

    if let Some(path) = output {
        CsvReportAdapter.write_predictions(&evaluation.records, path)?;
        println!("Predictions saved to {}", path.display());
    }
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), TradechipError> {
    let settings = load_settings(Some(config_path))?;
    println!("Configuration OK: {}", config_path.display());
    println!(
        "  model: {:?} ({})",
        settings.model.kind,
        settings.model.path.display()
    );
    println!(
        "  data: {} ({})",
        if settings.raw { settings.raw_dir.display() } else { settings.data_dir.display() },
        if settings.raw { "raw" } else { "processed" }
    );
    println!(
        "  simulation: capital {:.2}, min rows {}, exclude last bar {}",
        settings.run.simulation.initial_capital,
        settings.run.min_rows,
        settings.run.exclude_last_bar
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn resolve_file_splits_directory_and_symbol() {
        let (_, symbol) = resolve_file(Path::new("data/processed/TCS.NS.csv")).unwrap();
        assert_eq!(symbol, "TCS.NS");
        let (_, symbol) = resolve_file(Path::new("INFY.csv")).unwrap();
        assert_eq!(symbol, "INFY");
        let (_, symbol) = resolve_file(Path::new("data/WIPRO.CSV")).unwrap();
        assert_eq!(symbol, "WIPRO");
    }

    #[test]
    fn resolve_file_rejects_other_extensions() {
        for path in ["data/TCS.txt", "data/TCS", "data/TCS.csv.bak"] {
            let result = resolve_file(Path::new(path));
            assert!(
                matches!(result, Err(TradechipError::Input { ref symbol, .. }) if symbol == path),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn format_trade_marks_forced_sale() {
        let trade = TradeEvent {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            action: TradeAction::ForcedSell,
            quantity: 200,
            price: 50.0,
            resulting_cash: 10_000.0,
        };
        assert_eq!(
            format_trade(&trade),
            "FORCED SELL 200 @ 50.00 on 2024-05-02 | Balance: 10000.00 (end of series)"
        );
    }
}
