//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod features;
pub mod signal;
pub mod account;
pub mod simulation;
pub mod run;
pub mod batch;
pub mod evaluation;
pub mod live_signal;
pub mod preprocess;
pub mod config_validation;
pub mod error;
