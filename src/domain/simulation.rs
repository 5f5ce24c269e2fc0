//! Signal replay against a single cash/position account.
//!
//! Execution policy, evaluated once per bar in order:
//! - Buy with cash >= price: buy the maximum whole-share quantity affordable,
//!   up to the position ceiling `MAX_QUANTITY`
//! - Sell while holding: liquidate the full position
//! - anything else leaves the account unchanged
//!
//! The portfolio value is recorded after every bar. After the last bar any open
//! position is force-sold at the final price and the last trajectory entry is
//! replaced by the post-liquidation cash.

use chrono::NaiveDate;

use super::account::{
    Account, NoOp, NoOpReason, TradeAction, TradeEvent, TrajectoryPoint, STARTING_CAPITAL,
};
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: STARTING_CAPITAL,
        }
    }
}

/// One bar of simulation input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub date: NaiveDate,
    pub price: f64,
    pub signal: Signal,
}

/// Result of applying one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Traded(TradeEvent),
    Ignored(NoOpReason),
    Held,
}

/// Apply one bar's signal to the account.
pub fn apply_signal(
    account: &mut Account,
    date: NaiveDate,
    price: f64,
    signal: Signal,
) -> StepOutcome {
    match signal {
        Signal::Buy => {
            if account.headroom() == 0 {
                return StepOutcome::Ignored(NoOpReason::PositionLimit);
            }
            let quantity = account.affordable_quantity(price);
            if quantity == 0 {
                return StepOutcome::Ignored(NoOpReason::InsufficientCash);
            }
            let quantity = account.buy(quantity, price);
            StepOutcome::Traded(TradeEvent {
                date,
                action: TradeAction::Buy,
                quantity,
                price,
                resulting_cash: account.cash,
            })
        }
        Signal::Sell => {
            if account.is_flat() {
                return StepOutcome::Ignored(NoOpReason::NoPosition);
            }
            let quantity = account.liquidate(price);
            StepOutcome::Traded(TradeEvent {
                date,
                action: TradeAction::Sell,
                quantity,
                price,
                resulting_cash: account.cash,
            })
        }
        Signal::Hold => StepOutcome::Held,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub initial_capital: f64,
    pub account: Account,
    pub trades: Vec<TradeEvent>,
    pub no_ops: Vec<NoOp>,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl SimulationOutcome {
    pub fn final_value(&self) -> f64 {
        self.account.cash
    }

    pub fn net_profit(&self) -> f64 {
        self.final_value() - self.initial_capital
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn run_result(&self, symbol: &str) -> RunResult {
        RunResult {
            symbol: symbol.to_string(),
            final_value: self.final_value(),
            net_profit: self.net_profit(),
            trade_count: self.trade_count(),
        }
    }
}

/// Per-instrument summary consumed by the ranking step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub symbol: String,
    pub final_value: f64,
    pub net_profit: f64,
    pub trade_count: usize,
}

pub fn simulate(bars: &[SignalBar], config: &SimulationConfig) -> SimulationOutcome {
    let mut account = Account::new(config.initial_capital);
    let mut trades = Vec::new();
    let mut no_ops = Vec::new();
    let mut trajectory = Vec::with_capacity(bars.len());

    for bar in bars {
        match apply_signal(&mut account, bar.date, bar.price, bar.signal) {
            StepOutcome::Traded(event) => trades.push(event),
            StepOutcome::Ignored(reason) => no_ops.push(NoOp {
                date: bar.date,
                signal: bar.signal,
                price: bar.price,
                reason,
            }),
            StepOutcome::Held => {}
        }

        trajectory.push(TrajectoryPoint {
            date: bar.date,
            price: bar.price,
            signal: bar.signal,
            value: account.market_value(bar.price),
        });
    }

    if let Some(last) = bars.last() {
        if !account.is_flat() {
            let quantity = account.liquidate(last.price);
            trades.push(TradeEvent {
                date: last.date,
                action: TradeAction::ForcedSell,
                quantity,
                price: last.price,
                resulting_cash: account.cash,
            });
            if let Some(point) = trajectory.last_mut() {
                point.value = account.cash;
            }
        }
    }

    SimulationOutcome {
        initial_capital: config.initial_capital,
        account,
        trades,
        no_ops,
        trajectory,
    }
}
