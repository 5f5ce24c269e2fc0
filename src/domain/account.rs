//! Cash/position account state and the records a simulation emits.

use chrono::NaiveDate;
use std::fmt;

use super::signal::Signal;

pub const STARTING_CAPITAL: f64 = 10_000.0;

/// Position ceiling: 2^53, the largest range in which every share count is
/// exact as an `f64`.
pub const MAX_QUANTITY: u64 = 1 << 53;

/// Single-instrument account, owned by exactly one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub quantity: u64,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            quantity: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    /// Cash plus the position marked at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.cash + self.quantity as f64 * price
    }

    /// Shares that can still be added before the position hits [`MAX_QUANTITY`].
    pub fn headroom(&self) -> u64 {
        MAX_QUANTITY.saturating_sub(self.quantity)
    }

    /// Largest whole-share quantity whose cost does not exceed cash, capped
    /// by the remaining headroom.
    pub fn affordable_quantity(&self, price: f64) -> u64 {
        if !price.is_finite() || price <= 0.0 || self.cash < price {
            return 0;
        }
        let quotient = (self.cash / price).floor();
        let headroom = self.headroom();
        let mut quantity = if quotient >= headroom as f64 {
            headroom
        } else {
            quotient as u64
        };
        // floor(cash / price) can round up past the exact quotient
        while quantity > 0 && quantity as f64 * price > self.cash {
            quantity -= 1;
        }
        quantity
    }

    /// Buy up to `quantity` shares, returning the number actually added.
    pub fn buy(&mut self, quantity: u64, price: f64) -> u64 {
        let quantity = quantity.min(self.headroom());
        self.cash -= quantity as f64 * price;
        self.quantity = self.quantity.checked_add(quantity).unwrap_or(MAX_QUANTITY);
        quantity
    }

    /// Sell the whole position at `price`, returning the quantity sold.
    pub fn liquidate(&mut self, price: f64) -> u64 {
        let sold = self.quantity;
        self.cash += sold as f64 * price;
        self.quantity = 0;
        sold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    ForcedSell,
}

impl TradeAction {
    pub fn label(self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::ForcedSell => "FORCED SELL",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An executed action. `resulting_cash` is the balance after execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub quantity: u64,
    pub price: f64,
    pub resulting_cash: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    InsufficientCash,
    NoPosition,
    PositionLimit,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::InsufficientCash => f.write_str("insufficient cash for one share"),
            NoOpReason::NoPosition => f.write_str("no position to sell"),
            NoOpReason::PositionLimit => f.write_str("position already at the share limit"),
        }
    }
}

/// A Buy or Sell signal that left the account untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NoOp {
    pub date: NaiveDate,
    pub signal: Signal,
    pub price: f64,
    pub reason: NoOpReason,
}

/// Portfolio value recorded after each bar.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub signal: Signal,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account() {
        let account = Account::new(STARTING_CAPITAL);
        assert!((account.cash - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(account.quantity, 0);
        assert!(account.is_flat());
    }

    #[test]
    fn affordable_quantity_floors() {
        let account = Account::new(10_000.0);
        assert_eq!(account.affordable_quantity(100.0), 100);
        assert_eq!(account.affordable_quantity(333.0), 30);
    }

    #[test]
    fn affordable_quantity_zero_when_price_exceeds_cash() {
        let account = Account::new(50.0);
        assert_eq!(account.affordable_quantity(50.01), 0);
        assert_eq!(account.affordable_quantity(0.0), 0);
        assert_eq!(account.affordable_quantity(f64::NAN), 0);
    }

    #[test]
    fn affordable_quantity_never_overspends() {
        let account = Account { cash: 0.3, quantity: 0 };
        let q = account.affordable_quantity(0.1);
        assert!(q as f64 * 0.1 <= 0.3);
    }

    #[test]
    fn buy_and_liquidate() {
        let mut account = Account::new(10_000.0);
        account.buy(100, 100.0);
        assert_eq!(account.quantity, 100);
        assert!(account.cash.abs() < f64::EPSILON);
        assert!((account.market_value(120.0) - 12_000.0).abs() < f64::EPSILON);

        let sold = account.liquidate(120.0);
        assert_eq!(sold, 100);
        assert!(account.is_flat());
        assert!((account.cash - 12_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tiny_price_caps_at_share_limit() {
        let mut account = Account::new(10_000.0);
        let first = account.affordable_quantity(1e-300);
        assert_eq!(first, MAX_QUANTITY);
        assert_eq!(account.buy(first, 1e-300), MAX_QUANTITY);
        assert!(account.cash > 9_999.0);

        assert_eq!(account.headroom(), 0);
        assert_eq!(account.affordable_quantity(1e-300), 0);
        assert_eq!(account.buy(10, 1e-300), 0);
        assert_eq!(account.quantity, MAX_QUANTITY);
    }

    #[test]
    fn buy_clamps_to_headroom() {
        let mut account = Account {
            cash: 1_000.0,
            quantity: MAX_QUANTITY - 3,
        };
        assert_eq!(account.buy(10, 1.0), 3);
        assert_eq!(account.quantity, MAX_QUANTITY);
        assert!((account.cash - 997.0).abs() < f64::EPSILON);
    }

    #[test]
    fn action_labels() {
        assert_eq!(TradeAction::ForcedSell.to_string(), "FORCED SELL");
        assert_eq!(TradeAction::Buy.label(), "BUY");
    }
}
