//! Accounting invariants over arbitrary price and signal sequences.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tradechip::domain::account::{Account, TradeAction};
use tradechip::domain::signal::Signal;
use tradechip::domain::simulation::{apply_signal, simulate, SignalBar, SimulationConfig};

fn signal_strategy() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Sell), Just(Signal::Hold), Just(Signal::Buy)]
}

fn bars_strategy() -> impl Strategy<Value = Vec<SignalBar>> {
    prop::collection::vec((0.5f64..5_000.0, signal_strategy()), 1..80).prop_map(|points| {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        points
            .into_iter()
            .enumerate()
            .map(|(i, (price, signal))| SignalBar {
                date: start + Duration::days(i as i64),
                price,
                signal,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn cash_never_negative(bars in bars_strategy()) {
        let mut account = Account::new(10_000.0);
        for bar in &bars {
            apply_signal(&mut account, bar.date, bar.price, bar.signal);
            prop_assert!(account.cash >= 0.0);
        }
    }

    #[test]
    fn ends_flat_with_one_point_per_bar(bars in bars_strategy()) {
        let outcome = simulate(&bars, &SimulationConfig::default());

        prop_assert_eq!(outcome.account.quantity, 0);
        prop_assert_eq!(outcome.trajectory.len(), bars.len());
        let last = outcome.trajectory.last().unwrap();
        prop_assert_eq!(last.value, outcome.final_value());
    }

    #[test]
    fn buys_and_sales_alternate(bars in bars_strategy()) {
        let outcome = simulate(&bars, &SimulationConfig::default());

        // consecutive buys merge into one open position, so collapse them
        let mut open = false;
        for trade in &outcome.trades {
            match trade.action {
                TradeAction::Buy => open = true,
                TradeAction::Sell | TradeAction::ForcedSell => {
                    prop_assert!(open);
                    open = false;
                }
            }
        }
        prop_assert!(!open);
        let forced = outcome.trades.iter().filter(|t| t.action == TradeAction::ForcedSell).count();
        prop_assert!(forced <= 1);
    }

    #[test]
    fn hold_leaves_account_unchanged(
        cash in 0.0f64..50_000.0,
        quantity in 0u64..1_000,
        price in 0.5f64..5_000.0,
    ) {
        let mut account = Account { cash, quantity };
        let before = account.clone();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        apply_signal(&mut account, date, price, Signal::Hold);
        prop_assert_eq!(account, before);
    }

    #[test]
    fn unaffordable_buy_is_idempotent(cash in 0.0f64..100.0, price in 100.5f64..1_000.0) {
        let mut account = Account { cash, quantity: 0 };
        let before = account.clone();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        apply_signal(&mut account, date, price, Signal::Buy);
        prop_assert_eq!(account, before);
    }

    #[test]
    fn all_hold_returns_initial_capital(prices in prop::collection::vec(0.5f64..5_000.0, 1..50)) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<SignalBar> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| SignalBar {
                date: start + Duration::days(i as i64),
                price,
                signal: Signal::Hold,
            })
            .collect();
        let outcome = simulate(&bars, &SimulationConfig::default());

        prop_assert!(outcome.trades.is_empty());
        prop_assert_eq!(outcome.net_profit(), 0.0);
    }

    #[test]
    fn deterministic(bars in bars_strategy()) {
        let config = SimulationConfig::default();
        prop_assert_eq!(simulate(&bars, &config), simulate(&bars, &config));
    }
}
