//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), both smoothed from the first bar
//! Signal Line = EMA(signal) of MACD Line, seeded with the first defined line value
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! The line is defined from bar max(fast, slow) - 1, the signal from
//! max(fast, slow) - 1 + signal - 1 (bar 33 for defaults). A point is valid
//! only once all three outputs are defined.

use crate::domain::indicator::ema::{recursive_smooth, smoothing_factor};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = recursive_smooth(&closes, smoothing_factor(fast));
    let ema_slow = recursive_smooth(&closes, smoothing_factor(slow));

    let line_start = fast.max(slow) - 1;
    let signal_start = line_start + signal_period - 1;

    let macd_line: Vec<f64> = (0..bars.len())
        .map(|i| {
            if i >= line_start {
                ema_fast[i] - ema_slow[i]
            } else {
                f64::NAN
            }
        })
        .collect();

    let mut signal_line = vec![f64::NAN; bars.len()];
    if bars.len() > line_start {
        let smoothed = recursive_smooth(&macd_line[line_start..], smoothing_factor(signal_period));
        for (offset, value) in smoothed.into_iter().enumerate() {
            let i = line_start + offset;
            if i >= signal_start {
                signal_line[i] = value;
            }
        }
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                date: bar.date,
                valid: i >= signal_start,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[PriceBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
