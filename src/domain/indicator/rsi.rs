//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing in its recursive form, alpha = 1/n:
//! - The first bar has no prior close and contributes zero gain and zero loss
//! - avg[i] = alpha * x[i] + (1 - alpha) * avg[i-1], seeded with the first bar
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first (n-1) bars are invalid (n observations are required).

use crate::domain::indicator::ema::recursive_smooth;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(f64::NAN),
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gains = Vec::with_capacity(bars.len());
    let mut losses = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        let change = if i == 0 {
            0.0
        } else {
            bars[i].close - bars[i - 1].close
        };
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let alpha = 1.0 / period as f64;
    let avg_gains = recursive_smooth(&gains, alpha);
    let avg_losses = recursive_smooth(&losses, alpha);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i + 1 < period {
                IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: IndicatorValue::Simple(f64::NAN),
                }
            } else {
                IndicatorPoint {
                    date: bar.date,
                    valid: true,
                    value: IndicatorValue::Simple(rsi_from_averages(avg_gains[i], avg_losses[i])),
                }
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
