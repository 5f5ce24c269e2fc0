//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No warmup: every bar is valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// Smoothing factor for a span of `period` bars.
pub fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Recursive exponential smoothing seeded with the first value.
pub fn recursive_smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &x in values {
        let next = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let smoothed = recursive_smooth(&closes, smoothing_factor(period));

    let values = bars
        .iter()
        .zip(smoothed)
        .map(|(bar, ema)| IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(ema),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap();
                PriceBar::from_close(date, close)
            })
            .collect()
    }

    fn value(series: &IndicatorSeries, i: usize) -> f64 {
        series.simple_at(i).unwrap()
    }

    #[test]
    fn ema_has_no_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 20);

        assert!(series.values.iter().all(|p| p.valid));
        assert!((value(&series, 0) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_ema(&bars, 3);

        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);

        assert!((value(&series, 1) - e1).abs() < f64::EPSILON);
        assert!((value(&series, 2) - e2).abs() < f64::EPSILON);
        assert!((value(&series, 3) - e3).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_period_1_tracks_price() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 1);

        assert!((value(&series, 1) - 20.0).abs() < f64::EPSILON);
        assert!((value(&series, 2) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let bars = make_bars(&[100.0; 5]);
        let series = calculate_ema(&bars, 3);

        for i in 0..5 {
            assert!((value(&series, i) - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_bars() {
        let series = calculate_ema(&[], 3);
        assert!(series.values.is_empty());
    }

    #[test]
    fn ema_period_0() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_ema(&bars, 0);
        assert!(series.values.is_empty());
    }

    #[test]
    fn ema_smoothing_factor() {
        assert!((smoothing_factor(20) - 2.0 / 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recursive_smooth_seeds_with_first_value() {
        let out = recursive_smooth(&[4.0, 8.0], 0.25);
        assert_eq!(out[0], 4.0);
        assert!((out[1] - 5.0).abs() < f64::EPSILON);
        assert!(recursive_smooth(&[], 0.5).is_empty());
    }
}
