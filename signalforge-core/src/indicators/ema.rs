//! Exponential Moving Average (EMA) of closes.
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA[period-1] = SMA of the first `period` closes.

use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    label: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            label: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

impl Periodic for Ema {
    fn period(&self) -> usize {
        self.period
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}

/// EMA over an arbitrary series, seeded with the SMA of the first `period`
/// values. A non-finite value in the seed window leaves the series empty; one
/// after the seed ends it there.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let (seed_window, rest) = values.split_at(period);
    if seed_window.iter().any(|v| !v.is_finite()) {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut level = seed_window.iter().sum::<f64>() / period as f64;
    out[period - 1] = level;

    for (slot, &v) in out[period..].iter_mut().zip(rest) {
        if !v.is_finite() {
            break;
        }
        level += alpha * (v - level);
        *slot = level;
    }
    out
}
