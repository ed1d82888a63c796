//! Average True Range.
//!
//! True range is max(high - low, |high - prev_close|, |low - prev_close|).
//! ATR here is the plain mean of the trailing `period` true ranges; the first
//! candle has no previous close, so a value needs period + 1 candles.

use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    label: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            label: format!("atr_{period}"),
        }
    }
}

/// True range per candle. The first entry is just the candle's own range.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };
    std::iter::once(first.high - first.low)
        .chain(candles.windows(2).map(|w| {
            let (prev_close, c) = (w[0].close, &w[1]);
            (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs())
        }))
        .collect()
}

/// Wilder smoothing (alpha = 1/period).
///
/// Seeds with the mean of the first run of `period` finite values, so a
/// leading NaN prefix is skipped. A non-finite value after the seed ends the
/// series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values
        .windows(period)
        .position(|w| w.iter().all(|v| v.is_finite()))
    else {
        return out;
    };

    let seed_at = start + period - 1;
    let mut level = values[start..=seed_at].iter().sum::<f64>() / period as f64;
    out[seed_at] = level;

    let alpha = 1.0 / period as f64;
    for (slot, &v) in out[seed_at + 1..].iter_mut().zip(&values[seed_at + 1..]) {
        if !v.is_finite() {
            break;
        }
        level += alpha * (v - level);
        *slot = level;
    }
    out
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut out = vec![f64::NAN; candles.len()];
        if candles.len() <= self.period {
            return out;
        }
        // skip TR[0]: it has no previous close
        let tr = true_range(candles);
        for (i, window) in tr[1..].windows(self.period).enumerate() {
            out[i + self.period] = window.iter().sum::<f64>() / self.period as f64;
        }
        out
    }
}

impl Periodic for Atr {
    fn period(&self) -> usize {
        self.period
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}
