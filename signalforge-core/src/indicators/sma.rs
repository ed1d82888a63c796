//! Simple moving average of closes. First value at index period - 1.

use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    label: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            label: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut out = vec![f64::NAN; candles.len()];
        // a window containing a bad close is NaN; windows after it recover
        for (i, window) in candles.windows(self.period).enumerate() {
            let sum: f64 = window.iter().map(|c| c.close).sum();
            if sum.is_finite() {
                out[i + self.period - 1] = sum / self.period as f64;
            }
        }
        out
    }
}

impl Periodic for Sma {
    fn period(&self) -> usize {
        self.period
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}
