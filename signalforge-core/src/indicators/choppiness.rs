//! Choppiness Index.
//!
//! CHOP = 100 * log10(sum(TR, n) / (HH(n) - LL(n))) / log10(n)
//!
//! High values mean sideways price action, low values a directional move.
//! A flat window (HH == LL) reads as fully choppy (100). Output is clamped
//! to [0, 100]. Needs period+1 candles so every TR in the window has a
//! previous close.

use super::atr::true_range;
use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Choppiness {
    period: usize,
    label: String,
}

impl Choppiness {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Choppiness period must be >= 2");
        Self {
            period,
            label: format!("chop_{period}"),
        }
    }
}

impl Indicator for Choppiness {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        let tr = true_range(candles);
        let log_period = (self.period as f64).log10();

        for i in self.period..n {
            let start = i + 1 - self.period;
            let window = &candles[start..=i];
            let tr_sum: f64 = tr[start..=i].iter().sum();
            let hh = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let range = hh - ll;

            result[i] = if range <= 0.0 || tr_sum <= 0.0 {
                100.0
            } else {
                (100.0 * (tr_sum / range).log10() / log_period).clamp(0.0, 100.0)
            };
        }
        result
    }
}

impl Periodic for Choppiness {
    fn period(&self) -> usize {
        self.period
    }

    fn min_period(&self) -> usize {
        2
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}
