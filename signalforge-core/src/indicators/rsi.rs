//! Relative Strength Index with Wilder-smoothed gains and losses.
//!
//! Seeded from the simple mean of the first `period` close-to-close moves,
//! then smoothed with alpha = 1/period. A window with no movement reads 50.

use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    label: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            label: format!("rsi_{period}"),
        }
    }
}

/// Running up/down averages.
#[derive(Debug, Clone, Copy, Default)]
struct MoveAverages {
    up: f64,
    down: f64,
}

impl MoveAverages {
    fn seed(moves: &[f64]) -> Self {
        let n = moves.len() as f64;
        let up = moves.iter().filter(|m| **m > 0.0).sum::<f64>() / n;
        let down = -moves.iter().filter(|m| **m < 0.0).sum::<f64>() / n;
        Self { up, down }
    }

    fn push(&mut self, mv: f64, alpha: f64) {
        self.up += alpha * (mv.max(0.0) - self.up);
        self.down += alpha * ((-mv).max(0.0) - self.down);
    }

    fn strength(&self) -> f64 {
        match (self.up > 0.0, self.down > 0.0) {
            (false, false) => 50.0,
            (true, false) => 100.0,
            (false, true) => 0.0,
            (true, true) => 100.0 - 100.0 / (1.0 + self.up / self.down),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut out = vec![f64::NAN; candles.len()];
        let moves: Vec<f64> = candles.windows(2).map(|w| w[1].close - w[0].close).collect();
        if moves.len() < self.period || moves[..self.period].iter().any(|m| !m.is_finite()) {
            return out;
        }

        let mut avg = MoveAverages::seed(&moves[..self.period]);
        out[self.period] = avg.strength();

        let alpha = 1.0 / self.period as f64;
        // moves[k] lands on candle k + 1
        for (k, &mv) in moves.iter().enumerate().skip(self.period) {
            if !mv.is_finite() {
                break;
            }
            avg.push(mv, alpha);
            out[k + 1] = avg.strength();
        }
        out
    }
}

impl Periodic for Rsi {
    fn period(&self) -> usize {
        self.period
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}
