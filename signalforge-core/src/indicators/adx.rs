//! Average Directional Index (Wilder).
//!
//! Directional movement is taken bar to bar, Wilder-smoothed together with
//! true range into +DI and -DI, and their normalized spread (DX) is smoothed
//! once more into ADX. Lookback: 2 * period.

use super::atr::{true_range, wilder_smooth};
use super::{Indicator, Periodic};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    label: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            label: format!("adx_{period}"),
        }
    }
}

/// (+DM, -DM) per candle; only the dominant positive move counts.
fn directional_movement(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    std::iter::once((f64::NAN, f64::NAN))
        .chain(candles.windows(2).map(|w| {
            let up = w[1].high - w[0].high;
            let down = w[0].low - w[1].low;
            match (up > down && up > 0.0, down > up && down > 0.0) {
                (true, _) => (up, 0.0),
                (_, true) => (0.0, down),
                _ => (0.0, 0.0),
            }
        }))
        .unzip()
}

fn dx(tr: f64, plus: f64, minus: f64) -> f64 {
    if !(tr.is_finite() && plus.is_finite() && minus.is_finite()) || tr == 0.0 {
        return f64::NAN;
    }
    let (plus_di, minus_di) = (100.0 * plus / tr, 100.0 * minus / tr);
    match plus_di + minus_di {
        total if total == 0.0 => 0.0,
        total => 100.0 * (plus_di - minus_di).abs() / total,
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.label
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        if candles.len() < 2 {
            return vec![f64::NAN; candles.len()];
        }
        let (plus_dm, minus_dm) = directional_movement(candles);
        let tr = wilder_smooth(&true_range(candles), self.period);
        let plus = wilder_smooth(&plus_dm, self.period);
        let minus = wilder_smooth(&minus_dm, self.period);

        let dx_series: Vec<f64> = tr
            .iter()
            .zip(plus.iter().zip(&minus))
            .map(|(&t, (&p, &m))| dx(t, p, m))
            .collect();
        wilder_smooth(&dx_series, self.period)
    }
}

impl Periodic for Adx {
    fn period(&self) -> usize {
        self.period
    }

    fn with_period(&self, period: usize) -> Self {
        Self::new(period)
    }
}
