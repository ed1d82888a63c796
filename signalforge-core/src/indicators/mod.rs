//! Indicator library.
//!
//! Indicators are pure functions: candle history in, numeric series out. The
//! first `lookback()` values of a series are `f64::NAN` (warmup). None of them
//! raise on short or degenerate input; [`latest_degraded`] shrinks the period
//! to what the history supports before giving up with `None`.

pub mod adx;
pub mod atr;
pub mod choppiness;
pub mod ema;
pub mod rsi;
pub mod set;
pub mod sma;
pub mod vwap;

pub use adx::Adx;
pub use atr::{true_range, wilder_smooth, Atr};
pub use choppiness::Choppiness;
pub use ema::{ema_of_series, Ema};
pub use rsi::Rsi;
pub use set::{IndicatorSet, TrendLabel};
pub use sma::Sma;
pub use vwap::{session_vwap, VwapReading, VwapSource};

use crate::domain::Candle;

/// Trait for series indicators.
///
/// # Look-ahead guard
/// No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_21", "atr_14").
    fn name(&self) -> &str;

    /// Number of candles before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series; output length equals input length.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;

    /// Most recent finite value, if any.
    fn latest(&self, candles: &[Candle]) -> Option<f64> {
        last_finite(&self.compute(candles))
    }
}

/// Indicators parameterized by a single lookback period.
pub trait Periodic: Indicator + Sized {
    fn period(&self) -> usize;

    /// Smallest period that still yields a meaningful value.
    fn min_period(&self) -> usize {
        1
    }

    fn with_period(&self, period: usize) -> Self;
}

/// Latest value, shrinking the period when the history is shorter than the lookback.
///
/// Returns `None` only when not even `min_period()` produces a finite value.
pub fn latest_degraded<I: Periodic>(indicator: &I, candles: &[Candle]) -> Option<f64> {
    if let Some(v) = indicator.latest(candles) {
        return Some(v);
    }
    let mut period = indicator.period();
    while period > indicator.min_period() {
        period -= 1;
        if let Some(v) = indicator.with_period(period).latest(candles) {
            return Some(v);
        }
    }
    None
}

/// Last finite value of a series.
pub fn last_finite(series: &[f64]) -> Option<f64> {
    series.iter().rev().copied().find(|v| v.is_finite())
}

/// Create synthetic M5 candles from close prices for testing.
///
/// open = prev_close (or close for the first candle), high/low = max/min(open, close) ± 0.0005,
/// volume = 1000, starting 2025-03-04 00:00 UTC.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 0.0005, open.min(close) - 0.0005, close)
        })
        .collect();
    make_ohlc_candles(&data)
}

/// Create M5 candles from (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            open_time: base + chrono::Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            complete: true,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
