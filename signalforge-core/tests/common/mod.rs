//! Shared fixtures for integration tests: an in-memory provider and
//! synthetic candle generators.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use signalforge_core::data::{
    ConfidenceEstimator, DataError, EstimatorError, ExternalEstimate, HistoricalStats, MarketDataProvider,
    OutcomeStore,
};
use signalforge_core::domain::{Candle, Direction, Granularity, Quote};
use signalforge_core::indicators::IndicatorSet;

/// Wednesday, mid New York session.
pub fn evaluation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap()
}

/// Saturday noon.
pub fn weekend_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap()
}

/// `n` complete candles ending just before `end`, drifting by `step` per
/// candle with a small oscillation on top.
pub fn drifting_candles(
    granularity: Granularity,
    n: usize,
    end: DateTime<Utc>,
    start_price: f64,
    step: f64,
) -> Vec<Candle> {
    let dur = granularity.duration();
    let mut prev = start_price;
    (0..n)
        .map(|i| {
            let close = start_price + step * i as f64 + 0.00015 * (i as f64 * 0.9).sin();
            let open = prev;
            prev = close;
            Candle {
                open_time: end - dur * (n - i) as i32,
                open,
                high: open.max(close) + 0.0006,
                low: open.min(close) - 0.0006,
                close,
                volume: 100.0 + (i % 7) as f64 * 10.0,
                complete: true,
            }
        })
        .collect()
}

/// Flat, oscillating candles around `mid`.
pub fn ranging_candles(granularity: Granularity, n: usize, end: DateTime<Utc>, mid: f64) -> Vec<Candle> {
    let dur = granularity.duration();
    (0..n)
        .map(|i| {
            let close = mid + 0.0010 * (i as f64 * 0.8).sin();
            let open = mid + 0.0010 * ((i as f64 - 1.0) * 0.8).sin();
            Candle {
                open_time: end - dur * (n - i) as i32,
                open,
                high: open.max(close) + 0.0003,
                low: open.min(close) - 0.0003,
                close,
                volume: 150.0,
                complete: true,
            }
        })
        .collect()
}

/// In-memory provider keyed by granularity; counts every call.
pub struct MockProvider {
    pub candles: HashMap<Granularity, Vec<Candle>>,
    pub quote: Option<Quote>,
    pub calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(quote: Option<Quote>) -> Self {
        Self {
            candles: HashMap::new(),
            quote,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, granularity: Granularity, candles: Vec<Candle>) -> Self {
        self.candles.insert(granularity, candles);
        self
    }

    /// Provider over an uptrend on all three timeframes, quoted at the last close.
    pub fn trending(at: DateTime<Utc>) -> Self {
        let m5 = drifting_candles(Granularity::M5, 300, at, 1.0800, 0.00004);
        let m15 = drifting_candles(Granularity::M15, 300, at, 1.0500, 0.00012);
        let h1 = drifting_candles(Granularity::H1, 300, at, 1.0000, 0.00030);
        let last = m5.last().map(|c| c.close).unwrap_or(1.0920);
        Self::new(Some(Quote::around_mid(last, 1.5, 0.0001)))
            .with(Granularity::M5, m5)
            .with(Granularity::M15, m15)
            .with(Granularity::H1, h1)
    }

    pub fn ranging(at: DateTime<Utc>) -> Self {
        let m5 = ranging_candles(Granularity::M5, 300, at, 1.1000);
        let m15 = ranging_candles(Granularity::M15, 300, at, 1.1000);
        let last = m5.last().map(|c| c.close).unwrap_or(1.1000);
        Self::new(Some(Quote::around_mid(last, 1.0, 0.0001)))
            .with(Granularity::M5, m5)
            .with(Granularity::M15, m15)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn candles(&self, symbol: &str, granularity: Granularity, count: usize) -> Result<Vec<Candle>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let candles = self.candles.get(&granularity).ok_or_else(|| DataError::Empty {
            symbol: symbol.to_string(),
            granularity,
        })?;
        let skip = candles.len().saturating_sub(count);
        Ok(candles[skip..].to_vec())
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quote.ok_or_else(|| DataError::Timeout(format!("quote for {symbol}")))
    }
}

/// Estimator returning a fixed answer, or failing.
pub struct FixedEstimator {
    pub answer: Option<ExternalEstimate>,
    pub seen: Mutex<Vec<String>>,
}

impl FixedEstimator {
    pub fn returning(direction: Direction, confidence: f64) -> Self {
        Self {
            answer: Some(ExternalEstimate {
                direction: Some(direction),
                confidence,
                model_available: true,
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ConfidenceEstimator for FixedEstimator {
    fn predict(&self, symbol: &str, _indicators: &IndicatorSet) -> Result<ExternalEstimate, EstimatorError> {
        self.seen.lock().unwrap().push(symbol.to_string());
        self.answer
            .ok_or_else(|| EstimatorError::Unavailable("model offline".into()))
    }
}

pub struct FixedStats(pub HistoricalStats);

impl OutcomeStore for FixedStats {
    fn stats(&self, _symbol: &str) -> Option<HistoricalStats> {
        Some(self.0)
    }
}
