//! The indicator snapshot consumed by every later stage.
//!
//! Built fresh per evaluation. Each value is resolved to a concrete number:
//! when an indicator has no usable output even after degrading its period,
//! a fixed default is substituted and its name is recorded in `defaulted`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vwap::{session_anchor, session_vwap, VwapSource};
use super::{latest_degraded, Adx, Atr, Choppiness, Ema, Rsi};
use crate::config::IndicatorConfig;
use crate::domain::Candle;

pub const DEFAULT_RSI: f64 = 50.0;
pub const DEFAULT_ADX: f64 = 20.0;
pub const DEFAULT_CHOPPINESS: f64 = 50.0;
/// ATR default as a fraction of the last close.
pub const DEFAULT_ATR_FRACTION: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Current price (quote mid) the percentages are measured against.
    pub price: f64,
    pub last_close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub ema_trend: f64,
    pub atr: f64,
    /// ATR in percent of price (0.05 = 0.05%).
    pub atr_percent: f64,
    pub rsi: f64,
    pub adx: f64,
    pub choppiness: f64,
    pub vwap: f64,
    pub vwap_source: Option<VwapSource>,
    /// Indicators that fell back to their default value.
    pub defaulted: Vec<String>,
}

impl IndicatorSet {
    /// Compute the snapshot over complete primary-timeframe candles.
    pub fn compute(candles: &[Candle], cfg: &IndicatorConfig, price: f64, at: DateTime<Utc>) -> Self {
        let last_close = candles.last().map(|c| c.close).unwrap_or(price);
        let mut defaulted = Vec::new();
        let mut resolve = |name: &str, value: Option<f64>, default: f64| match value {
            Some(v) if v.is_finite() => v,
            _ => {
                defaulted.push(name.to_string());
                default
            }
        };

        let ema_fast = resolve("ema_fast", latest_degraded(&Ema::new(cfg.ema_fast), candles), last_close);
        let ema_slow = resolve("ema_slow", latest_degraded(&Ema::new(cfg.ema_slow), candles), last_close);
        let ema_trend = resolve("ema_trend", latest_degraded(&Ema::new(cfg.ema_trend), candles), last_close);
        let atr = resolve(
            "atr",
            latest_degraded(&Atr::new(cfg.atr_period), candles).filter(|v| *v > 0.0),
            last_close * DEFAULT_ATR_FRACTION,
        );
        let rsi = resolve("rsi", latest_degraded(&Rsi::new(cfg.rsi_period), candles), DEFAULT_RSI);
        let adx = resolve("adx", latest_degraded(&Adx::new(cfg.adx_period), candles), DEFAULT_ADX);
        let choppiness = resolve(
            "choppiness",
            latest_degraded(&Choppiness::new(cfg.choppiness_period.max(2)), candles),
            DEFAULT_CHOPPINESS,
        );

        let anchor = session_anchor(at, cfg.vwap_session_start_hour);
        let vwap_reading = session_vwap(candles, anchor, cfg.vwap_fallback_candles);
        let vwap = resolve("vwap", vwap_reading.map(|r| r.value), last_close);

        let atr_percent = if price > 0.0 { atr / price * 100.0 } else { 0.0 };

        Self {
            price,
            last_close,
            ema_fast,
            ema_slow,
            ema_trend,
            atr,
            atr_percent,
            rsi,
            adx,
            choppiness,
            vwap,
            vwap_source: vwap_reading.map(|r| r.source),
            defaulted,
        }
    }

    pub fn is_defaulted(&self, name: &str) -> bool {
        self.defaulted.iter().any(|d| d == name)
    }
}

/// Trend reading of one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
    /// The timeframe was not available.
    Unknown,
}

impl TrendLabel {
    /// Bullish when fast EMA > slow EMA and the close sits above the slow EMA;
    /// bearish is the mirror; anything else is neutral.
    pub fn classify(candles: &[Candle], fast: usize, slow: usize) -> Self {
        let Some(last) = candles.last() else {
            return Self::Unknown;
        };
        let (Some(f), Some(s)) = (
            latest_degraded(&Ema::new(fast), candles),
            latest_degraded(&Ema::new(slow), candles),
        ) else {
            return Self::Unknown;
        };
        if f > s && last.close > s {
            Self::Bullish
        } else if f < s && last.close < s {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    pub fn is_bullish(self) -> bool {
        self == Self::Bullish
    }

    pub fn is_bearish(self) -> bool {
        self == Self::Bearish
    }
}
