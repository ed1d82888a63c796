//! Signal weighting.
//!
//! Combines the final confidence with technical quality, market conditions,
//! multi-timeframe confirmation and historical risk into a 0-100 weight,
//! mapped to a recommendation tier and a position-size multiplier. Usable on
//! its own, independently of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::WeightingConfig;
use crate::data::HistoricalStats;
use crate::domain::{Candle, Granularity, Side};
use crate::indicators::{IndicatorSet, TrendLabel};
use crate::strategy::TimeframeTrend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// Forces HOLD downstream.
    Avoid,
    Weak,
    Buy,
    Sell,
    StrongBuy,
    StrongSell,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Avoid => "AVOID",
            Self::Weak => "WEAK",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::StrongBuy => "STRONG_BUY",
            Self::StrongSell => "STRONG_SELL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightComponents {
    pub confidence: f64,
    pub technical_quality: f64,
    pub market_conditions: f64,
    pub mtf_confirmation: f64,
    pub risk_factors: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeight {
    pub total: f64,
    pub components: WeightComponents,
    pub recommendation: Recommendation,
    pub position_multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct WeightInputs<'a> {
    pub symbol: &'a str,
    pub side: Side,
    pub confidence: f64,
    pub indicators: &'a IndicatorSet,
    /// Most recent complete primary candle.
    pub last_candle: Option<&'a Candle>,
    pub primary: Granularity,
    pub trends: &'a [TimeframeTrend],
    pub stats: Option<HistoricalStats>,
}

pub fn weigh(inputs: &WeightInputs<'_>, cfg: &WeightingConfig) -> SignalWeight {
    let components = WeightComponents {
        confidence: confidence_score(inputs.confidence),
        technical_quality: technical_quality(inputs.indicators, inputs.side),
        market_conditions: market_conditions(inputs.last_candle, inputs.primary),
        mtf_confirmation: mtf_confirmation(inputs.trends, inputs.side),
        risk_factors: risk_factors(inputs.symbol, inputs.stats, cfg),
    };
    let w = &cfg.weights;
    let total = (components.confidence * w.confidence
        + components.technical_quality * w.technical_quality
        + components.market_conditions * w.market_conditions
        + components.mtf_confirmation * w.mtf_confirmation
        + components.risk_factors * w.risk_factors)
        .clamp(0.0, 100.0);

    SignalWeight {
        total,
        components,
        recommendation: recommendation(total, inputs.side, cfg),
        position_multiplier: position_multiplier(total),
    }
}

/// Piecewise map of a 0-100 confidence onto the weighting scale.
pub fn confidence_score(confidence: f64) -> f64 {
    let c = confidence.clamp(0.0, 100.0);
    let score = if c < 50.0 {
        c * 0.8
    } else if c < 70.0 {
        40.0 + (c - 50.0) * 1.5
    } else if c < 85.0 {
        70.0 + (c - 70.0) * 1.33
    } else {
        90.0 + (c - 85.0) * 0.67
    };
    score.clamp(0.0, 100.0)
}

pub fn technical_quality(ind: &IndicatorSet, side: Side) -> f64 {
    let mut score: f64 = 50.0;

    match side {
        Side::Buy => {
            if ind.rsi < 30.0 {
                score += 15.0;
            } else if ind.rsi < 50.0 {
                score += 10.0;
            } else if ind.rsi > 70.0 {
                score -= 15.0;
            }
        }
        Side::Sell => {
            if ind.rsi > 70.0 {
                score += 15.0;
            } else if ind.rsi > 50.0 {
                score += 10.0;
            } else if ind.rsi < 30.0 {
                score -= 15.0;
            }
        }
    }

    let ema_bullish = ind.ema_fast > ind.ema_slow;
    if ema_bullish == (side == Side::Buy) {
        score += 20.0;
    } else {
        score -= 10.0;
    }

    if ind.adx > 25.0 {
        score += 15.0;
    } else if ind.adx > 20.0 {
        score += 10.0;
    } else if ind.adx < 15.0 {
        score -= 10.0;
    }

    score.clamp(0.0, 100.0)
}

/// Candle range relative to price, plus a bonus for liquid timeframes.
pub fn market_conditions(last: Option<&Candle>, primary: Granularity) -> f64 {
    let mut score: f64 = 50.0;

    if let Some(c) = last.filter(|c| c.close > 0.0) {
        let range_pct = (c.high - c.low) / c.close * 100.0;
        if (0.05..=0.15).contains(&range_pct) {
            score += 20.0;
        } else if (0.03..=0.20).contains(&range_pct) {
            score += 10.0;
        } else if range_pct > 0.30 {
            score -= 15.0;
        } else if range_pct < 0.02 {
            score -= 10.0;
        }
    }

    score += match primary {
        Granularity::M5 | Granularity::M15 | Granularity::H1 => 15.0,
        Granularity::H4 => 10.0,
        Granularity::M1 => -5.0,
        Granularity::M30 | Granularity::D1 => 0.0,
    };

    score.clamp(0.0, 100.0)
}

/// +15 per agreeing timeframe, -10 per disagreeing one, +10 more for each
/// agreeing H1-or-higher timeframe. Unknown timeframes are not counted.
pub fn mtf_confirmation(trends: &[TimeframeTrend], side: Side) -> f64 {
    let wanted = match side {
        Side::Buy => TrendLabel::Bullish,
        Side::Sell => TrendLabel::Bearish,
    };
    let known: Vec<&TimeframeTrend> = trends.iter().filter(|t| t.label != TrendLabel::Unknown).collect();
    if known.is_empty() {
        return 50.0;
    }

    let mut score: f64 = 50.0;
    for t in known {
        if t.label == wanted {
            score += 15.0;
            if t.granularity.is_higher_timeframe() {
                score += 10.0;
            }
        } else {
            score -= 10.0;
        }
    }
    score.clamp(0.0, 100.0)
}

pub fn risk_factors(symbol: &str, stats: Option<HistoricalStats>, cfg: &WeightingConfig) -> f64 {
    let mut score: f64 = 50.0;

    if cfg.stable_symbols.iter().any(|s| s == symbol) {
        score += 20.0;
    } else if cfg.volatile_symbols.iter().any(|s| s == symbol) {
        score += 5.0;
    }

    if let Some(stats) = stats {
        if stats.drawdown_pct > 10.0 {
            score -= 20.0;
        } else if stats.drawdown_pct > 5.0 {
            score -= 10.0;
        }
        if stats.win_rate > 60.0 {
            score += 15.0;
        } else if stats.win_rate < 40.0 {
            score -= 15.0;
        }
    }

    score.clamp(0.0, 100.0)
}

pub fn recommendation(total: f64, side: Side, cfg: &WeightingConfig) -> Recommendation {
    if total < cfg.avoid_below {
        Recommendation::Avoid
    } else if total < cfg.buy_from {
        Recommendation::Weak
    } else if total < cfg.strong_from {
        match side {
            Side::Buy => Recommendation::Buy,
            Side::Sell => Recommendation::Sell,
        }
    } else {
        match side {
            Side::Buy => Recommendation::StrongBuy,
            Side::Sell => Recommendation::StrongSell,
        }
    }
}

pub fn position_multiplier(total: f64) -> f64 {
    if total >= 80.0 {
        2.0
    } else if total >= 70.0 {
        1.5
    } else if total >= 60.0 {
        1.0
    } else if total >= 50.0 {
        0.75
    } else if total >= 40.0 {
        0.5
    } else {
        0.25
    }
}
