//! Confidence blender.
//!
//! An external estimate that is both far from 50 (beyond the override margin)
//! and directional replaces direction and confidence. Otherwise the rule
//! confidence is blended with a locally computed technical confidence. A
//! low-volatility penalty follows, then the clamp to the configured band.

use serde::{Deserialize, Serialize};

use crate::config::BlenderConfig;
use crate::data::ExternalEstimate;
use crate::domain::{ReasoningTrace, Side};
use crate::indicators::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// The external model overrode the rules.
    External,
    /// Rule confidence blended with technical confidence.
    Blended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blend {
    pub confidence: f64,
    pub side: Side,
    pub source: ConfidenceSource,
    /// The override flipped the strategy's direction.
    pub direction_flipped: bool,
    pub technical_confidence: f64,
    pub volatility_penalty: f64,
    pub reasoning: ReasoningTrace,
}

/// Local stand-in for the external model: 50 adjusted by trend strength,
/// RSI position, EMA alignment and volatility, clamped to [45, 85].
pub fn technical_confidence(ind: &IndicatorSet, side: Side) -> f64 {
    let mut c: f64 = 50.0;

    if ind.adx > 35.0 {
        c += 15.0;
    } else if ind.adx > 25.0 {
        c += 10.0;
    } else if ind.adx < 15.0 {
        c -= 10.0;
    }

    match side {
        Side::Buy => {
            if ind.rsi < 30.0 {
                c += 15.0;
            } else if ind.rsi < 45.0 {
                c += 8.0;
            } else if ind.rsi > 70.0 {
                c -= 10.0;
            }
            if ind.ema_fast > ind.ema_trend {
                c += 10.0;
            }
        }
        Side::Sell => {
            if ind.rsi > 70.0 {
                c += 15.0;
            } else if ind.rsi > 55.0 {
                c += 8.0;
            } else if ind.rsi < 30.0 {
                c -= 10.0;
            }
            if ind.ema_fast < ind.ema_trend {
                c += 10.0;
            }
        }
    }

    let atr_pct = ind.atr_percent;
    if (0.05..=0.15).contains(&atr_pct) {
        c += 8.0;
    } else if atr_pct > 0.30 {
        c -= 10.0;
    } else if atr_pct < 0.03 {
        c -= 8.0;
    }

    c.clamp(45.0, 85.0)
}

pub fn volatility_penalty(atr_percent: f64, cfg: &BlenderConfig) -> f64 {
    if atr_percent < cfg.very_low_volatility_pct {
        cfg.very_low_volatility_penalty
    } else if atr_percent < cfg.low_volatility_pct {
        cfg.low_volatility_penalty
    } else {
        0.0
    }
}

/// External estimate that qualifies as an override, with its side.
fn qualifying_override(estimate: Option<&ExternalEstimate>, cfg: &BlenderConfig) -> Option<(Side, f64)> {
    let est = estimate.filter(|e| e.model_available && e.confidence.is_finite())?;
    let side = est.direction.and_then(|d| d.side())?;
    ((est.confidence - 50.0).abs() > cfg.override_margin).then_some((side, est.confidence))
}

pub fn blend(
    rule_confidence: f64,
    side: Side,
    indicators: &IndicatorSet,
    estimate: Option<&ExternalEstimate>,
    cfg: &BlenderConfig,
) -> Blend {
    let mut reasoning = ReasoningTrace::new();
    let technical = technical_confidence(indicators, side);

    let (raw, final_side, source) = match qualifying_override(estimate, cfg) {
        Some((model_side, model_confidence)) => {
            reasoning.push(format!(
                "External model override: {model_side} at {model_confidence:.1} (rules said {side} at {rule_confidence:.1})"
            ));
            (model_confidence, model_side, ConfidenceSource::External)
        }
        None => {
            let blended = cfg.rule_weight * rule_confidence + (1.0 - cfg.rule_weight) * technical;
            reasoning.push(format!(
                "Confidence {blended:.1} = {:.0}% rules {rule_confidence:.1} + {:.0}% technical {technical:.1}",
                cfg.rule_weight * 100.0,
                (1.0 - cfg.rule_weight) * 100.0
            ));
            (blended, side, ConfidenceSource::Blended)
        }
    };

    let penalty = volatility_penalty(indicators.atr_percent, cfg);
    if penalty > 0.0 {
        reasoning.push(format!(
            "-{penalty:.0} low volatility (ATR {:.3}%)",
            indicators.atr_percent
        ));
    }

    let confidence = (raw - penalty).clamp(cfg.min_confidence, cfg.max_confidence);

    Blend {
        confidence,
        side: final_side,
        source,
        direction_flipped: final_side != side,
        technical_confidence: technical,
        volatility_penalty: penalty,
        reasoning,
    }
}
