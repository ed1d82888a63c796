//! Regime detector.
//!
//! A pure classifier over (ADX, Choppiness). The optional [`RegimeState`]
//! smooths flicker between evaluations; it is owned by the caller and
//! passed in and out explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RegimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trend,
    Range,
    Uncertain,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trend => f.write_str("TREND"),
            Self::Range => f.write_str("RANGE"),
            Self::Uncertain => f.write_str("UNCERTAIN"),
        }
    }
}

/// TREND if ADX > adx_trend_min and CHOP < choppiness_trend_max;
/// RANGE if CHOP > choppiness_range_min regardless of ADX; otherwise UNCERTAIN.
pub fn classify(adx: f64, choppiness: f64, cfg: &RegimeConfig) -> Regime {
    if adx > cfg.adx_trend_min && choppiness < cfg.choppiness_trend_max {
        Regime::Trend
    } else if choppiness > cfg.choppiness_range_min {
        Regime::Range
    } else {
        Regime::Uncertain
    }
}

/// Hysteresis memory for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeState {
    /// Regime currently in force.
    pub effective: Regime,
    /// Most recent raw classification and how many times in a row it was seen.
    pub candidate: Regime,
    pub streak: u32,
}

impl RegimeState {
    pub fn new(regime: Regime) -> Self {
        Self {
            effective: regime,
            candidate: regime,
            streak: 1,
        }
    }

    /// Fold a raw classification into the state. The effective regime only
    /// changes after `confirmations` consecutive identical readings.
    pub fn observe(self, raw: Regime, confirmations: u32) -> Self {
        let streak = if raw == self.candidate {
            self.streak.saturating_add(1)
        } else {
            1
        };
        let effective = if raw == self.effective || streak >= confirmations.max(1) {
            raw
        } else {
            self.effective
        };
        Self {
            effective,
            candidate: raw,
            streak,
        }
    }
}

/// Raw classification plus the state after folding it in.
pub fn classify_with_state(
    adx: f64,
    choppiness: f64,
    prior: Option<RegimeState>,
    cfg: &RegimeConfig,
) -> (Regime, RegimeState) {
    let raw = classify(adx, choppiness, cfg);
    let state = match prior {
        Some(state) => state.observe(raw, cfg.hysteresis_confirmations),
        None => RegimeState::new(raw),
    };
    (raw, state)
}
