//! Composite risk:reward ratio.
//!
//! base_ratio x structure x trend x session x liquidity x economic impact.
//! Each multiplier is clamped to [multiplier_floor, multiplier_ceiling], the
//! product to [min_ratio, max_ratio].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::RiskConfig;
use crate::regime::Regime;

/// Where the evaluation time sits relative to today's session opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Inside an open-breakout window.
    OpenBreakout,
    /// At least one session has opened today.
    Active,
    /// No session has opened yet today.
    Off,
}

/// Scheduled-news impact supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicImpact {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl FromStr for EconomicImpact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown economic impact '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioInputs {
    pub regime: Regime,
    pub adx: f64,
    pub session: SessionPhase,
    pub spread: f64,
    pub atr: f64,
    pub economic_impact: EconomicImpact,
}

/// Clamped multipliers and the resulting ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBreakdown {
    pub structure: f64,
    pub trend: f64,
    pub session: f64,
    pub liquidity: f64,
    pub economic: f64,
    pub composite: f64,
}

pub fn composite_ratio(inputs: &RatioInputs, cfg: &RiskConfig) -> RatioBreakdown {
    let adj = &cfg.adjustments;
    let clamp = |m: f64| m.clamp(cfg.multiplier_floor, cfg.multiplier_ceiling);

    let structure = clamp(match inputs.regime {
        Regime::Trend => adj.trend_regime,
        Regime::Range => adj.range_regime,
        Regime::Uncertain => adj.uncertain_regime,
    });

    let trend = clamp(if inputs.adx > adj.strong_adx_min {
        adj.strong_adx
    } else if inputs.adx < adj.weak_adx_max {
        adj.weak_adx
    } else {
        1.0
    });

    let session = clamp(match inputs.session {
        SessionPhase::OpenBreakout => adj.open_breakout_session,
        SessionPhase::Active => adj.in_session,
        SessionPhase::Off => adj.off_session,
    });

    let liquidity = clamp(if inputs.atr > 0.0 {
        let spread_to_atr = inputs.spread / inputs.atr;
        if spread_to_atr <= adj.tight_spread_ratio {
            adj.tight_spread
        } else if spread_to_atr >= adj.wide_spread_ratio {
            adj.wide_spread
        } else {
            1.0
        }
    } else {
        adj.wide_spread
    });

    let economic = clamp(match inputs.economic_impact {
        EconomicImpact::None | EconomicImpact::Low => 1.0,
        EconomicImpact::Medium => adj.medium_impact,
        EconomicImpact::High => adj.high_impact,
    });

    let composite = (cfg.base_ratio * structure * trend * session * liquidity * economic)
        .clamp(cfg.min_ratio, cfg.max_ratio);

    RatioBreakdown {
        structure,
        trend,
        session,
        liquidity,
        economic,
        composite,
    }
}
