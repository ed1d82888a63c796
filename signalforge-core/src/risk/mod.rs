//! Risk calculator.
//!
//! Turns a strategy plan (side, entry, stop) into final exits: a single
//! take-profit at the composite risk:reward ratio, or a partial-exit ladder.
//! Every returned target satisfies the configured minimum ratio, except on
//! allow-listed instruments, which keep the strategy target as planned.

pub mod ladder;
pub mod ratio;

pub use ladder::{build_ladder, validate_ladder};
pub use ratio::{composite_ratio, EconomicImpact, RatioBreakdown, RatioInputs, SessionPhase};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RiskConfig;
use crate::domain::{Instrument, Side, TakeProfit};

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("ladder needs at least one level")]
    EmptyLadder,

    #[error("ladder has {multipliers} ratio multipliers but {fractions} position fractions")]
    LengthMismatch { multipliers: usize, fractions: usize },

    #[error("ladder position fractions sum to {0}, expected 1.0")]
    FractionSum(f64),

    #[error("ladder values must be positive, got {0}")]
    NonPositive(f64),
}

/// Lower and upper bounds on a stop distance, in price units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopBounds {
    /// max(instrument minimum, ATR-derived minimum, spread-derived minimum).
    pub effective_min: f64,
    /// Instrument maximum, never below `effective_min`.
    pub max: f64,
}

impl StopBounds {
    pub fn new(instrument: &Instrument, atr: f64, spread: f64, cfg: &RiskConfig) -> Self {
        let effective_min = instrument
            .min_stop_distance()
            .max(atr * cfg.volatility_min_atr_multiple)
            .max(spread * cfg.spread_multiple);
        Self {
            effective_min,
            max: instrument.max_stop_distance().max(effective_min),
        }
    }

    pub fn bound(&self, distance: f64) -> f64 {
        distance.max(self.effective_min).min(self.max)
    }
}

/// Mean/min/max risk:reward over the final targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl RatioSummary {
    pub fn from_ratios(ratios: &[f64]) -> Option<Self> {
        if ratios.is_empty() {
            return None;
        }
        let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = ratios.iter().sum::<f64>() / ratios.len() as f64;
        Some(Self { average, min, max })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPlan {
    pub take_profit: TakeProfit,
    pub ratio: RatioBreakdown,
    pub summary: RatioSummary,
    /// True when the instrument is on the 1:1 allow-list and kept the
    /// strategy's own target.
    pub one_to_one: bool,
    pub notes: Vec<String>,
}

/// Everything the risk calculator needs about one trade.
#[derive(Debug, Clone, Copy)]
pub struct TradeGeometry {
    pub side: Side,
    pub entry: f64,
    pub stop_loss: f64,
    /// The strategy's own target (1:1 + spread or a structural target).
    pub strategy_target: f64,
}

impl TradeGeometry {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}

/// 1:1 + spread target for symbols on the allow-list; `None` for every other symbol.
pub fn one_to_one_take_profit(
    symbol: &str,
    side: Side,
    entry: f64,
    risk: f64,
    spread: f64,
    allow_list: &[String],
) -> Option<f64> {
    allow_list
        .iter()
        .any(|s| s.eq_ignore_ascii_case(symbol))
        .then(|| entry + side.sign() * (risk + spread))
}

/// Final exits for a trade.
///
/// `sr_levels` are the support/resistance candidates a ladder level may snap to.
pub fn plan_exits(
    instrument: &Instrument,
    trade: TradeGeometry,
    spread: f64,
    ratio_inputs: &RatioInputs,
    sr_levels: &[f64],
    cfg: &RiskConfig,
) -> Result<ExitPlan, RiskError> {
    let risk = trade.risk();
    let ratio = composite_ratio(ratio_inputs, cfg);
    let mut notes = Vec::new();

    if let Some(one_to_one) = one_to_one_take_profit(
        &instrument.symbol,
        trade.side,
        trade.entry,
        risk,
        spread,
        &cfg.one_to_one_symbols,
    ) {
        // structural targets (PDH/PDL clamp, session VWAP) may sit inside 1:1
        let price = if trade.side.sign() * (trade.strategy_target - trade.entry) > 0.0 {
            trade.strategy_target
        } else {
            one_to_one
        };
        let rr = ratio_of(trade.entry, risk, price);
        notes.push(format!("Strategy target kept for {} at {price:.5}", instrument.symbol));
        let summary = RatioSummary {
            average: rr,
            min: rr,
            max: rr,
        };
        return Ok(ExitPlan {
            take_profit: TakeProfit::Single {
                price,
                risk_reward_ratio: rr,
            },
            ratio,
            summary,
            one_to_one: true,
            notes,
        });
    }

    let take_profit = if cfg.ladder.enabled {
        let levels = build_ladder(instrument, trade.side, trade.entry, risk, ratio.composite, sr_levels, cfg)?;
        notes.push(format!(
            "{}-level exit ladder at base ratio {:.2}",
            levels.len(),
            ratio.composite
        ));
        TakeProfit::Ladder { levels }
    } else {
        let raw = trade.entry + trade.side.sign() * risk * ratio.composite;
        let price = enforce_min_ratio(trade.side, trade.entry, risk, raw, cfg.min_ratio);
        let rr = ratio_of(trade.entry, risk, price);
        notes.push(format!("Take-profit at {rr:.2}R ({price:.5})"));
        TakeProfit::Single {
            price,
            risk_reward_ratio: rr,
        }
    };

    let summary = RatioSummary::from_ratios(&take_profit.ratios()).ok_or(RiskError::EmptyLadder)?;
    Ok(ExitPlan {
        take_profit,
        ratio,
        summary,
        one_to_one: false,
        notes,
    })
}

/// Push `target` out so that it implies at least `min_ratio`.
pub fn enforce_min_ratio(side: Side, entry: f64, risk: f64, target: f64, min_ratio: f64) -> f64 {
    let floor = entry + side.sign() * risk * min_ratio;
    match side {
        Side::Buy => target.max(floor),
        Side::Sell => target.min(floor),
    }
}

pub(crate) fn ratio_of(entry: f64, risk: f64, target: f64) -> f64 {
    if risk > 0.0 {
        (target - entry).abs() / risk
    } else {
        0.0
    }
}
