//! Partial-exit ladder.

use super::{enforce_min_ratio, ratio_of, RiskError};
use crate::config::{LadderConfig, RiskConfig};
use crate::domain::{ExitLevel, Instrument, Side};

const FRACTION_TOLERANCE: f64 = 1e-6;

pub fn validate_ladder(cfg: &LadderConfig) -> Result<(), RiskError> {
    if cfg.ratio_multipliers.is_empty() {
        return Err(RiskError::EmptyLadder);
    }
    if cfg.ratio_multipliers.len() != cfg.position_fractions.len() {
        return Err(RiskError::LengthMismatch {
            multipliers: cfg.ratio_multipliers.len(),
            fractions: cfg.position_fractions.len(),
        });
    }
    if let Some(bad) = cfg
        .ratio_multipliers
        .iter()
        .chain(&cfg.position_fractions)
        .find(|v| v.is_nan() || **v <= 0.0)
    {
        return Err(RiskError::NonPositive(*bad));
    }
    let sum: f64 = cfg.position_fractions.iter().sum();
    if (sum - 1.0).abs() > FRACTION_TOLERANCE {
        return Err(RiskError::FractionSum(sum));
    }
    Ok(())
}

/// Build the ladder for one trade.
///
/// Level i targets `ratio_multipliers[i] * base_ratio` (never below
/// `min_ratio`). A level moves out to a support/resistance candidate lying
/// beyond it within `snap_tolerance` of its distance from entry; snapping
/// never pulls a level closer to entry nor past the next level.
pub fn build_ladder(
    instrument: &Instrument,
    side: Side,
    entry: f64,
    risk: f64,
    base_ratio: f64,
    sr_levels: &[f64],
    cfg: &RiskConfig,
) -> Result<Vec<ExitLevel>, RiskError> {
    let ladder = &cfg.ladder;
    validate_ladder(ladder)?;

    let raw: Vec<f64> = ladder
        .ratio_multipliers
        .iter()
        .map(|m| {
            let target = entry + side.sign() * risk * m * base_ratio;
            enforce_min_ratio(side, entry, risk, target, cfg.min_ratio)
        })
        .collect();

    let mut levels = Vec::with_capacity(raw.len());
    for (i, (&price, &fraction)) in raw.iter().zip(&ladder.position_fractions).enumerate() {
        let limit = raw.get(i + 1).copied();
        let snapped = snap_outward(side, entry, price, limit, sr_levels, ladder.snap_tolerance);
        let final_price = snapped.unwrap_or(price);
        let rr = ratio_of(entry, risk, final_price);
        let rationale = match snapped {
            Some(level) => format!("TP{} {rr:.2}R snapped to structure at {level:.5}", i + 1),
            None => format!("TP{} {rr:.2}R", i + 1),
        };
        levels.push(ExitLevel {
            level_index: i,
            price: final_price,
            distance_in_pips: instrument.to_pips((final_price - entry).abs()),
            risk_reward_ratio: rr,
            position_fraction: fraction,
            rationale,
        });
    }
    Ok(levels)
}

fn snap_outward(
    side: Side,
    entry: f64,
    price: f64,
    limit: Option<f64>,
    sr_levels: &[f64],
    tolerance: f64,
) -> Option<f64> {
    let distance = (price - entry).abs();
    let reach = distance * tolerance;
    sr_levels
        .iter()
        .copied()
        .filter(|l| l.is_finite())
        .filter(|&l| {
            let beyond = (l - price) * side.sign();
            beyond > 0.0 && beyond <= reach
        })
        .filter(|&l| limit.map_or(true, |next| (next - l) * side.sign() > 0.0))
        .min_by(|a, b| (a - price).abs().total_cmp(&(b - price).abs()))
}
