//! Mean-reversion rules at the Initial Balance edges.

use super::{clamp_confidence, RuleFamily, RuleSet, StrategyContext, StrategyPlan};
use crate::domain::{ReasoningTrace, Side};
use crate::levels::{within_pct, InitialBalance};

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReversion;

impl RuleSet for MeanReversion {
    fn family(&self) -> RuleFamily {
        RuleFamily::Range
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Option<StrategyPlan> {
        let ib = ctx.levels.initial_balance.as_ref()?;
        [Side::Buy, Side::Sell]
            .into_iter()
            .find_map(|side| evaluate_side(ctx, ib, side))
    }
}

fn evaluate_side(ctx: &StrategyContext<'_>, ib: &InitialBalance, side: Side) -> Option<StrategyPlan> {
    let ind = ctx.indicators;
    let levels = ctx.levels;
    let rules = &ctx.config.range;
    let price = ctx.price();
    let sign = side.sign();

    let (edge, rsi_ok, confluence_level, support_round) = match side {
        Side::Buy => (
            ib.low,
            ind.rsi < rules.buy_rsi_max,
            levels.previous_session_low,
            levels.round_number_below,
        ),
        Side::Sell => (
            ib.high,
            ind.rsi > rules.sell_rsi_min,
            levels.previous_session_high,
            levels.round_number_above,
        ),
    };

    if !(within_pct(price, edge, rules.ib_proximity_pct) && rsi_ok && ind.atr_percent > rules.min_atr_pct) {
        return None;
    }

    let mut reasoning = ReasoningTrace::new();
    let mut confidence = rules.base_confidence;
    reasoning.push(format!(
        "RANGE {side}: price at Initial Balance {} {edge:.5}, RSI {:.1} (base {:.0})",
        if side == Side::Buy { "low" } else { "high" },
        ind.rsi,
        rules.base_confidence,
    ));

    if let Some(level) = confluence_level.filter(|l| within_pct(*l, edge, rules.confluence_tolerance_pct)) {
        confidence += rules.confluence_bonus;
        reasoning.push(format!(
            "+{:.0} previous-session level {level:.5} confluence",
            rules.confluence_bonus
        ));
    }

    if within_pct(support_round, price, rules.round_number_tolerance_pct) {
        confidence += rules.round_number_bonus;
        reasoning.push(format!(
            "+{:.0} round number {support_round:.5} nearby",
            rules.round_number_bonus
        ));
    }

    let stop_beyond_edge = edge - sign * (ind.atr * rules.stop_atr_multiple).max(ctx.bounds.effective_min);
    let risk = ctx.bounds.bound((price - stop_beyond_edge) * sign);
    let stop_loss = price - sign * risk;

    let take_profit = if (ind.vwap - price) * sign > 0.0 {
        reasoning.push(format!("Target session VWAP {:.5}", ind.vwap));
        ind.vwap
    } else {
        reasoning.push("VWAP not on the profitable side, 1:1 target".to_string());
        ctx.one_to_one_target(side, risk)
    };

    Some(StrategyPlan {
        family: RuleFamily::Range,
        side,
        confidence: clamp_confidence(confidence),
        entry: price,
        stop_loss,
        take_profit,
        reasoning,
    })
}
