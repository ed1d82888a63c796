//! Always-emit fallback.
//!
//! Runs when the regime's rule family declines. It never returns HOLD:
//! momentum bias first, then middle/higher timeframe alignment, and SELL
//! when neither timeframe pair agrees bullish.

use super::{clamp_confidence, RuleFamily, StrategyContext, StrategyPlan};
use crate::domain::{ReasoningTrace, Side};

pub fn fallback_plan(ctx: &StrategyContext<'_>) -> StrategyPlan {
    let ind = ctx.indicators;
    let rules = &ctx.config.fallback;
    let price = ctx.price();
    let mut reasoning = ReasoningTrace::new();

    let bullish_momentum = ind.ema_fast > ind.ema_slow && price > ind.vwap && ind.rsi > 50.0;
    let bearish_momentum = ind.ema_fast < ind.ema_slow && price < ind.vwap && ind.rsi < 50.0;

    let (side, confidence) = if bullish_momentum || bearish_momentum {
        let side = if bullish_momentum { Side::Buy } else { Side::Sell };
        reasoning.push(format!(
            "FALLBACK {side}: EMA, VWAP and RSI {:.1} agree (base {:.0})",
            ind.rsi, rules.momentum_confidence
        ));
        (side, rules.momentum_confidence)
    } else {
        let middle = ctx.trends.middle;
        let higher = ctx.trends.higher;
        let side = if middle.label.is_bullish() && higher.label.is_bullish() {
            Side::Buy
        } else {
            Side::Sell
        };
        reasoning.push(format!(
            "FALLBACK {side}: no momentum bias, {} {:?} / {} {:?} (base {:.0})",
            middle.granularity, middle.label, higher.granularity, higher.label, rules.alignment_confidence
        ));
        (side, rules.alignment_confidence)
    };

    let risk = ctx.bounds.bound(ind.atr * rules.stop_atr_multiple);
    StrategyPlan {
        family: RuleFamily::Fallback,
        side,
        confidence: clamp_confidence(confidence),
        entry: price,
        stop_loss: price - side.sign() * risk,
        take_profit: ctx.one_to_one_target(side, risk),
        reasoning,
    }
}
