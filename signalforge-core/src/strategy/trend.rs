//! Trend-following rules.
//!
//! Bullish trigger: fast EMA > slow EMA, price > VWAP, RSI inside the band,
//! higher timeframe bullish, ATR% above the floor. The bearish case mirrors
//! every comparison (RSI band reflected around 50).

use super::{clamp_confidence, RuleFamily, RuleSet, StrategyContext, StrategyPlan};
use crate::domain::{ReasoningTrace, Side};
use crate::levels::within_pct;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendFollowing;

impl RuleSet for TrendFollowing {
    fn family(&self) -> RuleFamily {
        RuleFamily::Trend
    }

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Option<StrategyPlan> {
        [Side::Buy, Side::Sell]
            .into_iter()
            .find_map(|side| evaluate_side(ctx, side))
    }
}

fn triggered(ctx: &StrategyContext<'_>, side: Side) -> bool {
    let ind = ctx.indicators;
    let rules = &ctx.config.trend;
    let price = ctx.price();
    let higher = ctx.trends.higher.label;
    match side {
        Side::Buy => {
            ind.ema_fast > ind.ema_slow
                && price > ind.vwap
                && ind.rsi > rules.rsi_min
                && ind.rsi < rules.rsi_max
                && higher.is_bullish()
                && ind.atr_percent > rules.min_atr_pct
        }
        Side::Sell => {
            ind.ema_fast < ind.ema_slow
                && price < ind.vwap
                && ind.rsi > 100.0 - rules.rsi_max
                && ind.rsi < 100.0 - rules.rsi_min
                && higher.is_bearish()
                && ind.atr_percent > rules.min_atr_pct
        }
    }
}

fn evaluate_side(ctx: &StrategyContext<'_>, side: Side) -> Option<StrategyPlan> {
    if !triggered(ctx, side) {
        return None;
    }

    let ind = ctx.indicators;
    let levels = ctx.levels;
    let rules = &ctx.config.trend;
    let price = ctx.price();
    let sign = side.sign();
    let mut reasoning = ReasoningTrace::new();
    let mut confidence = rules.base_confidence;

    reasoning.push(format!(
        "TREND {side}: EMA fast {:.5} {} slow {:.5}, price {} VWAP {:.5}, RSI {:.1}, {} {:?} (base {:.0})",
        ind.ema_fast,
        if side == Side::Buy { ">" } else { "<" },
        ind.ema_slow,
        if side == Side::Buy { "above" } else { "below" },
        ind.vwap,
        ind.rsi,
        ctx.trends.higher.granularity,
        ctx.trends.higher.label,
        rules.base_confidence,
    ));

    if within_pct(price, ind.ema_trend, rules.pullback_tolerance_pct) {
        confidence += rules.pullback_bonus;
        reasoning.push(format!(
            "+{:.0} pullback to trend EMA {:.5}",
            rules.pullback_bonus, ind.ema_trend
        ));
    }

    let ib = levels.initial_balance.as_ref();
    let broke_ib = ib.is_some_and(|ib| match side {
        Side::Buy => price > ib.high,
        Side::Sell => price < ib.low,
    });
    if broke_ib {
        confidence += rules.ib_breakout_bonus;
        reasoning.push(format!("+{:.0} Initial Balance breakout", rules.ib_breakout_bonus));
    }

    let middle = ctx.trends.middle;
    let middle_aligned = match side {
        Side::Buy => middle.label.is_bullish(),
        Side::Sell => middle.label.is_bearish(),
    };
    if levels.open_breakout.active && middle_aligned {
        confidence += rules.open_breakout_bonus;
        reasoning.push(format!(
            "+{:.0} {} open breakout aligned with {} trend",
            rules.open_breakout_bonus,
            levels.open_breakout.session_name.as_deref().unwrap_or("session"),
            middle.granularity,
        ));
    }

    let prior_level = match side {
        Side::Buy => levels.previous_session_high.filter(|h| *h >= price),
        Side::Sell => levels.previous_session_low.filter(|l| *l <= price),
    };
    if let Some(level) = prior_level.filter(|l| within_pct(price, *l, rules.prior_level_tolerance_pct)) {
        confidence -= rules.prior_level_penalty;
        reasoning.push(format!(
            "-{:.0} previous-session {} {level:.5} close by",
            rules.prior_level_penalty,
            if side == Side::Buy { "high" } else { "low" },
        ));
    }

    let opposing_round = match side {
        Side::Buy => levels.round_number_above,
        Side::Sell => levels.round_number_below,
    };
    if within_pct(opposing_round, price, rules.round_number_tolerance_pct) {
        confidence -= rules.round_number_penalty;
        reasoning.push(format!(
            "-{:.0} round number {opposing_round:.5} against the trade",
            rules.round_number_penalty
        ));
    }

    let bounds = ctx.bounds;
    let mut risk = bounds.bound(ind.atr * rules.stop_atr_multiple);
    if let Some(ib) = ib {
        let boundary = match side {
            Side::Buy => ib.low,
            Side::Sell => ib.high,
        };
        let snapped = (price - boundary) * sign + ctx.buffer();
        if snapped > risk
            && snapped <= bounds.effective_min * rules.ib_snap_tolerance_multiple
            && snapped <= bounds.max
        {
            risk = snapped;
            reasoning.push(format!("Stop snapped beyond Initial Balance at {boundary:.5}"));
        }
    }
    let stop_loss = price - sign * risk;

    let mut take_profit = ctx.one_to_one_target(side, risk);
    let clamp_level = match side {
        Side::Buy => levels.previous_session_high,
        Side::Sell => levels.previous_session_low,
    };
    if let Some(level) = clamp_level {
        let crosses = (take_profit - level) * sign > 0.0;
        let clamped = level - sign * ctx.buffer();
        if crosses && (clamped - price) * sign > 0.0 {
            take_profit = clamped;
            reasoning.push(format!("Target held inside previous-session level {level:.5}"));
        }
    }

    Some(StrategyPlan {
        family: RuleFamily::Trend,
        side,
        confidence: clamp_confidence(confidence),
        entry: price,
        stop_loss,
        take_profit,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::TrendLabel;
    use crate::levels::{InitialBalance, OpenBreakoutWindow};
    use crate::strategy::test_support::Fixture;

    #[test]
    fn worked_stop_and_target_example() {
        let fx = Fixture::new(1.17200).bullish_trend();
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert_eq!(plan.side, Side::Buy);
        assert!((fx.ctx().bounds.effective_min - 0.00150).abs() < 1e-12);
        assert!((plan.stop_loss - 1.16900).abs() < 1e-9, "{}", plan.stop_loss);
        assert!((plan.take_profit - 1.17515).abs() < 1e-9, "{}", plan.take_profit);
        assert_eq!(plan.confidence, 60.0);
    }

    #[test]
    fn no_trigger_without_higher_timeframe() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.trends.higher.label = TrendLabel::Unknown;
        assert!(TrendFollowing.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn no_trigger_when_rsi_stretched() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.indicators.rsi = 72.0;
        assert!(TrendFollowing.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn no_trigger_in_dead_market() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.indicators.atr_percent = 0.04;
        assert!(TrendFollowing.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn bonuses_stack() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.config.trend.base_confidence = 50.0;
        fx.indicators.ema_trend = 1.0990; // within 0.3%
        fx.levels.initial_balance = Some(InitialBalance {
            high: 1.0995,
            low: 1.0900,
            session: "London".into(),
            complete: true,
        });
        fx.levels.open_breakout = OpenBreakoutWindow {
            active: true,
            session_name: Some("London".into()),
        };
        fx.trends.middle.label = TrendLabel::Bullish;
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert_eq!(plan.confidence, 50.0 + 10.0 + 15.0 + 20.0);
        assert_eq!(plan.reasoning.len(), 4);
    }

    #[test]
    fn penalties_apply_near_resistance() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.levels.previous_session_high = Some(1.1020);
        fx.levels.round_number_above = 1.1005;
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert_eq!(plan.confidence, 60.0 - 10.0 - 5.0);
    }

    #[test]
    fn target_clamped_inside_previous_high() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.levels.previous_session_high = Some(1.1020);
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        // Unclamped 1.1000 + 0.0030 + 0.00015 crosses 1.1020.
        assert!((plan.take_profit - (1.1020 - 0.00015)).abs() < 1e-9);
        assert!(plan.reasoning.contains("inside previous-session"));
    }

    #[test]
    fn clamp_skipped_when_it_would_be_unprofitable() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.levels.previous_session_high = Some(1.10005);
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert!((plan.take_profit - 1.10315).abs() < 1e-9);
    }

    #[test]
    fn stop_snaps_to_initial_balance_within_tolerance() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        // IB low 0.0035 below price: beyond ATR stop (0.0030), within 3x minimum (0.0045).
        fx.levels.initial_balance = Some(InitialBalance {
            high: 1.1010,
            low: 1.0965,
            session: "London".into(),
            complete: true,
        });
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert!((plan.stop_loss - (1.0965 - 0.00015)).abs() < 1e-9, "{}", plan.stop_loss);
    }

    #[test]
    fn distant_initial_balance_is_ignored() {
        let mut fx = Fixture::new(1.1000).bullish_trend();
        fx.levels.initial_balance = Some(InitialBalance {
            high: 1.1010,
            low: 1.0900,
            session: "London".into(),
            complete: true,
        });
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert!((plan.stop_loss - 1.0970).abs() < 1e-9);
    }

    #[test]
    fn bearish_mirror() {
        let mut fx = Fixture::new(1.1000);
        fx.regime = crate::regime::Regime::Trend;
        fx.indicators.ema_fast = 1.0995;
        fx.indicators.ema_slow = 1.0999;
        fx.indicators.vwap = 1.1008;
        fx.indicators.rsi = 40.0;
        fx.trends.higher.label = TrendLabel::Bearish;
        let plan = TrendFollowing.evaluate(&fx.ctx()).unwrap();
        assert_eq!(plan.side, Side::Sell);
        assert!(plan.stop_loss > plan.entry);
        assert!(plan.take_profit < plan.entry);
    }
}
