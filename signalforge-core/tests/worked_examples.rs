//! Worked examples through the public API.
//!
//! 1. Regime classification table
//! 2. Trend BUY on EUR_USD at 1.17200: stop bounds, stop, 1:1 + spread target
//! 3. Allow-listed target held inside the previous-session high
//! 4. Weight tiers

use signalforge_core::config::{EngineConfig, InstrumentConfig, RiskConfig, WeightingConfig};
use signalforge_core::confidence::weighting::recommendation;
use signalforge_core::confidence::Recommendation;
use signalforge_core::domain::{Granularity, Quote, Side, TakeProfit};
use signalforge_core::indicators::{IndicatorSet, TrendLabel};
use signalforge_core::levels::{OpenBreakoutWindow, StructuralLevels};
use signalforge_core::regime::{classify, Regime};
use signalforge_core::risk::{
    plan_exits, EconomicImpact, RatioInputs, SessionPhase, StopBounds, TradeGeometry,
};
use signalforge_core::strategy::{
    select_plan, RuleFamily, StrategyContext, TimeframeTrend, TimeframeTrends,
};

#[test]
fn regime_table() {
    let cfg = EngineConfig::default().regime;
    assert_eq!(classify(30.0, 40.0, &cfg), Regime::Trend);
    assert_eq!(classify(15.0, 70.0, &cfg), Regime::Range);
    assert_eq!(classify(18.0, 55.0, &cfg), Regime::Uncertain);
    // Choppiness above 61.8 wins over a strong ADX.
    assert_eq!(classify(45.0, 65.0, &cfg), Regime::Range);
}

fn eurusd_trend_indicators(price: f64) -> IndicatorSet {
    IndicatorSet {
        price,
        last_close: price,
        ema_fast: price - 0.0005,
        ema_slow: price - 0.0010,
        ema_trend: price - 0.0100,
        atr: 0.00150,
        atr_percent: 0.00150 / price * 100.0,
        rsi: 55.0,
        adx: 30.0,
        choppiness: 40.0,
        vwap: price - 0.0008,
        vwap_source: None,
        defaulted: Vec::new(),
    }
}

#[test]
fn trend_buy_stop_and_one_to_one_target() {
    let price = 1.17200;
    let instrument = InstrumentConfig::default().resolve("EUR_USD");
    let quote = Quote::around_mid(price, 1.5, instrument.pip_size());
    assert!((quote.spread - 0.00015).abs() < 1e-12);

    let mut risk_cfg = RiskConfig::default();
    risk_cfg.one_to_one_symbols = vec!["EUR_USD".into()];
    let bounds = StopBounds::new(&instrument, 0.00150, quote.spread, &risk_cfg);
    // max(15 pips, 0.5 x ATR, 1.5 x spread)
    assert!((bounds.effective_min - 0.00150).abs() < 1e-12);

    let indicators = eurusd_trend_indicators(price);
    let levels = StructuralLevels {
        initial_balance: None,
        previous_session_high: None,
        previous_session_low: None,
        round_number_above: 1.2000,
        round_number_below: 1.1500,
        open_breakout: OpenBreakoutWindow::default(),
    };
    let trend = |granularity, label| TimeframeTrend { granularity, label };
    let trends = TimeframeTrends {
        primary: trend(Granularity::M5, TrendLabel::Bullish),
        middle: trend(Granularity::M15, TrendLabel::Neutral),
        higher: trend(Granularity::H1, TrendLabel::Bullish),
    };
    let strategy = EngineConfig::default().strategy;
    let ctx = StrategyContext {
        instrument: &instrument,
        quote,
        indicators: &indicators,
        levels: &levels,
        trends: &trends,
        regime: Regime::Trend,
        bounds,
        config: &strategy,
    };

    let plan = select_plan(&ctx);
    assert_eq!(plan.family, RuleFamily::Trend);
    assert_eq!(plan.side, Side::Buy);
    assert!((plan.stop_loss - 1.16900).abs() < 1e-9);
    assert!((plan.take_profit - 1.17515).abs() < 1e-9);

    let exits = plan_exits(
        &instrument,
        TradeGeometry {
            side: plan.side,
            entry: plan.entry,
            stop_loss: plan.stop_loss,
            strategy_target: plan.take_profit,
        },
        quote.spread,
        &RatioInputs {
            regime: Regime::Trend,
            adx: indicators.adx,
            session: SessionPhase::Active,
            spread: quote.spread,
            atr: indicators.atr,
            economic_impact: EconomicImpact::None,
        },
        &[],
        &risk_cfg,
    )
    .unwrap();
    assert!(exits.one_to_one);
    match exits.take_profit {
        TakeProfit::Single { price, risk_reward_ratio } => {
            assert!((price - 1.17515).abs() < 1e-9);
            assert!((risk_reward_ratio - 1.05).abs() < 1e-9);
        }
        other => panic!("expected a single target, got {other:?}"),
    }
}

#[test]
fn allow_listed_target_stays_inside_previous_session_high() {
    let price = 1.17200;
    let instrument = InstrumentConfig::default().resolve("EUR_USD");
    let quote = Quote::around_mid(price, 1.5, instrument.pip_size());
    let mut risk_cfg = RiskConfig::default();
    risk_cfg.one_to_one_symbols = vec!["EUR_USD".into()];
    let bounds = StopBounds::new(&instrument, 0.00150, quote.spread, &risk_cfg);

    let indicators = eurusd_trend_indicators(price);
    // 1:1 + spread would reach 1.17515, beyond yesterday's high
    let levels = StructuralLevels {
        initial_balance: None,
        previous_session_high: Some(1.17400),
        previous_session_low: Some(1.16500),
        round_number_above: 1.2000,
        round_number_below: 1.1500,
        open_breakout: OpenBreakoutWindow::default(),
    };
    let trend = |granularity, label| TimeframeTrend { granularity, label };
    let trends = TimeframeTrends {
        primary: trend(Granularity::M5, TrendLabel::Bullish),
        middle: trend(Granularity::M15, TrendLabel::Neutral),
        higher: trend(Granularity::H1, TrendLabel::Bullish),
    };
    let strategy = EngineConfig::default().strategy;
    let ctx = StrategyContext {
        instrument: &instrument,
        quote,
        indicators: &indicators,
        levels: &levels,
        trends: &trends,
        regime: Regime::Trend,
        bounds,
        config: &strategy,
    };

    let plan = select_plan(&ctx);
    assert_eq!(plan.family, RuleFamily::Trend);
    assert!((plan.take_profit - 1.17385).abs() < 1e-9, "{}", plan.take_profit);

    let exits = plan_exits(
        &instrument,
        TradeGeometry {
            side: plan.side,
            entry: plan.entry,
            stop_loss: plan.stop_loss,
            strategy_target: plan.take_profit,
        },
        quote.spread,
        &RatioInputs {
            regime: Regime::Trend,
            adx: indicators.adx,
            session: SessionPhase::Active,
            spread: quote.spread,
            atr: indicators.atr,
            economic_impact: EconomicImpact::None,
        },
        &[1.17400],
        &risk_cfg,
    )
    .unwrap();
    assert!(exits.one_to_one);
    let target = exits.take_profit.first_price().unwrap();
    assert!((target - 1.17385).abs() < 1e-9);
    assert!(target < 1.17400);
    // 18.5 pips of reward on 30 pips of risk
    assert!((exits.summary.min - 0.00185 / 0.00300).abs() < 1e-9);
}

#[test]
fn composite_target_when_not_allow_listed() {
    let price = 1.17200;
    let instrument = InstrumentConfig::default().resolve("EUR_USD");
    let risk_cfg = RiskConfig::default();
    let trade = TradeGeometry {
        side: Side::Buy,
        entry: price,
        stop_loss: 1.16900,
        strategy_target: 1.17515,
    };
    let exits = plan_exits(
        &instrument,
        trade,
        0.00015,
        &RatioInputs {
            regime: Regime::Trend,
            adx: 30.0,
            session: SessionPhase::Active,
            spread: 0.00015,
            atr: 0.00150,
            economic_impact: EconomicImpact::None,
        },
        &[],
        &risk_cfg,
    )
    .unwrap();
    // 2.0 x 1.25 (trend) x 1.0 (ADX 30) x 1.0 (in session) x 1.0 (spread/ATR 0.1)
    assert!((exits.ratio.composite - 2.5).abs() < 1e-9);
    assert!((exits.take_profit.first_price().unwrap() - 1.17950).abs() < 1e-9);
}

#[test]
fn weight_tiers() {
    let cfg = WeightingConfig::default();
    assert_eq!(recommendation(72.0, Side::Buy, &cfg), Recommendation::StrongBuy);
    assert_eq!(recommendation(72.0, Side::Sell, &cfg), Recommendation::StrongSell);
    assert_eq!(recommendation(65.0, Side::Buy, &cfg), Recommendation::Buy);
    assert_eq!(recommendation(45.0, Side::Sell, &cfg), Recommendation::Weak);
    assert_eq!(recommendation(35.0, Side::Buy, &cfg), Recommendation::Avoid);
}
