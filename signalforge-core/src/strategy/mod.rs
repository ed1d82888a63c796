//! Signal strategy engine.
//!
//! Exactly one rule family runs per evaluation, keyed by regime: trend
//! following in TREND, mean reversion in RANGE, and the fallback when the
//! keyed family does not fire (or the regime is UNCERTAIN). The fallback is
//! total, so [`select_plan`] always yields a direction.
//!
//! Rule sets never see account or position state, only the market snapshot.

pub mod fallback;
pub mod range;
pub mod trend;

pub use fallback::fallback_plan;
pub use range::MeanReversion;
pub use trend::TrendFollowing;

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::{Granularity, Instrument, Quote, ReasoningTrace, Side};
use crate::indicators::{IndicatorSet, TrendLabel};
use crate::levels::StructuralLevels;
use crate::regime::Regime;
use crate::risk::StopBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    Trend,
    Range,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeTrend {
    pub granularity: Granularity,
    pub label: TrendLabel,
}

/// Trend labels for the three analysis timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeTrends {
    pub primary: TimeframeTrend,
    pub middle: TimeframeTrend,
    pub higher: TimeframeTrend,
}

impl TimeframeTrends {
    pub fn all(&self) -> [TimeframeTrend; 3] {
        [self.primary, self.middle, self.higher]
    }
}

/// Read-only inputs shared by every rule family.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub instrument: &'a Instrument,
    pub quote: Quote,
    pub indicators: &'a IndicatorSet,
    pub levels: &'a StructuralLevels,
    pub trends: &'a TimeframeTrends,
    pub regime: Regime,
    pub bounds: StopBounds,
    pub config: &'a StrategyConfig,
}

impl StrategyContext<'_> {
    /// Entry reference price.
    pub fn price(&self) -> f64 {
        self.quote.mid
    }

    /// Distance kept between a stop or target and the structure it references.
    pub fn buffer(&self) -> f64 {
        self.quote.spread.max(self.instrument.pip_size())
    }

    /// 1:1 target with spread compensation.
    pub fn one_to_one_target(&self, side: Side, risk: f64) -> f64 {
        self.price() + side.sign() * (risk + self.quote.spread)
    }
}

/// A rule family's decision, before final exits are planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub family: RuleFamily,
    pub side: Side,
    /// Unadjusted rule confidence, 0..=100.
    pub confidence: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reasoning: ReasoningTrace,
}

impl StrategyPlan {
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    /// Same stop and target distances on the opposite side of entry.
    pub fn mirrored(&self) -> Self {
        Self {
            side: self.side.opposite(),
            stop_loss: 2.0 * self.entry - self.stop_loss,
            take_profit: 2.0 * self.entry - self.take_profit,
            ..self.clone()
        }
    }
}

/// A regime-specific rule family that may decline to trade.
pub trait RuleSet: Send + Sync {
    fn family(&self) -> RuleFamily;

    fn evaluate(&self, ctx: &StrategyContext<'_>) -> Option<StrategyPlan>;
}

/// Run the rule family keyed by `ctx.regime`, falling back when it declines.
pub fn select_plan(ctx: &StrategyContext<'_>) -> StrategyPlan {
    let keyed: Option<&dyn RuleSet> = match ctx.regime {
        Regime::Trend => Some(&TrendFollowing as &dyn RuleSet),
        Regime::Range => Some(&MeanReversion),
        Regime::Uncertain => None,
    };

    let mut declined = ReasoningTrace::new();
    if let Some(rules) = keyed {
        if let Some(plan) = rules.evaluate(ctx) {
            return plan;
        }
        declined.push(format!("Regime {}: {:?} rules did not trigger", ctx.regime, rules.family()));
    } else {
        declined.push(format!("Regime {}: no structured rules apply", ctx.regime));
    }

    let mut plan = fallback_plan(ctx);
    declined.extend(plan.reasoning);
    plan.reasoning = declined;
    plan
}

pub(crate) fn clamp_confidence(c: f64) -> f64 {
    c.clamp(0.0, 100.0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{InstrumentConfig, RiskConfig};
    use crate::levels::OpenBreakoutWindow;

    /// A neutral EUR_USD snapshot at `price`; tests adjust the fields they need.
    pub struct Fixture {
        pub instrument: Instrument,
        pub quote: Quote,
        pub indicators: IndicatorSet,
        pub levels: StructuralLevels,
        pub trends: TimeframeTrends,
        pub regime: Regime,
        pub config: StrategyConfig,
    }

    impl Fixture {
        pub fn new(price: f64) -> Self {
            let instrument = InstrumentConfig::default().resolve("EUR_USD");
            let quote = Quote::around_mid(price, 1.5, instrument.pip_size());
            let trend = |granularity| TimeframeTrend {
                granularity,
                label: TrendLabel::Neutral,
            };
            Self {
                instrument,
                quote,
                indicators: IndicatorSet {
                    price,
                    last_close: price,
                    ema_fast: price,
                    ema_slow: price,
                    ema_trend: price,
                    atr: 0.0015,
                    atr_percent: 0.0015 / price * 100.0,
                    rsi: 50.0,
                    adx: 20.0,
                    choppiness: 55.0,
                    vwap: price,
                    vwap_source: None,
                    defaulted: Vec::new(),
                },
                levels: StructuralLevels {
                    initial_balance: None,
                    previous_session_high: None,
                    previous_session_low: None,
                    round_number_above: price + 1.0,
                    round_number_below: price - 1.0,
                    open_breakout: OpenBreakoutWindow::default(),
                },
                trends: TimeframeTrends {
                    primary: trend(Granularity::M5),
                    middle: trend(Granularity::M15),
                    higher: trend(Granularity::H1),
                },
                regime: Regime::Uncertain,
                config: StrategyConfig::default(),
            }
        }

        /// Bullish trend-rule trigger: EMAs stacked, above VWAP, RSI 55, H1 bullish.
        pub fn bullish_trend(mut self) -> Self {
            let p = self.quote.mid;
            self.regime = Regime::Trend;
            self.indicators.ema_fast = p - 0.0005;
            self.indicators.ema_slow = p - 0.0010;
            self.indicators.ema_trend = p - 0.0100;
            self.indicators.vwap = p - 0.0008;
            self.indicators.rsi = 55.0;
            self.indicators.adx = 30.0;
            self.trends.higher.label = TrendLabel::Bullish;
            self
        }

        pub fn ctx(&self) -> StrategyContext<'_> {
            StrategyContext {
                instrument: &self.instrument,
                quote: self.quote,
                indicators: &self.indicators,
                levels: &self.levels,
                trends: &self.trends,
                regime: self.regime,
                bounds: StopBounds::new(
                    &self.instrument,
                    self.indicators.atr,
                    self.quote.spread,
                    &RiskConfig::default(),
                ),
                config: &self.config,
            }
        }
    }
}
