//! Pipeline orchestration.
//!
//! validate symbol -> session gate -> fetch (fan-out + join) -> indicators ->
//! {regime, levels} -> strategy -> confidence -> risk -> weighting -> Signal.
//!
//! The engine holds configuration and collaborators only. Every value
//! derived from market data is rebuilt per call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig, SessionWindow};
use crate::confidence::{blend, weigh, Blend, Recommendation, SignalWeight, WeightInputs};
use crate::data::{
    fetch_snapshot, ConfidenceEstimator, ExternalEstimate, MarketDataProvider, MarketSnapshot, OutcomeStore,
    TimeframeCandles,
};
use crate::domain::{complete_only, normalize_symbol, Candle, Direction, ReasoningTrace, Signal};
use crate::error::EngineError;
use crate::fingerprint::SnapshotHash;
use crate::indicators::{IndicatorSet, TrendLabel};
use crate::levels::{session_open, StructuralLevels};
use crate::regime::{classify_with_state, Regime, RegimeState};
use crate::risk::{plan_exits, EconomicImpact, ExitPlan, RatioInputs, SessionPhase, StopBounds, TradeGeometry};
use crate::session;
use crate::strategy::{select_plan, StrategyContext, StrategyPlan, TimeframeTrend, TimeframeTrends};

/// One evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub symbol: String,
    pub at: DateTime<Utc>,
    /// Hysteresis state returned by the previous evaluation of this symbol.
    #[serde(default)]
    pub prior_regime: Option<RegimeState>,
    #[serde(default)]
    pub economic_impact: EconomicImpact,
}

impl EvaluationRequest {
    pub fn new(symbol: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            at,
            prior_regime: None,
            economic_impact: EconomicImpact::None,
        }
    }

    pub fn with_prior_regime(mut self, state: RegimeState) -> Self {
        self.prior_regime = Some(state);
        self
    }

    pub fn with_economic_impact(mut self, impact: EconomicImpact) -> Self {
        self.economic_impact = impact;
        self
    }
}

/// Everything computed on the way to the signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub snapshot_hash: Option<SnapshotHash>,
    /// Raw classification of this evaluation.
    pub regime: Regime,
    /// Regime the strategy ran under, after hysteresis.
    pub effective_regime: Regime,
    /// Pass back as `EvaluationRequest::prior_regime` next time.
    pub regime_state: RegimeState,
    pub indicators: IndicatorSet,
    pub levels: StructuralLevels,
    pub trends: TimeframeTrends,
    pub stop_bounds: StopBounds,
    pub plan: StrategyPlan,
    pub blend: Blend,
    pub exits: ExitPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub signal: Signal,
    /// Absent when the session gate short-circuits.
    pub analysis: Option<Analysis>,
    pub weight: Option<SignalWeight>,
}

impl Evaluation {
    fn gated(signal: Signal) -> Self {
        Self {
            signal,
            analysis: None,
            weight: None,
        }
    }
}

/// The signal engine. Cheap to share across threads.
#[derive(Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    provider: Option<Arc<dyn MarketDataProvider>>,
    estimator: Option<Arc<dyn ConfidenceEstimator>>,
    outcomes: Option<Arc<dyn OutcomeStore>>,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            provider: None,
            estimator: None,
            outcomes: None,
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn MarketDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ConfidenceEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_outcome_store(mut self, store: Arc<dyn OutcomeStore>) -> Self {
        self.outcomes = Some(store);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full pipeline for one symbol.
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, EngineError> {
        let symbol = normalize_symbol(&request.symbol)?;

        if let Some(reason) = session::closed_reason(request.at, &self.config.gate) {
            info!(symbol = %symbol, at = %request.at, %reason, "session gate closed");
            return Ok(Evaluation::gated(Signal::hold(symbol, request.at, reason)));
        }

        let provider = self.provider.as_deref().ok_or_else(|| {
            EngineError::Config(ConfigError::Invalid("no market data provider configured".into()))
        })?;
        let snapshot = fetch_snapshot(provider, &symbol, &self.config.timeframes)?;

        self.evaluate_snapshot(&snapshot, request)
    }

    /// Analysis and signal for an already fetched snapshot.
    ///
    /// Does not consult the session gate. Given the same snapshot, request
    /// and collaborators the result is identical on every call. The request
    /// and the snapshot must name the same instrument.
    pub fn evaluate_snapshot(
        &self,
        snapshot: &MarketSnapshot,
        request: &EvaluationRequest,
    ) -> Result<Evaluation, EngineError> {
        let cfg = &self.config;
        let at = request.at;
        let symbol = normalize_symbol(&snapshot.symbol)?;
        let requested = normalize_symbol(&request.symbol)?;
        if requested != symbol {
            return Err(EngineError::InvalidInput(format!(
                "request is for {requested} but the snapshot holds {symbol}"
            )));
        }
        let instrument = cfg.instruments.resolve(&symbol);
        let quote = snapshot.quote;
        let price = quote.mid;

        let primary = complete_only(&snapshot.primary.candles);
        if primary.is_empty() || !quote.is_valid() {
            return Err(EngineError::DataUnavailable {
                symbol,
                granularity: Some(snapshot.primary.granularity),
                reason: "snapshot has no complete primary candles or no valid quote".into(),
            });
        }

        let snapshot_hash = match SnapshotHash::of(snapshot) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "snapshot fingerprint failed");
                None
            }
        };

        let mut reasoning = ReasoningTrace::new();

        // Indicators
        let indicators = IndicatorSet::compute(&primary, &cfg.indicators, price, at);
        if !indicators.defaulted.is_empty() {
            warn!(symbol = %symbol, defaulted = ?indicators.defaulted, "indicators fell back to defaults");
            reasoning.push(format!("Indicator defaults used: {}", indicators.defaulted.join(", ")));
        }
        debug!(
            symbol = %symbol,
            adx = indicators.adx,
            chop = indicators.choppiness,
            rsi = indicators.rsi,
            atr_pct = indicators.atr_percent,
            "indicators computed"
        );

        // Regime
        let (regime, regime_state) =
            classify_with_state(indicators.adx, indicators.choppiness, request.prior_regime, &cfg.regime);
        let effective_regime = regime_state.effective;
        reasoning.push(format!(
            "Regime {regime} (ADX {:.1}, Choppiness {:.1})",
            indicators.adx, indicators.choppiness
        ));
        if effective_regime != regime {
            reasoning.push(format!("Regime held at {effective_regime} pending confirmation"));
        }

        // Structural levels
        let sessions = cfg.sessions.sessions_for(&symbol);
        let levels = StructuralLevels::analyze(
            &primary,
            &snapshot.session_history(),
            at,
            price,
            sessions,
            &cfg.sessions,
            instrument.profile.round_number_step,
        );
        debug!(
            symbol = %symbol,
            ib = levels.initial_balance.is_some(),
            pdh = ?levels.previous_session_high,
            pdl = ?levels.previous_session_low,
            open_breakout = levels.open_breakout.active,
            "levels computed"
        );

        let trends = self.trends(snapshot, &primary);

        // Strategy
        let stop_bounds = StopBounds::new(&instrument, indicators.atr, quote.spread, &cfg.risk);
        let ctx = StrategyContext {
            instrument: &instrument,
            quote,
            indicators: &indicators,
            levels: &levels,
            trends: &trends,
            regime: effective_regime,
            bounds: stop_bounds,
            config: &cfg.strategy,
        };
        let plan = select_plan(&ctx);
        debug!(symbol = %symbol, family = ?plan.family, side = %plan.side, confidence = plan.confidence, "strategy plan");
        reasoning.extend(plan.reasoning.clone());

        // Confidence
        let estimate = self.estimate(&symbol, &indicators, &mut reasoning);
        let blended = blend(plan.confidence, plan.side, &indicators, estimate.as_ref(), &cfg.blender);
        if blended.direction_flipped {
            warn!(symbol = %symbol, from = %plan.side, to = %blended.side, "external model reversed direction");
        }
        reasoning.extend(blended.reasoning.clone());
        let trade_plan = if blended.direction_flipped {
            plan.mirrored()
        } else {
            plan.clone()
        };

        // Risk
        let ratio_inputs = RatioInputs {
            regime: effective_regime,
            adx: indicators.adx,
            session: session_phase(&levels, sessions, at),
            spread: quote.spread,
            atr: indicators.atr,
            economic_impact: request.economic_impact,
        };
        let exits = plan_exits(
            &instrument,
            TradeGeometry {
                side: trade_plan.side,
                entry: trade_plan.entry,
                stop_loss: trade_plan.stop_loss,
                strategy_target: trade_plan.take_profit,
            },
            quote.spread,
            &ratio_inputs,
            &support_resistance(&levels, &indicators),
            &cfg.risk,
        )
        .map_err(|e| EngineError::Config(ConfigError::Invalid(e.to_string())))?;
        reasoning.push(format!(
            "Stop {:.5} ({:.1} pips)",
            trade_plan.stop_loss,
            instrument.to_pips(trade_plan.risk())
        ));
        for note in &exits.notes {
            reasoning.push(note.clone());
        }

        let mut signal = Signal {
            symbol: symbol.clone(),
            direction: Direction::from(trade_plan.side),
            confidence: blended.confidence,
            entry_price: Some(trade_plan.entry),
            stop_loss: Some(trade_plan.stop_loss),
            take_profit: Some(exits.take_profit.clone()),
            regime: Some(regime),
            generated_at: at,
            reasoning: ReasoningTrace::new(),
        };

        // Weighting
        let all_trends = trends.all();
        let weight = weigh(
            &WeightInputs {
                symbol: &symbol,
                side: trade_plan.side,
                confidence: blended.confidence,
                indicators: &indicators,
                last_candle: primary.last(),
                primary: snapshot.primary.granularity,
                trends: &all_trends,
                stats: self.outcomes.as_ref().and_then(|s| s.stats(&symbol)),
            },
            &cfg.weighting,
        );
        reasoning.push(format!(
            "Weight {:.1} -> {} (size x{:.2})",
            weight.total, weight.recommendation, weight.position_multiplier
        ));
        if cfg.weighting.enforce_avoid && weight.recommendation == Recommendation::Avoid {
            reasoning.push("AVOID tier: signal forced to HOLD");
            signal.direction = Direction::Hold;
            signal.entry_price = None;
            signal.stop_loss = None;
            signal.take_profit = None;
        }
        signal.reasoning = reasoning;

        info!(
            symbol = %symbol,
            direction = %signal.direction,
            confidence = signal.confidence,
            regime = %regime,
            weight = weight.total,
            "signal generated"
        );

        Ok(Evaluation {
            signal,
            analysis: Some(Analysis {
                snapshot_hash,
                regime,
                effective_regime,
                regime_state,
                indicators,
                levels,
                trends,
                stop_bounds,
                plan,
                blend: blended,
                exits,
            }),
            weight: Some(weight),
        })
    }

    fn trends(&self, snapshot: &MarketSnapshot, primary: &[Candle]) -> TimeframeTrends {
        let ind = &self.config.indicators;
        let tf = &self.config.timeframes;
        let label = |candles: Option<&[Candle]>| {
            candles.map_or(TrendLabel::Unknown, |c| TrendLabel::classify(c, ind.ema_fast, ind.ema_slow))
        };
        let complete = |tf: &Option<TimeframeCandles>| tf.as_ref().map(|t| complete_only(&t.candles));
        let (middle, higher) = (complete(&snapshot.middle), complete(&snapshot.higher));
        TimeframeTrends {
            primary: TimeframeTrend {
                granularity: snapshot.primary.granularity,
                label: label(Some(primary)),
            },
            middle: TimeframeTrend {
                granularity: snapshot.middle.as_ref().map_or(tf.middle, |m| m.granularity),
                label: label(middle.as_deref()),
            },
            higher: TimeframeTrend {
                granularity: snapshot.higher.as_ref().map_or(tf.higher, |h| h.granularity),
                label: label(higher.as_deref()),
            },
        }
    }

    /// Best-effort external estimate; failures are logged and dropped.
    fn estimate(
        &self,
        symbol: &str,
        indicators: &IndicatorSet,
        reasoning: &mut ReasoningTrace,
    ) -> Option<ExternalEstimate> {
        let estimator = self.estimator.as_ref()?;
        match estimator.predict(symbol, indicators) {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                warn!(symbol, error = %e, "confidence estimator failed, using technical confidence");
                reasoning.push(format!("External model unavailable ({e}), technical confidence used"));
                None
            }
        }
    }
}

fn session_phase(
    levels: &StructuralLevels,
    sessions: &[SessionWindow],
    at: DateTime<Utc>,
) -> SessionPhase {
    if levels.open_breakout.active {
        SessionPhase::OpenBreakout
    } else if sessions.iter().any(|s| session_open(s, at.date_naive()) <= at) {
        SessionPhase::Active
    } else {
        SessionPhase::Off
    }
}

/// Structure a ladder level may snap to.
fn support_resistance(levels: &StructuralLevels, indicators: &IndicatorSet) -> Vec<f64> {
    let mut out = vec![levels.round_number_above, levels.round_number_below, indicators.vwap];
    if let Some(ib) = &levels.initial_balance {
        out.push(ib.high);
        out.push(ib.low);
    }
    out.extend(levels.previous_session_high);
    out.extend(levels.previous_session_low);
    out
}
