//! Engine configuration.
//!
//! Every threshold the pipeline uses lives here and is passed by reference
//! into each stage. Each section is `#[serde(default)]`, so a TOML file only
//! needs to name the values it changes.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::{Granularity, Instrument, InstrumentClass, InstrumentProfile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration of the signal engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeframes: TimeframeConfig,
    pub indicators: IndicatorConfig,
    pub regime: RegimeConfig,
    pub sessions: SessionConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub blender: BlenderConfig,
    pub weighting: WeightingConfig,
    pub gate: GateConfig,
    pub instruments: InstrumentConfig,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        for (name, period) in [
            ("ema_fast", ind.ema_fast),
            ("ema_slow", ind.ema_slow),
            ("ema_trend", ind.ema_trend),
            ("atr_period", ind.atr_period),
            ("rsi_period", ind.rsi_period),
            ("adx_period", ind.adx_period),
            ("vwap_fallback_candles", ind.vwap_fallback_candles),
        ] {
            if period == 0 {
                return Err(invalid(format!("indicators.{name} must be >= 1")));
            }
        }
        if ind.choppiness_period < 2 {
            return Err(invalid("indicators.choppiness_period must be >= 2"));
        }
        if ind.vwap_session_start_hour > 23 {
            return Err(invalid("indicators.vwap_session_start_hour must be 0..=23"));
        }
        if ind.ema_fast >= ind.ema_slow {
            return Err(invalid("indicators.ema_fast must be shorter than ema_slow"));
        }

        if self.timeframes.candle_count == 0 {
            return Err(invalid("timeframes.candle_count must be >= 1"));
        }

        let regime = &self.regime;
        if regime.choppiness_trend_max > regime.choppiness_range_min {
            return Err(invalid(
                "regime.choppiness_trend_max must not exceed choppiness_range_min",
            ));
        }
        if regime.hysteresis_confirmations == 0 {
            return Err(invalid("regime.hysteresis_confirmations must be >= 1"));
        }

        for window in self
            .sessions
            .sessions
            .iter()
            .chain(self.sessions.session_overrides.values().flatten())
        {
            if window.open_hour > 23 || window.open_minute > 59 {
                return Err(invalid(format!("session {} has an invalid open time", window.name)));
            }
        }

        let risk = &self.risk;
        if !(risk.min_ratio > 0.0 && risk.min_ratio <= risk.max_ratio) {
            return Err(invalid("risk.min_ratio must be positive and <= max_ratio"));
        }
        if risk.multiplier_floor > risk.multiplier_ceiling {
            return Err(invalid("risk.multiplier_floor must be <= multiplier_ceiling"));
        }
        crate::risk::validate_ladder(&risk.ladder).map_err(|e| invalid(e.to_string()))?;

        let blender = &self.blender;
        if blender.min_confidence > blender.max_confidence {
            return Err(invalid("blender.min_confidence must be <= max_confidence"));
        }
        if !(0.0..=1.0).contains(&blender.rule_weight) {
            return Err(invalid("blender.rule_weight must be within [0, 1]"));
        }

        let w = &self.weighting;
        if !(w.avoid_below <= w.buy_from && w.buy_from <= w.strong_from) {
            return Err(invalid("weighting tiers must be ordered avoid_below <= buy_from <= strong_from"));
        }
        if (w.weights.total() - 1.0).abs() > 1e-6 {
            return Err(invalid(format!(
                "weighting.weights must sum to 1.0, got {}",
                w.weights.total()
            )));
        }

        for b in &self.gate.blackouts {
            if b.from_hour >= b.to_hour || b.to_hour > 24 {
                return Err(invalid(format!("blackout on {} has an empty or invalid hour range", b.day)));
            }
        }

        for (symbol, profile) in std::iter::once(("major", &self.instruments.major))
            .chain(std::iter::once(("jpy", &self.instruments.jpy)))
            .chain(std::iter::once(("metal", &self.instruments.metal)))
            .chain(self.instruments.overrides.iter().map(|(k, v)| (k.as_str(), v)))
        {
            if profile.pip_size <= 0.0 || profile.round_number_step <= 0.0 {
                return Err(invalid(format!("instrument profile {symbol}: sizes must be positive")));
            }
            if profile.min_stop_pips > profile.max_stop_pips {
                return Err(invalid(format!(
                    "instrument profile {symbol}: min_stop_pips exceeds max_stop_pips"
                )));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    /// Indicator and Initial Balance timeframe. Required.
    pub primary: Granularity,
    pub middle: Granularity,
    pub higher: Granularity,
    pub candle_count: usize,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            primary: Granularity::M5,
            middle: Granularity::M15,
            higher: Granularity::H1,
            candle_count: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub ema_trend: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
    pub choppiness_period: usize,
    pub vwap_fallback_candles: usize,
    pub vwap_session_start_hour: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 12,
            ema_slow: 21,
            ema_trend: 50,
            atr_period: 14,
            rsi_period: 14,
            adx_period: 14,
            choppiness_period: 14,
            vwap_fallback_candles: 20,
            vwap_session_start_hour: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub adx_trend_min: f64,
    pub choppiness_trend_max: f64,
    pub choppiness_range_min: f64,
    /// Consecutive identical classifications needed before the effective
    /// regime switches. 1 means every evaluation stands alone.
    pub hysteresis_confirmations: u32,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            adx_trend_min: 25.0,
            choppiness_trend_max: 50.0,
            choppiness_range_min: 61.8,
            hysteresis_confirmations: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub name: String,
    pub open_hour: u32,
    #[serde(default)]
    pub open_minute: u32,
}

impl SessionWindow {
    pub fn new(name: impl Into<String>, open_hour: u32, open_minute: u32) -> Self {
        Self {
            name: name.into(),
            open_hour,
            open_minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sessions: Vec<SessionWindow>,
    pub initial_balance_minutes: i64,
    pub open_breakout_minutes: i64,
    pub previous_session_lookback_days: u32,
    /// Per-symbol session calendars, replacing `sessions` for that symbol.
    pub session_overrides: BTreeMap<String, Vec<SessionWindow>>,
}

impl SessionConfig {
    pub fn sessions_for(&self, symbol: &str) -> &[SessionWindow] {
        self.session_overrides
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&self.sessions)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sessions: vec![
                SessionWindow::new("London", 8, 0),
                SessionWindow::new("New York", 13, 0),
            ],
            initial_balance_minutes: 60,
            open_breakout_minutes: 15,
            previous_session_lookback_days: 3,
            session_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub trend: TrendRules,
    pub range: RangeRules,
    pub fallback: FallbackRules,
}

/// Trend-following thresholds. Percentages are in percent of price (0.3 = 0.3%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendRules {
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub min_atr_pct: f64,
    pub base_confidence: f64,
    pub pullback_tolerance_pct: f64,
    pub pullback_bonus: f64,
    pub ib_breakout_bonus: f64,
    pub open_breakout_bonus: f64,
    pub prior_level_tolerance_pct: f64,
    pub prior_level_penalty: f64,
    pub round_number_tolerance_pct: f64,
    pub round_number_penalty: f64,
    pub stop_atr_multiple: f64,
    /// An IB-snapped stop may extend to this multiple of the effective minimum.
    pub ib_snap_tolerance_multiple: f64,
}

impl Default for TrendRules {
    fn default() -> Self {
        Self {
            rsi_min: 45.0,
            rsi_max: 70.0,
            min_atr_pct: 0.05,
            base_confidence: 60.0,
            pullback_tolerance_pct: 0.3,
            pullback_bonus: 10.0,
            ib_breakout_bonus: 15.0,
            open_breakout_bonus: 20.0,
            prior_level_tolerance_pct: 0.3,
            prior_level_penalty: 10.0,
            round_number_tolerance_pct: 0.1,
            round_number_penalty: 5.0,
            stop_atr_multiple: 2.0,
            ib_snap_tolerance_multiple: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRules {
    pub ib_proximity_pct: f64,
    pub buy_rsi_max: f64,
    pub sell_rsi_min: f64,
    pub min_atr_pct: f64,
    pub base_confidence: f64,
    pub confluence_tolerance_pct: f64,
    pub confluence_bonus: f64,
    pub round_number_tolerance_pct: f64,
    pub round_number_bonus: f64,
    pub stop_atr_multiple: f64,
}

impl Default for RangeRules {
    fn default() -> Self {
        Self {
            ib_proximity_pct: 0.1,
            buy_rsi_max: 35.0,
            sell_rsi_min: 65.0,
            min_atr_pct: 0.03,
            base_confidence: 55.0,
            confluence_tolerance_pct: 0.1,
            confluence_bonus: 15.0,
            round_number_tolerance_pct: 0.1,
            round_number_bonus: 10.0,
            stop_atr_multiple: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRules {
    pub momentum_confidence: f64,
    pub alignment_confidence: f64,
    pub stop_atr_multiple: f64,
}

impl Default for FallbackRules {
    fn default() -> Self {
        Self {
            momentum_confidence: 45.0,
            alignment_confidence: 40.0,
            stop_atr_multiple: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub base_ratio: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub multiplier_floor: f64,
    pub multiplier_ceiling: f64,
    /// Volatility-derived minimum stop, as a multiple of ATR.
    pub volatility_min_atr_multiple: f64,
    /// Spread-derived minimum stop, as a multiple of the current spread.
    pub spread_multiple: f64,
    pub adjustments: RatioAdjustments,
    pub ladder: LadderConfig,
    /// Instruments that keep the strategy's 1:1 + spread target.
    pub one_to_one_symbols: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_ratio: 2.0,
            min_ratio: 1.5,
            max_ratio: 5.0,
            multiplier_floor: 0.5,
            multiplier_ceiling: 1.5,
            volatility_min_atr_multiple: 0.5,
            spread_multiple: 1.5,
            adjustments: RatioAdjustments::default(),
            ladder: LadderConfig::default(),
            one_to_one_symbols: Vec::new(),
        }
    }
}

/// Raw multipliers applied to the base risk:reward ratio. Each is clamped to
/// `[multiplier_floor, multiplier_ceiling]` before the product is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioAdjustments {
    pub trend_regime: f64,
    pub range_regime: f64,
    pub uncertain_regime: f64,
    pub strong_adx: f64,
    pub strong_adx_min: f64,
    pub weak_adx: f64,
    pub weak_adx_max: f64,
    pub open_breakout_session: f64,
    pub in_session: f64,
    pub off_session: f64,
    /// spread / ATR at or below this reads as deep liquidity.
    pub tight_spread_ratio: f64,
    pub wide_spread_ratio: f64,
    pub tight_spread: f64,
    pub wide_spread: f64,
    pub medium_impact: f64,
    pub high_impact: f64,
}

impl Default for RatioAdjustments {
    fn default() -> Self {
        Self {
            trend_regime: 1.25,
            range_regime: 0.8,
            uncertain_regime: 0.9,
            strong_adx: 1.2,
            strong_adx_min: 35.0,
            weak_adx: 0.85,
            weak_adx_max: 20.0,
            open_breakout_session: 1.15,
            in_session: 1.0,
            off_session: 0.9,
            tight_spread_ratio: 0.05,
            wide_spread_ratio: 0.2,
            tight_spread: 1.05,
            wide_spread: 0.8,
            medium_impact: 0.9,
            high_impact: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    pub enabled: bool,
    pub ratio_multipliers: Vec<f64>,
    pub position_fractions: Vec<f64>,
    /// Snap a level to support/resistance lying within this share of its distance.
    pub snap_tolerance: f64,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ratio_multipliers: vec![1.0, 2.0, 3.0],
            position_fractions: vec![0.3, 0.4, 0.3],
            snap_tolerance: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlenderConfig {
    /// External confidence overrides when |confidence - 50| exceeds this margin.
    pub override_margin: f64,
    /// Share of the rule confidence in the local blend; the rest is technical confidence.
    pub rule_weight: f64,
    pub low_volatility_pct: f64,
    pub very_low_volatility_pct: f64,
    pub low_volatility_penalty: f64,
    pub very_low_volatility_penalty: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            override_margin: 25.0,
            rule_weight: 0.6,
            low_volatility_pct: 0.08,
            very_low_volatility_pct: 0.05,
            low_volatility_penalty: 5.0,
            very_low_volatility_penalty: 8.0,
            min_confidence: 40.0,
            max_confidence: 95.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub confidence: f64,
    pub technical_quality: f64,
    pub market_conditions: f64,
    pub mtf_confirmation: f64,
    pub risk_factors: f64,
}

impl ComponentWeights {
    pub fn total(&self) -> f64 {
        self.confidence
            + self.technical_quality
            + self.market_conditions
            + self.mtf_confirmation
            + self.risk_factors
    }
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            confidence: 0.30,
            technical_quality: 0.25,
            market_conditions: 0.20,
            mtf_confirmation: 0.15,
            risk_factors: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    pub weights: ComponentWeights,
    pub avoid_below: f64,
    pub buy_from: f64,
    pub strong_from: f64,
    /// Convert AVOID-tier signals to HOLD.
    pub enforce_avoid: bool,
    /// Symbols scored as low-risk / higher-risk by the risk-factor component.
    pub stable_symbols: Vec<String>,
    pub volatile_symbols: Vec<String>,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            avoid_below: 40.0,
            buy_from: 60.0,
            strong_from: 70.0,
            enforce_avoid: true,
            stable_symbols: vec!["EUR_USD".into(), "USD_CAD".into()],
            volatile_symbols: vec!["XAU_USD".into(), "GBP_USD".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub day: Weekday,
    pub from_hour: u32,
    /// Exclusive; 24 means end of day.
    pub to_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enabled: bool,
    pub weekend_days: Vec<Weekday>,
    pub blackouts: Vec<Blackout>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            blackouts: vec![Blackout {
                day: Weekday::Fri,
                from_hour: 21,
                to_hour: 24,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub major: InstrumentProfile,
    pub jpy: InstrumentProfile,
    pub metal: InstrumentProfile,
    pub overrides: BTreeMap<String, InstrumentProfile>,
}

impl InstrumentConfig {
    /// Resolve a normalized symbol to its class and profile.
    pub fn resolve(&self, symbol: &str) -> Instrument {
        let class = InstrumentClass::classify(symbol);
        let profile = self.overrides.get(symbol).copied().unwrap_or(match class {
            InstrumentClass::Major => self.major,
            InstrumentClass::Jpy => self.jpy,
            InstrumentClass::Metal => self.metal,
        });
        Instrument::new(symbol.to_string(), class, profile)
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            major: InstrumentProfile::major(),
            jpy: InstrumentProfile::jpy(),
            metal: InstrumentProfile::metal(),
            overrides: BTreeMap::new(),
        }
    }
}
