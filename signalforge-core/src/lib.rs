//! Signalforge Core: the adaptive trading-signal engine.
//!
//! Given a symbol and a point in time, the engine produces one `Signal`
//! (BUY, SELL or HOLD) with entry, stop, take-profit, confidence and a
//! reasoning trace:
//! - Multi-timeframe market data fetched in parallel behind a provider trait
//! - Indicators (EMA, RSI, ATR, ADX, Choppiness, session VWAP)
//! - Regime classification with optional hysteresis
//! - Structural levels (Initial Balance, previous session, round numbers)
//! - Regime-keyed rule families with an always-directional fallback
//! - Stop bounds, composite risk:reward and take-profit ladders
//! - Confidence blending and signal weighting

pub mod confidence;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod levels;
pub mod pipeline;
pub mod regime;
pub mod risk;
pub mod session;
pub mod strategy;

pub use config::EngineConfig;
pub use error::EngineError;
pub use pipeline::{Analysis, Evaluation, EvaluationRequest, SignalEngine};
