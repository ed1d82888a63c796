//! Collaborator traits: market data in, optional confidence estimate and
//! historical outcome statistics.
//!
//! All three are owned by the caller. Implementations must be thread-safe;
//! the pipeline fans fetches out across the rayon pool.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candle, Direction, Granularity, Quote};
use crate::indicators::IndicatorSet;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no {granularity} candles for {symbol}")]
    Empty { symbol: String, granularity: Granularity },

    #[error("data request timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed market data: {0}")]
    Parse(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Read-only market data source.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Most recent `count` candles, oldest first. May include a forming candle.
    fn candles(&self, symbol: &str, granularity: Granularity, count: usize) -> Result<Vec<Candle>, DataError>;

    fn quote(&self, symbol: &str) -> Result<Quote, DataError>;
}

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("confidence model unavailable: {0}")]
    Unavailable(String),

    #[error("confidence model timed out")]
    Timeout,

    #[error("confidence model error: {0}")]
    Other(String),
}

/// Output of an external confidence model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalEstimate {
    /// `None` or `Some(Hold)` mean the model has no directional view.
    pub direction: Option<Direction>,
    /// 0..=100.
    pub confidence: f64,
    pub model_available: bool,
}

/// Black-box confidence model. Best effort: failures never abort an evaluation.
pub trait ConfidenceEstimator: Send + Sync {
    fn predict(&self, symbol: &str, indicators: &IndicatorSet) -> Result<ExternalEstimate, EstimatorError>;
}

/// Per-symbol track record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStats {
    /// Percent, 0..=100.
    pub win_rate: f64,
    /// Current drawdown in percent.
    pub drawdown_pct: f64,
}

/// Read-only store of historical outcomes, consumed by the weighting step.
pub trait OutcomeStore: Send + Sync {
    fn stats(&self, symbol: &str) -> Option<HistoricalStats>;
}
