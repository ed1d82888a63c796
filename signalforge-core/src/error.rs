//! Pipeline error type.
//!
//! A closed session is not an error: the gate returns a zero-confidence HOLD.

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{Granularity, InstrumentError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required fetch failed or returned no usable candles. No partial
    /// signal is produced.
    #[error("market data unavailable for {symbol} ({}): {reason}", granularity.map_or("quote", Granularity::as_str))]
    DataUnavailable {
        symbol: String,
        /// `None` for the quote fetch.
        granularity: Option<Granularity>,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<InstrumentError> for EngineError {
    fn from(e: InstrumentError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}
