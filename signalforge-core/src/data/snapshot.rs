//! Multi-timeframe market snapshot and the fetch fan-out that builds it.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{DataError, MarketDataProvider};
use crate::config::TimeframeConfig;
use crate::domain::{complete_only, Candle, Granularity, Quote};
use crate::error::EngineError;

/// Complete candles of one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeCandles {
    pub granularity: Granularity,
    pub candles: Vec<Candle>,
}

/// Everything one evaluation reads from the market. Optional timeframes that
/// could not be fetched are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub quote: Quote,
    pub primary: TimeframeCandles,
    pub middle: Option<TimeframeCandles>,
    pub higher: Option<TimeframeCandles>,
}

impl MarketSnapshot {
    /// Complete candles for previous-session levels: the finest of
    /// middle/higher that has any, else the primary timeframe.
    pub fn session_history(&self) -> Vec<Candle> {
        [self.middle.as_ref(), self.higher.as_ref()]
            .into_iter()
            .flatten()
            .map(|tf| complete_only(&tf.candles))
            .find(|c| !c.is_empty())
            .unwrap_or_else(|| complete_only(&self.primary.candles))
    }
}

/// Fetch the quote and all three timeframes in parallel and join.
///
/// The primary timeframe and the quote are required; a failure on either is
/// `DataUnavailable`. Middle/higher failures are logged and left out.
pub fn fetch_snapshot(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    timeframes: &TimeframeConfig,
) -> Result<MarketSnapshot, EngineError> {
    let grans = [timeframes.primary, timeframes.middle, timeframes.higher];
    let count = timeframes.candle_count;

    let (quote, mut fetched) = rayon::join(
        || provider.quote(symbol),
        || {
            grans
                .par_iter()
                .map(|&g| (g, fetch_complete(provider, symbol, g, count)))
                .collect::<Vec<_>>()
        },
    );

    let quote = quote.map_err(|e| unavailable(symbol, None, e.to_string()))?;
    if !quote.is_valid() {
        return Err(unavailable(symbol, None, format!("invalid quote {quote:?}")));
    }

    let higher = optional(symbol, fetched.pop());
    let middle = optional(symbol, fetched.pop());
    let primary = match fetched.pop() {
        Some((granularity, Ok(candles))) => TimeframeCandles { granularity, candles },
        Some((granularity, Err(e))) => return Err(unavailable(symbol, Some(granularity), e.to_string())),
        None => {
            return Err(unavailable(
                symbol,
                Some(timeframes.primary),
                "primary fetch produced no result".into(),
            ))
        }
    };

    debug!(
        symbol,
        provider = provider.name(),
        primary = primary.candles.len(),
        middle = middle.as_ref().map_or(0, |tf| tf.candles.len()),
        higher = higher.as_ref().map_or(0, |tf| tf.candles.len()),
        "snapshot fetched"
    );

    Ok(MarketSnapshot {
        symbol: symbol.to_string(),
        quote,
        primary,
        middle,
        higher,
    })
}

fn fetch_complete(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    granularity: Granularity,
    count: usize,
) -> Result<Vec<Candle>, DataError> {
    let candles = complete_only(&provider.candles(symbol, granularity, count)?);
    if candles.is_empty() {
        return Err(DataError::Empty {
            symbol: symbol.to_string(),
            granularity,
        });
    }
    Ok(candles)
}

fn optional(
    symbol: &str,
    fetched: Option<(Granularity, Result<Vec<Candle>, DataError>)>,
) -> Option<TimeframeCandles> {
    match fetched? {
        (granularity, Ok(candles)) => Some(TimeframeCandles { granularity, candles }),
        (granularity, Err(e)) => {
            warn!(symbol, %granularity, error = %e, "optional timeframe unavailable, trend reads Unknown");
            None
        }
    }
}

fn unavailable(symbol: &str, granularity: Option<Granularity>, reason: String) -> EngineError {
    EngineError::DataUnavailable {
        symbol: symbol.to_string(),
        granularity,
        reason,
    }
}
