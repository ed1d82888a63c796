//! Market data access: collaborator traits and the snapshot fetch.

pub mod provider;
pub mod snapshot;

pub use provider::{
    ConfidenceEstimator, DataError, EstimatorError, ExternalEstimate, HistoricalStats, MarketDataProvider,
    OutcomeStore,
};
pub use snapshot::{fetch_snapshot, MarketSnapshot, TimeframeCandles};
