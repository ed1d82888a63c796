//! Snapshot fingerprinting.
//!
//! BLAKE3 over the canonical JSON of a market snapshot. Two evaluations with
//! the same fingerprint, time and config produce the same signal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::MarketSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotHash(pub String);

impl SnapshotHash {
    pub fn of(snapshot: &MarketSnapshot) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_vec(snapshot)?;
        Ok(Self(blake3::hash(&canonical).to_hex().to_string()))
    }
}

impl fmt::Display for SnapshotHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
