//! Quote: current bid/ask snapshot, one per evaluation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
    pub spread: f64,
    pub spread_in_pips: f64,
}

impl Quote {
    /// Build a quote from bid/ask, deriving mid and spread.
    ///
    /// A crossed book (ask < bid) is treated as a zero spread at the midpoint.
    pub fn from_bid_ask(bid: f64, ask: f64, pip_size: f64) -> Self {
        let (bid, ask) = if ask < bid {
            let mid = (bid + ask) / 2.0;
            (mid, mid)
        } else {
            (bid, ask)
        };
        let spread = ask - bid;
        let spread_in_pips = if pip_size > 0.0 { spread / pip_size } else { 0.0 };
        Self {
            bid,
            ask,
            mid: (bid + ask) / 2.0,
            spread,
            spread_in_pips,
        }
    }

    /// Quote centred on `mid` with a fixed spread in pips.
    pub fn around_mid(mid: f64, spread_pips: f64, pip_size: f64) -> Self {
        let half = spread_pips * pip_size / 2.0;
        Self::from_bid_ask(mid - half, mid + half, pip_size)
    }

    pub fn is_valid(&self) -> bool {
        self.bid.is_finite() && self.ask.is_finite() && self.bid > 0.0 && self.ask >= self.bid
    }
}
