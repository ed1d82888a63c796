//! Signal: the record handed to the caller at the end of one evaluation.
//!
//! A signal is constructed once per request and never mutated by the engine
//! afterwards. HOLD signals carry no exits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::regime::Regime;

/// Side of an actionable trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1.0 for Buy, -1.0 for Sell. Multiply a distance by this to move in the trade direction.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// Direction reported on a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Buy => Some(Side::Buy),
            Self::Sell => Some(Side::Sell),
            Self::Hold => None,
        }
    }

    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Self::Buy,
            Side::Sell => Self::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
            Self::Hold => f.write_str("HOLD"),
        }
    }
}

/// Append-only, ordered list of human-readable reasoning lines.
///
/// Used for auditability only; nothing branches on its contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasoningTrace(Vec<String>);

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    pub fn extend(&mut self, other: ReasoningTrace) {
        self.0.extend(other.0);
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|l| l.contains(needle))
    }
}

/// One rung of a partial-exit ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitLevel {
    pub level_index: usize,
    pub price: f64,
    pub distance_in_pips: f64,
    pub risk_reward_ratio: f64,
    pub position_fraction: f64,
    pub rationale: String,
}

/// Take-profit: a single target or a ladder whose fractions sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TakeProfit {
    Single { price: f64, risk_reward_ratio: f64 },
    Ladder { levels: Vec<ExitLevel> },
}

impl TakeProfit {
    /// Price of the first (nearest) target.
    pub fn first_price(&self) -> Option<f64> {
        match self {
            Self::Single { price, .. } => Some(*price),
            Self::Ladder { levels } => levels.first().map(|l| l.price),
        }
    }

    /// Risk:reward of every target.
    pub fn ratios(&self) -> Vec<f64> {
        match self {
            Self::Single {
                risk_reward_ratio, ..
            } => vec![*risk_reward_ratio],
            Self::Ladder { levels } => levels.iter().map(|l| l.risk_reward_ratio).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    /// 0 for gated signals, otherwise within the configured [min, max] band.
    pub confidence: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<TakeProfit>,
    /// Raw classification at evaluation time; absent when the session gate short-circuits.
    pub regime: Option<Regime>,
    pub generated_at: DateTime<Utc>,
    pub reasoning: ReasoningTrace,
}

impl Signal {
    /// Zero-confidence HOLD with a single reasoning line.
    pub fn hold(symbol: impl Into<String>, at: DateTime<Utc>, reason: impl Into<String>) -> Self {
        let mut reasoning = ReasoningTrace::new();
        reasoning.push(reason);
        Self {
            symbol: symbol.into(),
            direction: Direction::Hold,
            confidence: 0.0,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            regime: None,
            generated_at: at,
            reasoning,
        }
    }

    /// Absolute stop distance, if the signal carries a stop.
    pub fn stop_distance(&self) -> Option<f64> {
        match (self.entry_price, self.stop_loss) {
            (Some(entry), Some(stop)) => Some((entry - stop).abs()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn side_sign_and_opposite() {
        assert_eq!(Side::Buy.sign(), 1.0);
        assert_eq!(Side::Sell.sign(), -1.0);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn direction_from_side() {
        assert_eq!(Direction::from(Side::Sell), Direction::Sell);
        assert_eq!(Direction::Hold.side(), None);
        assert!(!Direction::Hold.is_actionable());
    }

    #[test]
    fn trace_preserves_order() {
        let mut t = ReasoningTrace::new();
        t.push("first");
        t.push("second");
        let mut more = ReasoningTrace::new();
        more.push("third");
        t.extend(more);
        assert_eq!(t.lines(), &["first", "second", "third"]);
        assert!(t.contains("seco"));
    }

    #[test]
    fn trace_serializes_as_plain_array() {
        let mut t = ReasoningTrace::new();
        t.push("a");
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"["a"]"#);
    }

    #[test]
    fn hold_signal_has_no_exits() {
        let at = Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
        let s = Signal::hold("EUR_USD", at, "market closed");
        assert_eq!(s.direction, Direction::Hold);
        assert_eq!(s.confidence, 0.0);
        assert!(s.take_profit.is_none());
        assert_eq!(s.reasoning.len(), 1);
        assert_eq!(s.stop_distance(), None);
    }

    #[test]
    fn take_profit_accessors() {
        let tp = TakeProfit::Single {
            price: 1.2,
            risk_reward_ratio: 2.0,
        };
        assert_eq!(tp.first_price(), Some(1.2));
        assert_eq!(tp.ratios(), vec![2.0]);
    }
}
