use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad instrument family; drives pip size, stop bounds and the round-number grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    /// USD/EUR/GBP-style pairs quoted to 4-5 decimals.
    Major,
    /// JPY-quoted pairs (2-3 decimals).
    Jpy,
    /// Precious metals (XAU, XAG).
    Metal,
}

impl InstrumentClass {
    /// Classify a normalized symbol such as `EUR_USD`, `USD_JPY`, `XAU_USD`.
    pub fn classify(symbol: &str) -> Self {
        if symbol.starts_with("XAU") || symbol.starts_with("XAG") {
            Self::Metal
        } else if symbol.contains("JPY") {
            Self::Jpy
        } else {
            Self::Major
        }
    }
}

/// Per-instrument constants. Distances are expressed in pips of `pip_size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    pub pip_size: f64,
    pub min_stop_pips: f64,
    pub max_stop_pips: f64,
    pub round_number_step: f64,
}

impl InstrumentProfile {
    pub fn major() -> Self {
        Self {
            pip_size: 0.0001,
            min_stop_pips: 15.0,
            max_stop_pips: 60.0,
            round_number_step: 0.0050,
        }
    }

    pub fn jpy() -> Self {
        Self {
            pip_size: 0.01,
            min_stop_pips: 15.0,
            max_stop_pips: 60.0,
            round_number_step: 0.50,
        }
    }

    pub fn metal() -> Self {
        Self {
            pip_size: 0.1,
            min_stop_pips: 50.0,
            max_stop_pips: 200.0,
            round_number_step: 5.0,
        }
    }
}

/// A validated symbol together with its resolved profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub class: InstrumentClass,
    pub profile: InstrumentProfile,
}

impl Instrument {
    pub fn new(symbol: String, class: InstrumentClass, profile: InstrumentProfile) -> Self {
        Self {
            symbol,
            class,
            profile,
        }
    }

    pub fn pip_size(&self) -> f64 {
        self.profile.pip_size
    }

    /// Instrument-class minimum stop distance in price units.
    pub fn min_stop_distance(&self) -> f64 {
        self.profile.min_stop_pips * self.profile.pip_size
    }

    /// Instrument-class maximum stop distance in price units.
    pub fn max_stop_distance(&self) -> f64 {
        self.profile.max_stop_pips * self.profile.pip_size
    }

    /// Convert a price distance to pips.
    pub fn to_pips(&self, distance: f64) -> f64 {
        if self.profile.pip_size > 0.0 {
            distance / self.profile.pip_size
        } else {
            0.0
        }
    }
}

/// Normalize and validate a raw symbol identifier.
///
/// Accepts `EUR_USD`, `eur/usd`, `EURUSD`; separators become `_` and letters are
/// upper-cased. Rejects empty identifiers, identifiers outside 3..=20 characters
/// and anything besides ASCII alphanumerics and separators.
pub fn normalize_symbol(raw: &str) -> Result<String, InstrumentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InstrumentError::EmptySymbol);
    }
    if !(3..=20).contains(&trimmed.len()) {
        return Err(InstrumentError::InvalidSymbol {
            symbol: trimmed.to_string(),
            reason: "length must be between 3 and 20 characters".into(),
        });
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            c if c.is_ascii_alphanumeric() => out.push(c.to_ascii_uppercase()),
            '_' | '/' | '-' => out.push('_'),
            other => {
                return Err(InstrumentError::InvalidSymbol {
                    symbol: trimmed.to_string(),
                    reason: format!("unexpected character '{other}'"),
                })
            }
        }
    }
    if out.starts_with('_') || out.ends_with('_') || out.contains("__") {
        return Err(InstrumentError::InvalidSymbol {
            symbol: trimmed.to_string(),
            reason: "misplaced separator".into(),
        });
    }
    Ok(out)
}

#[derive(Debug, Error, PartialEq)]
pub enum InstrumentError {
    #[error("symbol is empty")]
    EmptySymbol,

    #[error("invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },
}
