//! Domain types for signalforge

pub mod candle;
pub mod instrument;
pub mod quote;
pub mod signal;

pub use candle::{complete_only, Candle, Granularity};
pub use instrument::{normalize_symbol, Instrument, InstrumentClass, InstrumentError, InstrumentProfile};
pub use quote::Quote;
pub use signal::{Direction, ExitLevel, ReasoningTrace, Side, Signal, TakeProfit};

