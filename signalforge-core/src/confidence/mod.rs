//! Confidence: blending rule, model and technical confidence, and the
//! standalone weighting step.

pub mod blender;
pub mod weighting;

pub use blender::{blend, technical_confidence, volatility_penalty, Blend, ConfidenceSource};
pub use weighting::{weigh, Recommendation, SignalWeight, WeightComponents, WeightInputs};
