//! Core inference logic.
//!
//! This module contains:
//! - Feature synthesis from a heart-rate / EDA sample
//! - Arousal/valence prediction and rescaling
//! - Emotion labels and self-report comparison

pub mod emotion;
pub mod features;
pub mod predictor;

// Re-export commonly used types
pub use emotion::{compare, AffectPoint, ComparisonResult, EmotionLabel, GapLevel};
pub use features::{
    compute_features, FeatureVector, FixedNoise, NoiseSource, PhysiologicalSample, RngNoise,
    FEATURE_COUNT, FEATURE_NAMES,
};
pub use predictor::{normalize, AffectPredictor, AffectResult};
