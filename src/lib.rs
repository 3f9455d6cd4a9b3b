//! Affect Inference - arousal/valence scores from heart rate and skin conductance.
//!
//! A request carries two scalars: heart rate (bpm) and electrodermal activity
//! (µS). They are expanded into nine BVP/EDA features, scored by two
//! regression models, and rescaled from the models' 1-9 rating scale to
//! [-1, 1].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      Affect Inference                         │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐     │
//! │  │   Sample    │──▶│  Features   │──▶│ Arousal/Valence  │     │
//! │  │ (HR, EDA)   │   │  (9 values) │   │     models       │     │
//! │  └─────────────┘   └─────────────┘   └────────┬─────────┘     │
//! │                                               ▼               │
//! │                                      ┌──────────────────┐     │
//! │                                      │ Rescale to [-1,1]│     │
//! │                                      └──────────────────┘     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The features are heuristics over two scalars, not real signal processing.
//!
//! # Example
//!
//! ```
//! use affect_inference::core::{AffectPredictor, FixedNoise, PhysiologicalSample};
//!
//! // Constant fallback models: arousal 0.2, valence 0.3 on the 1-9 scale
//! let predictor = AffectPredictor::fallback();
//! let sample = PhysiologicalSample::new(72.0, 3.5);
//!
//! let result = predictor.infer(&sample, &mut FixedNoise::constant(0.5)).unwrap();
//! assert_eq!(result.arousal, -1.0);
//! ```

pub mod config;
pub mod core;
pub mod model;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    compute_features, normalize, AffectPredictor, AffectResult, FeatureVector,
    PhysiologicalSample,
};
pub use model::{ModelLoadError, ModelLoader, ModelSource, PredictionError, RegressionModel};
pub use stats::{InferenceStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
