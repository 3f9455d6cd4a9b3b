//! Regression models for arousal and valence.
//!
//! A trained model is a linear regressor persisted as JSON:
//!
//! ```json
//! {
//!   "coefficients": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
//!   "intercept": 5.0,
//!   "scaler": { "mean": [0, 0, 0, 0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1, 1, 1, 1] }
//! }
//! ```
//!
//! `scaler` is optional. When a model cannot be loaded the service falls back
//! to constant-output models so it keeps answering requests.

use crate::core::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Constant output of the arousal fallback model.
pub const FALLBACK_AROUSAL: f64 = 0.2;

/// Constant output of the valence fallback model.
pub const FALLBACK_VALENCE: f64 = 0.3;

/// Errors raised while loading a persisted model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} has {actual} entries, expected {expected}")]
    Shape {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Errors raised by a model at prediction time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Input contains NaN or infinity (feature {name})")]
    NonFiniteFeature { name: &'static str },

    #[error("{model} model produced a non-finite output")]
    NonFiniteOutput { model: &'static str },

    #[error("X has {actual} features, but the model is expecting {expected} features as input")]
    FeatureCount { expected: usize, actual: usize },
}

/// Feature standardization applied before the linear term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Persisted linear regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<Scaler>,
}

impl LinearModel {
    /// Check shapes and parameters against the 9-feature input.
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        check_len("coefficients", self.coefficients.len())?;

        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelLoadError::InvalidParameter(
                "coefficients and intercept must be finite".to_string(),
            ));
        }

        if let Some(scaler) = &self.scaler {
            check_len("scaler.mean", scaler.mean.len())?;
            check_len("scaler.scale", scaler.scale.len())?;

            if scaler.mean.iter().any(|m| !m.is_finite()) {
                return Err(ModelLoadError::InvalidParameter(
                    "scaler.mean must be finite".to_string(),
                ));
            }
            if scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(ModelLoadError::InvalidParameter(
                    "scaler.scale must be finite and non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Score one input row.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, PredictionError> {
        if row.len() != self.coefficients.len() {
            return Err(PredictionError::FeatureCount {
                expected: self.coefficients.len(),
                actual: row.len(),
            });
        }

        let mut total = self.intercept;
        match &self.scaler {
            Some(scaler) => {
                for len in [scaler.mean.len(), scaler.scale.len()] {
                    if len != row.len() {
                        return Err(PredictionError::FeatureCount {
                            expected: len,
                            actual: row.len(),
                        });
                    }
                }
                for (((&x, &w), &m), &s) in row
                    .iter()
                    .zip(&self.coefficients)
                    .zip(&scaler.mean)
                    .zip(&scaler.scale)
                {
                    total += w * ((x - m) / s);
                }
            }
            None => {
                for (&x, &w) in row.iter().zip(&self.coefficients) {
                    total += w * x;
                }
            }
        }
        Ok(total)
    }
}

fn check_len(field: &'static str, actual: usize) -> Result<(), ModelLoadError> {
    if actual != FEATURE_COUNT {
        return Err(ModelLoadError::Shape {
            field,
            expected: FEATURE_COUNT,
            actual,
        });
    }
    Ok(())
}

/// A model that scores feature vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionModel {
    /// Model loaded from disk
    Trained(LinearModel),
    /// Constant output used when loading fails
    Fallback { constant: f64 },
}

impl RegressionModel {
    /// Score a feature vector. `model` names the target in error messages.
    ///
    /// The returned value is always finite.
    pub fn predict(
        &self,
        model: &'static str,
        features: &FeatureVector,
    ) -> Result<f64, PredictionError> {
        let raw = match self {
            RegressionModel::Trained(linear) => {
                if let Some((name, _)) = features.named().find(|(_, v)| !v.is_finite()) {
                    return Err(PredictionError::NonFiniteFeature { name });
                }
                linear.predict_row(&features.to_array())?
            }
            RegressionModel::Fallback { constant } => *constant,
        };
        if !raw.is_finite() {
            return Err(PredictionError::NonFiniteOutput { model });
        }
        Ok(raw)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RegressionModel::Fallback { .. })
    }
}

/// Where the active models came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Trained,
    Fallback,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Trained => write!(f, "trained"),
            ModelSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Loads persisted models from disk.
pub struct ModelLoader;

impl ModelLoader {
    /// Load and validate a linear model from a JSON file.
    pub fn load(path: &Path) -> Result<RegressionModel, ModelLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let linear: LinearModel =
            serde_json::from_str(&content).map_err(|source| ModelLoadError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        linear.validate()?;
        Ok(RegressionModel::Trained(linear))
    }

    /// Load both models, or neither.
    ///
    /// Any failure swaps both models for their constant fallbacks.
    pub fn load_pair(
        arousal: &Path,
        valence: &Path,
    ) -> (RegressionModel, RegressionModel, ModelSource) {
        match (Self::load(arousal), Self::load(valence)) {
            (Ok(a), Ok(v)) => {
                tracing::info!(
                    arousal = %arousal.display(),
                    valence = %valence.display(),
                    "Loaded trained models"
                );
                (a, v, ModelSource::Trained)
            }
            (a, v) => {
                for err in [a.err(), v.err()].into_iter().flatten() {
                    tracing::warn!("Model load error: {}", err);
                }
                tracing::warn!(
                    arousal = FALLBACK_AROUSAL,
                    valence = FALLBACK_VALENCE,
                    "Using constant fallback models"
                );
                let (a, v) = Self::fallback_pair();
                (a, v, ModelSource::Fallback)
            }
        }
    }

    pub fn fallback_pair() -> (RegressionModel, RegressionModel) {
        (
            RegressionModel::Fallback {
                constant: FALLBACK_AROUSAL,
            },
            RegressionModel::Fallback {
                constant: FALLBACK_VALENCE,
            },
        )
    }
}
