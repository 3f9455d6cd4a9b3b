//! Arousal/valence prediction on top of the feature vector.

use crate::core::features::{compute_features, FeatureVector, NoiseSource, PhysiologicalSample};
use crate::model::{ModelLoader, ModelSource, PredictionError, RegressionModel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Centre of the 1-9 rating scale the models were trained on.
const SCALE_CENTER: f64 = 5.0;

/// Half-width of the 1-9 rating scale.
const SCALE_HALF_RANGE: f64 = 4.0;

/// Result of a single inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectResult {
    /// Arousal in [-1, 1]
    pub arousal: f64,
    /// Valence in [-1, 1]
    pub valence: f64,
    /// Unscaled arousal model output
    #[serde(rename = "rawArousal")]
    pub raw_arousal: f64,
    /// Unscaled valence model output
    #[serde(rename = "rawValence")]
    pub raw_valence: f64,
    pub features: FeatureVector,
}

/// Map a raw 1-9 rating onto [-1, 1].
///
/// Values outside the nominal rating range clamp to the nearest bound.
/// `raw` must be finite; [`RegressionModel::predict`] never returns anything else.
pub fn normalize(raw: f64) -> f64 {
    ((raw - SCALE_CENTER) / SCALE_HALF_RANGE).clamp(-1.0, 1.0)
}

/// The pair of models used to score requests.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AffectPredictor {
    arousal: RegressionModel,
    valence: RegressionModel,
    source: ModelSource,
}

impl AffectPredictor {
    pub fn new(arousal: RegressionModel, valence: RegressionModel) -> Self {
        let source = if arousal.is_fallback() || valence.is_fallback() {
            ModelSource::Fallback
        } else {
            ModelSource::Trained
        };
        Self {
            arousal,
            valence,
            source,
        }
    }

    /// Predictor backed by the constant fallback models.
    pub fn fallback() -> Self {
        let (arousal, valence) = ModelLoader::fallback_pair();
        Self::new(arousal, valence)
    }

    /// Load both models from disk, falling back to constants on any failure.
    pub fn load_or_fallback(arousal_path: &Path, valence_path: &Path) -> Self {
        let (arousal, valence, source) = ModelLoader::load_pair(arousal_path, valence_path);
        Self {
            arousal,
            valence,
            source,
        }
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    /// Score a feature vector with both models.
    pub fn predict(&self, features: &FeatureVector) -> Result<AffectResult, PredictionError> {
        let raw_arousal = self.arousal.predict("arousal", features)?;
        let raw_valence = self.valence.predict("valence", features)?;

        let arousal = normalize(raw_arousal);
        let valence = normalize(raw_valence);

        tracing::info!(
            arousal = %format_args!("{:.4}", arousal),
            raw_arousal = %format_args!("{:.4}", raw_arousal),
            valence = %format_args!("{:.4}", valence),
            raw_valence = %format_args!("{:.4}", raw_valence),
            "Prediction complete"
        );

        Ok(AffectResult {
            arousal,
            valence,
            raw_arousal,
            raw_valence,
            features: *features,
        })
    }

    /// Synthesize features for `sample` and score them.
    pub fn infer<N: NoiseSource + ?Sized>(
        &self,
        sample: &PhysiologicalSample,
        noise: &mut N,
    ) -> Result<AffectResult, PredictionError> {
        tracing::debug!(heart_rate = sample.heart_rate, eda = sample.eda, "Input received");
        let features = compute_features(sample, noise);
        self.predict(&features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FixedNoise, FEATURE_COUNT};
    use crate::model::{LinearModel, Scaler};

    fn constant_linear(intercept: f64) -> RegressionModel {
        RegressionModel::Trained(LinearModel {
            coefficients: vec![0.0; FEATURE_COUNT],
            intercept,
            scaler: None,
        })
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(1.0), -1.0);
        assert_eq!(normalize(5.0), 0.0);
        assert_eq!(normalize(9.0), 1.0);
        assert_eq!(normalize(13.0), 1.0);
        assert_eq!(normalize(-20.0), -1.0);
        assert_eq!(normalize(7.0), 0.5);
        assert_eq!(normalize(4.0), -0.25);
    }

    #[test]
    fn test_fallback_prediction_clamps() {
        let predictor = AffectPredictor::fallback();
        assert_eq!(predictor.source(), ModelSource::Fallback);

        let result = predictor
            .infer(&PhysiologicalSample::new(70.0, 3.0), &mut FixedNoise::constant(0.5))
            .unwrap();

        assert_eq!(result.raw_arousal, 0.2);
        assert_eq!(result.raw_valence, 0.3);
        assert_eq!(result.arousal, -1.0);
        assert_eq!(result.valence, -1.0);
    }

    #[test]
    fn test_trained_prediction_rescaled() {
        let predictor = AffectPredictor::new(constant_linear(7.0), constant_linear(3.0));
        assert_eq!(predictor.source(), ModelSource::Trained);

        let result = predictor
            .infer(&PhysiologicalSample::new(80.0, 5.0), &mut FixedNoise::constant(0.5))
            .unwrap();

        assert_eq!(result.arousal, 0.5);
        assert_eq!(result.valence, -0.5);
        assert_eq!(result.raw_arousal, 7.0);
        assert_eq!(result.raw_valence, 3.0);
        assert!((result.features.bvp_lf - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_failure_returns_no_partial_result() {
        // Arousal would succeed as a fallback, valence rejects the NaN input
        let predictor = AffectPredictor::new(
            RegressionModel::Fallback { constant: 0.2 },
            constant_linear(5.0),
        );
        let err = predictor
            .infer(&PhysiologicalSample::new(f64::NAN, 3.0), &mut FixedNoise::constant(0.5))
            .unwrap_err();
        assert!(matches!(err, PredictionError::NonFiniteFeature { .. }));
    }

    #[test]
    fn test_mismatched_scaler_fails_without_panic() {
        let arousal = RegressionModel::Trained(LinearModel {
            coefficients: vec![1.0; FEATURE_COUNT],
            intercept: 5.0,
            scaler: Some(Scaler {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            }),
        });
        let predictor = AffectPredictor::new(arousal, constant_linear(5.0));

        let err = predictor
            .infer(&PhysiologicalSample::new(70.0, 3.0), &mut FixedNoise::constant(0.5))
            .unwrap_err();
        assert!(matches!(err, PredictionError::FeatureCount { .. }));
    }

    #[test]
    fn test_nan_fallback_never_reaches_normalize() {
        let predictor = AffectPredictor::new(
            RegressionModel::Fallback { constant: f64::NAN },
            RegressionModel::Fallback { constant: 0.3 },
        );
        let err = predictor
            .infer(&PhysiologicalSample::new(70.0, 3.0), &mut FixedNoise::constant(0.5))
            .unwrap_err();
        assert_eq!(err, PredictionError::NonFiniteOutput { model: "arousal" });
    }

    #[test]
    fn test_result_wire_format() {
        let result = AffectPredictor::fallback()
            .infer(&PhysiologicalSample::new(70.0, 3.0), &mut FixedNoise::constant(0.5))
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["rawArousal"], 0.2);
        assert_eq!(json["rawValence"], 0.3);
        assert_eq!(json["arousal"], -1.0);
        assert!(json["features"]["bvp_hf_lf_ratio"].is_number());
        assert!(json.get("raw_arousal").is_none());
    }
}
