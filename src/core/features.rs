//! Feature synthesis from a single physiological sample.
//!
//! The affect models were trained on nine BVP/EDA features. A request only
//! carries two scalars (heart rate and skin conductance), so the features are
//! approximated with closed-form heuristics plus a little uniform noise.
//! No frequency analysis or peak detection happens here.

use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of features every regression model consumes.
pub const FEATURE_COUNT: usize = 9;

/// Feature names in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "bvp_lf",
    "bvp_hf",
    "bvp_rmssd",
    "bvp_peak_count",
    "bvp_slope",
    "bvp_rolling_mean",
    "bvp_hf_lf_ratio",
    "eda_slope",
    "eda_peak_count",
];

/// A single heart-rate / skin-conductance reading.
///
/// Ranges are not checked: a heart rate of 0 or a negative EDA flows straight
/// into the feature formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysiologicalSample {
    /// Beats per minute
    #[serde(rename = "heartRate")]
    pub heart_rate: f64,
    /// Electrodermal activity in microsiemens
    pub eda: f64,
}

impl PhysiologicalSample {
    pub fn new(heart_rate: f64, eda: f64) -> Self {
        Self { heart_rate, eda }
    }
}

/// The nine model input features.
///
/// Field order matches [`FEATURE_NAMES`] and [`FeatureVector::to_array`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Low-frequency power estimate
    pub bvp_lf: f64,
    /// High-frequency power estimate
    pub bvp_hf: f64,
    /// RMSSD estimate (higher at lower heart rates)
    pub bvp_rmssd: f64,
    /// Pulse peaks per 10 seconds
    pub bvp_peak_count: f64,
    /// Pulse slope (noise only)
    pub bvp_slope: f64,
    /// Heart rate with jitter
    pub bvp_rolling_mean: f64,
    /// HF / LF ratio, LF floored at 0.1
    pub bvp_hf_lf_ratio: f64,
    /// EDA slope (noise only)
    pub eda_slope: f64,
    /// EDA peaks, rising with conductance above 2 µS
    pub eda_peak_count: f64,
}

impl FeatureVector {
    /// Features as a model input row.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.bvp_lf,
            self.bvp_hf,
            self.bvp_rmssd,
            self.bvp_peak_count,
            self.bvp_slope,
            self.bvp_rolling_mean,
            self.bvp_hf_lf_ratio,
            self.eda_slope,
            self.eda_peak_count,
        ]
    }

    /// Pair each value with its name.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }
}

/// Source of uniform draws in `[0, 1)`.
pub trait NoiseSource {
    fn next_unit(&mut self) -> f64;
}

/// Noise backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngNoise<R>(pub R);

impl RngNoise<ThreadRng> {
    /// Noise from the thread-local generator.
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

impl<R: Rng> NoiseSource for RngNoise<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct FixedNoise {
    values: Vec<f64>,
    next: usize,
}

impl FixedNoise {
    /// Every draw returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::sequence(vec![value])
    }

    /// Draws cycle through `values`. An empty list behaves like `constant(0.5)`.
    pub fn sequence(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.5] } else { values };
        Self { values, next: 0 }
    }
}

impl NoiseSource for FixedNoise {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

/// Synthesize the feature vector for one sample.
///
/// Four features consume one draw each, in this order: `bvp_slope`,
/// `bvp_rolling_mean`, `eda_slope`, `eda_peak_count`.
pub fn compute_features<N: NoiseSource + ?Sized>(
    sample: &PhysiologicalSample,
    noise: &mut N,
) -> FeatureVector {
    let hr = sample.heart_rate;
    let eda = sample.eda;

    let bvp_lf = 0.1 + (hr - 60.0) / 80.0 * 0.4;
    let bvp_hf = 0.5 - (hr - 60.0) / 80.0 * 0.3;
    let bvp_rmssd = 50.0 - (hr - 60.0) / 40.0 * 30.0;
    let bvp_peak_count = hr / 60.0 * 10.0;
    let bvp_slope = (noise.next_unit() - 0.5) * 0.2;
    let bvp_rolling_mean = hr + (noise.next_unit() - 0.5) * 5.0;
    let bvp_hf_lf_ratio = bvp_hf / bvp_lf.max(0.1);
    let eda_slope = (noise.next_unit() - 0.5) * 0.1;
    let eda_peak_count = (eda - 2.0).max(0.0) * 0.5 + noise.next_unit() * 2.0;

    let features = FeatureVector {
        bvp_lf,
        bvp_hf,
        bvp_rmssd,
        bvp_peak_count,
        bvp_slope,
        bvp_rolling_mean,
        bvp_hf_lf_ratio,
        eda_slope,
        eda_peak_count,
    };

    tracing::debug!(
        heart_rate = hr,
        eda,
        bvp_lf = %format_args!("{:.4}", features.bvp_lf),
        bvp_hf = %format_args!("{:.4}", features.bvp_hf),
        bvp_rmssd = %format_args!("{:.4}", features.bvp_rmssd),
        bvp_peak_count = %format_args!("{:.4}", features.bvp_peak_count),
        bvp_slope = %format_args!("{:.4}", features.bvp_slope),
        bvp_rolling_mean = %format_args!("{:.4}", features.bvp_rolling_mean),
        bvp_hf_lf_ratio = %format_args!("{:.4}", features.bvp_hf_lf_ratio),
        eda_slope = %format_args!("{:.4}", features.eda_slope),
        eda_peak_count = %format_args!("{:.4}", features.eda_peak_count),
        "Computed features"
    );

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_deterministic_features_at_60() {
        let f = compute_features(
            &PhysiologicalSample::new(60.0, 3.0),
            &mut FixedNoise::constant(0.5),
        );
        assert_close(f.bvp_lf, 0.1);
        assert_close(f.bvp_hf, 0.5);
        assert_close(f.bvp_rmssd, 50.0);
        assert_close(f.bvp_peak_count, 10.0);
        assert_close(f.bvp_hf_lf_ratio, 5.0);
    }

    #[test]
    fn test_deterministic_features_at_80() {
        let f = compute_features(
            &PhysiologicalSample::new(80.0, 3.0),
            &mut FixedNoise::constant(0.5),
        );
        assert_close(f.bvp_lf, 0.2);
        assert_close(f.bvp_hf, 0.425);
        assert_close(f.bvp_rmssd, 35.0);
        assert_close(f.bvp_peak_count, 80.0 / 6.0);
        assert_close(f.bvp_hf_lf_ratio, 2.125);
    }

    #[test]
    fn test_deterministic_features_at_100() {
        let f = compute_features(
            &PhysiologicalSample::new(100.0, 3.0),
            &mut FixedNoise::constant(0.5),
        );
        assert_close(f.bvp_lf, 0.3);
        assert_close(f.bvp_hf, 0.35);
        assert_close(f.bvp_rmssd, 20.0);
        assert_close(f.bvp_peak_count, 100.0 / 6.0);
        assert_close(f.bvp_hf_lf_ratio, 0.35 / 0.3);
    }

    #[test]
    fn test_low_frequency_floor_in_ratio() {
        // hr = 40 gives bvp_lf = 0.0, so the ratio divides by the 0.1 floor
        let f = compute_features(
            &PhysiologicalSample::new(40.0, 0.0),
            &mut FixedNoise::constant(0.0),
        );
        assert_close(f.bvp_lf, 0.0);
        assert_close(f.bvp_hf, 0.575);
        assert_close(f.bvp_hf_lf_ratio, 5.75);
    }

    #[test]
    fn test_noise_draw_order() {
        let mut noise = FixedNoise::sequence(vec![0.0, 1.0, 0.25, 0.75]);
        let f = compute_features(&PhysiologicalSample::new(70.0, 4.0), &mut noise);

        assert_close(f.bvp_slope, -0.1);
        assert_close(f.bvp_rolling_mean, 72.5);
        assert_close(f.eda_slope, -0.025);
        assert_close(f.eda_peak_count, 1.0 + 1.5);
    }

    #[test]
    fn test_eda_below_threshold_only_noise() {
        let f = compute_features(
            &PhysiologicalSample::new(70.0, 1.0),
            &mut FixedNoise::constant(0.0),
        );
        assert_close(f.eda_peak_count, 0.0);
    }

    #[test]
    fn test_stochastic_features_bounded() {
        let mut noise = RngNoise(StdRng::seed_from_u64(7));
        let sample = PhysiologicalSample::new(75.0, 6.0);

        for _ in 0..1000 {
            let f = compute_features(&sample, &mut noise);
            assert!((-0.1..0.1).contains(&f.bvp_slope));
            assert!((72.5..77.5).contains(&f.bvp_rolling_mean));
            assert!((-0.05..0.05).contains(&f.eda_slope));
            assert!((2.0..4.0).contains(&f.eda_peak_count));
        }
    }

    #[test]
    fn test_missing_values_propagate_as_nan() {
        let f = compute_features(
            &PhysiologicalSample::new(f64::NAN, 3.0),
            &mut FixedNoise::constant(0.5),
        );
        assert!(f.bvp_lf.is_nan());
        assert!(f.bvp_rolling_mean.is_nan());
        assert!(!f.bvp_slope.is_nan());
    }

    #[test]
    fn test_array_and_names_align() {
        let f = compute_features(
            &PhysiologicalSample::new(90.0, 5.0),
            &mut FixedNoise::constant(0.3),
        );
        let arr = f.to_array();
        assert_eq!(arr.len(), FEATURE_COUNT);

        let named: Vec<_> = f.named().collect();
        assert_eq!(named[0], ("bvp_lf", f.bvp_lf));
        assert_eq!(named[6], ("bvp_hf_lf_ratio", f.bvp_hf_lf_ratio));
        assert_eq!(named[8], ("eda_peak_count", f.eda_peak_count));
    }

    #[test]
    fn test_serialized_field_names() {
        let f = compute_features(
            &PhysiologicalSample::new(70.0, 3.0),
            &mut FixedNoise::constant(0.5),
        );
        let json = serde_json::to_value(f).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for name in FEATURE_NAMES {
            assert!(keys.contains(&name), "missing {name}");
        }
        assert_eq!(keys.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_sample_wire_names() {
        let sample: PhysiologicalSample =
            serde_json::from_str(r#"{"heartRate": 72.0, "eda": 3.5}"#).unwrap();
        assert_eq!(sample, PhysiologicalSample::new(72.0, 3.5));
    }
}
