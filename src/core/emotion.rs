//! Emotion labels and self-report comparison on the arousal/valence plane.

use serde::{Deserialize, Serialize};

/// Distance from the origin past which an axis counts as high or low.
const AXIS_THRESHOLD: f64 = 0.3;

/// Gap above which a mismatch is reported.
const SIGNIFICANT_GAP: f64 = 0.3;

/// Gap above which a mismatch is considered large.
const LARGE_GAP: f64 = 0.6;

/// A point on the circumplex, both axes in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectPoint {
    pub arousal: f64,
    pub valence: f64,
}

impl AffectPoint {
    pub fn new(arousal: f64, valence: f64) -> Self {
        Self { arousal, valence }
    }

    /// Same point with both axes clamped to [-1, 1].
    pub fn clamped(self) -> Self {
        Self {
            arousal: self.arousal.clamp(-1.0, 1.0),
            valence: self.valence.clamp(-1.0, 1.0),
        }
    }

    pub fn label(&self) -> EmotionLabel {
        EmotionLabel::classify(self.arousal, self.valence)
    }
}

/// Nine regions of the arousal/valence plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Excited,
    Distressed,
    Tense,
    Relaxed,
    Depressed,
    Tired,
    Content,
    Dissatisfied,
    Neutral,
}

impl EmotionLabel {
    pub fn classify(arousal: f64, valence: f64) -> Self {
        let positive = valence > AXIS_THRESHOLD;
        let negative = valence < -AXIS_THRESHOLD;

        if arousal > AXIS_THRESHOLD {
            if positive {
                EmotionLabel::Excited
            } else if negative {
                EmotionLabel::Distressed
            } else {
                EmotionLabel::Tense
            }
        } else if arousal < -AXIS_THRESHOLD {
            if positive {
                EmotionLabel::Relaxed
            } else if negative {
                EmotionLabel::Depressed
            } else {
                EmotionLabel::Tired
            }
        } else if positive {
            EmotionLabel::Content
        } else if negative {
            EmotionLabel::Dissatisfied
        } else {
            EmotionLabel::Neutral
        }
    }

    /// Human-readable name.
    pub fn description(&self) -> &'static str {
        match self {
            EmotionLabel::Excited => "happy/excited",
            EmotionLabel::Distressed => "angry/afraid",
            EmotionLabel::Tense => "alert/tense",
            EmotionLabel::Relaxed => "relaxed/calm",
            EmotionLabel::Depressed => "sad/depressed",
            EmotionLabel::Tired => "tired/sleepy",
            EmotionLabel::Content => "content/pleased",
            EmotionLabel::Dissatisfied => "dissatisfied/disappointed",
            EmotionLabel::Neutral => "calm/neutral",
        }
    }
}

/// Severity bucket for a single-axis gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapLevel {
    Small,
    Medium,
    Large,
}

impl GapLevel {
    pub fn from_gap(gap: f64) -> Self {
        if gap > LARGE_GAP {
            GapLevel::Large
        } else if gap > SIGNIFICANT_GAP {
            GapLevel::Medium
        } else {
            GapLevel::Small
        }
    }
}

/// Comparison between a predicted state and a self-reported one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub arousal_gap: f64,
    pub valence_gap: f64,
    pub has_significant_gap: bool,
    pub insights: Vec<String>,
    pub predicted_label: EmotionLabel,
    pub reported_label: EmotionLabel,
    pub arousal_gap_level: GapLevel,
    pub valence_gap_level: GapLevel,
}

/// Compare the body's predicted state with what the person reports feeling.
pub fn compare(predicted: AffectPoint, reported: AffectPoint) -> ComparisonResult {
    let predicted = predicted.clamped();
    let reported = reported.clamped();

    let arousal_gap = (reported.arousal - predicted.arousal).abs();
    let valence_gap = (reported.valence - predicted.valence).abs();

    let mut insights = Vec::new();
    if arousal_gap > SIGNIFICANT_GAP {
        insights.push(if predicted.arousal > reported.arousal {
            "Your body appears more activated than you feel.".to_string()
        } else {
            "You feel activated, but your body is calmer.".to_string()
        });
    }
    if valence_gap > SIGNIFICANT_GAP {
        insights.push(if predicted.valence > reported.valence {
            "Your body shows a more positive state than you perceive.".to_string()
        } else {
            "You feel positive, but your body shows a stress response.".to_string()
        });
    }

    let has_significant_gap = !insights.is_empty();
    if !has_significant_gap {
        insights.push("Your perceived emotion matches your body's state well.".to_string());
    }

    ComparisonResult {
        arousal_gap,
        valence_gap,
        has_significant_gap,
        insights,
        predicted_label: predicted.label(),
        reported_label: reported.label(),
        arousal_gap_level: GapLevel::from_gap(arousal_gap),
        valence_gap_level: GapLevel::from_gap(valence_gap),
    }
}
