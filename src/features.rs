//! Feature layout and scaling for the exam score model.
//!
//! The order of [`FEATURES`] is the column order the regressor was fitted
//! on; coefficient `i` weights feature `i`.

use crate::types::student::ExamScoreInput;

/// Number of features the model expects
pub const FEATURE_COUNT: usize = 21;

/// Name, legal range and scaling divisor of one model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub min: i64,
    pub max: i64,
    /// Raw value is divided by this before it reaches the model
    pub divisor: f64,
}

impl FeatureSpec {
    const fn bounded(name: &'static str, min: i64, max: i64, divisor: f64) -> Self {
        Self {
            name,
            min,
            max,
            divisor,
        }
    }

    const fn flag(name: &'static str) -> Self {
        Self::bounded(name, 0, 1, 1.0)
    }

    /// Whether `value` lies in the feature's closed range
    pub fn accepts(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Model inputs in training order
pub const FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    // Bounded counts, scaled to roughly [0, 1]
    FeatureSpec::bounded("hours_studied", 1, 44, 44.0),
    FeatureSpec::bounded("attendance", 60, 100, 100.0),
    FeatureSpec::bounded("previous_scores", 50, 100, 100.0),
    FeatureSpec::bounded("tutoring_sessions", 0, 8, 8.0),
    // One-hot flags, passed through
    FeatureSpec::flag("parental_involvement_low"),
    FeatureSpec::flag("parental_involvement_medium"),
    FeatureSpec::flag("access_to_resources_low"),
    FeatureSpec::flag("access_to_resources_medium"),
    FeatureSpec::flag("extracurricular_activities_yes"),
    FeatureSpec::flag("motivation_level_low"),
    FeatureSpec::flag("internet_access_yes"),
    FeatureSpec::flag("family_income_low"),
    FeatureSpec::flag("family_income_medium"),
    FeatureSpec::flag("teacher_quality_low"),
    FeatureSpec::flag("teacher_quality_medium"),
    FeatureSpec::flag("peer_influence_positive"),
    FeatureSpec::flag("learning_disabilities_yes"),
    FeatureSpec::flag("parental_education_level_high_school"),
    FeatureSpec::flag("parental_education_level_postgraduate"),
    FeatureSpec::flag("distance_from_home_moderate"),
    FeatureSpec::flag("distance_from_home_near"),
];

/// Turns student records into model feature vectors
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Raw (unscaled) feature vector in training order
    pub fn extract(&self, input: &ExamScoreInput) -> Vec<f64> {
        input.values().iter().map(|&v| v as f64).collect()
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURES.iter().map(|f| f.name).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a raw feature vector.
///
/// Positions past the feature table are passed through. Returns `None` if
/// any scaled value is not finite, so callers can fall back to the raw
/// vector instead of failing.
pub fn scale(features: &[f64]) -> Option<Vec<f64>> {
    let scaled: Vec<f64> = features
        .iter()
        .enumerate()
        .map(|(i, &v)| match FEATURES.get(i) {
            Some(spec) => v / spec.divisor,
            None => v,
        })
        .collect();

    scaled.iter().all(|v| v.is_finite()).then_some(scaled)
}
