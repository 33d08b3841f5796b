//! Exam score predictor

use crate::error::PredictError;
use crate::features::{self, FEATURE_COUNT};
use crate::models::loader::{ModelSource, ParameterStore};
use crate::models::parameters::Regressor;
use std::sync::Arc;
use tracing::debug;

/// Lowest score the service reports
pub const MIN_SCORE: f64 = 0.0;
/// Highest score the service reports
pub const MAX_SCORE: f64 = 100.0;

/// Maps one feature vector to one bounded exam score.
///
/// Cheap to clone; every clone reads the same immutable [`ParameterStore`].
#[derive(Debug, Clone)]
pub struct Predictor {
    store: Arc<ParameterStore>,
}

impl Predictor {
    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Predict an exam score in `[0, 100]` from a raw feature vector
    pub fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        if features.len() != FEATURE_COUNT {
            return Err(PredictError::InvalidInput {
                expected: FEATURE_COUNT,
                actual: features.len(),
            });
        }

        let scaled = features::scale(features).unwrap_or_else(|| {
            debug!("Scaling produced non-finite values, using raw features");
            features.to_vec()
        });

        let raw = match self.store.source() {
            ModelSource::Regressor(model) => {
                model.predict(&scaled).map_err(|e| PredictError::Prediction(e.into()))?
            }
            ModelSource::Linear(params) => Regressor::predict(params, &scaled)
                .map_err(|e| PredictError::Prediction(e.into()))?,
            ModelSource::Absent => {
                return Err(PredictError::Configuration {
                    artifact_path: self.store.artifact_path().to_path_buf(),
                })
            }
        };

        if !raw.is_finite() {
            return Err(PredictError::Prediction(
                anyhow::anyhow!("model produced a non-finite value ({})", raw).into(),
            ));
        }

        let score = raw.clamp(MIN_SCORE, MAX_SCORE);
        debug!(raw = raw, score = score, "Prediction complete");
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parameters::ModelParameters;
    use anyhow::Result;
    use rand::Rng;
    use std::sync::Mutex;

    fn linear(coefficients: Vec<f64>, intercept: f64) -> Predictor {
        let params = ModelParameters::new(coefficients, intercept);
        Predictor::new(Arc::new(ParameterStore::from_parameters(params, "model.pkl")))
    }

    fn sample() -> Vec<f64> {
        vec![
            20.0, 85.0, 75.0, 2.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0,
            0.0, 1.0, 0.0, 1.0, 0.0,
        ]
    }

    /// Records what it was called with
    struct Recording {
        seen: Mutex<Vec<f64>>,
        result: Option<f64>,
    }

    impl Regressor for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn predict(&self, scaled: &[f64]) -> Result<f64> {
            *self.seen.lock().unwrap() = scaled.to_vec();
            self.result.ok_or_else(|| anyhow::anyhow!("backend unavailable"))
        }
    }

    #[test]
    fn test_scaled_dot_product() {
        let mut coefficients = vec![0.0; 21];
        coefficients[0] = 2.0;
        let predictor = linear(coefficients, 0.0);

        let mut features = vec![0.0; 21];
        features[0] = 44.0;

        assert_eq!(predictor.predict(&features).unwrap(), 2.0);
    }

    #[test]
    fn test_intercept_and_flags() {
        let mut coefficients = vec![0.0; 21];
        coefficients[1] = 10.0; // attendance / 100
        coefficients[4] = 3.0; // flag, unscaled
        let predictor = linear(coefficients, 50.0);

        let mut features = vec![0.0; 21];
        features[1] = 80.0;
        features[4] = 1.0;

        let score = predictor.predict(&features).unwrap();
        assert!((score - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_to_score_range() {
        assert_eq!(linear(vec![0.0; 21], 250.0).predict(&sample()).unwrap(), 100.0);
        assert_eq!(linear(vec![0.0; 21], -40.0).predict(&sample()).unwrap(), 0.0);
    }

    #[test]
    fn test_wrong_length_is_invalid_input() {
        let err = linear(vec![0.0; 21], 0.0).predict(&[1.0; 20]).unwrap_err();
        assert!(matches!(
            err,
            PredictError::InvalidInput {
                expected: 21,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_short_coefficient_vector_is_prediction_error() {
        // a 10-coefficient store must not silently drop features 10..21
        let mut features = vec![0.0; 21];
        features[4] = 1.0;
        features[20] = 1.0;

        let err = linear(vec![1.0; 10], 0.0).predict(&features).unwrap_err();
        assert_eq!(err.kind(), "prediction");
        assert!(err.to_string().contains("10 coefficients"));
    }

    #[test]
    fn test_absent_parameters_is_configuration_error() {
        let predictor = Predictor::new(Arc::new(ParameterStore::empty(
            "models/linear_regression_model.pkl",
        )));

        let err = predictor.predict(&sample()).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("models/linear_regression_model.pkl"));
    }

    #[test]
    fn test_full_model_receives_scaled_features() {
        let model = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            result: Some(72.5),
        });
        let store = ParameterStore::from_regressor(model.clone(), "model.pkl");
        let predictor = Predictor::new(Arc::new(store));

        assert_eq!(predictor.predict(&sample()).unwrap(), 72.5);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 21);
        assert!((seen[0] - 20.0 / 44.0).abs() < 1e-12);
        assert!((seen[3] - 0.25).abs() < 1e-12);
        assert_eq!(seen[5], 1.0);
    }

    #[test]
    fn test_full_model_failure_is_prediction_error() {
        let model = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            result: None,
        });
        let predictor = Predictor::new(Arc::new(ParameterStore::from_regressor(model, "model.pkl")));

        let err = predictor.predict(&sample()).unwrap_err();
        assert_eq!(err.kind(), "prediction");
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[test]
    fn test_non_finite_result_is_prediction_error() {
        let err = linear(vec![f64::NAN; 21], 0.0).predict(&sample()).unwrap_err();
        assert_eq!(err.kind(), "prediction");
    }

    #[test]
    fn test_repeated_predictions_identical() {
        let coefficients: Vec<f64> = (0..21).map(|i| (i as f64 - 10.0) * 0.7).collect();
        let predictor = linear(coefficients, 55.0);

        let first = predictor.predict(&sample()).unwrap();
        let second = predictor.predict(&sample()).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_random_valid_inputs_stay_in_range() {
        let mut rng = rand::thread_rng();
        let coefficients: Vec<f64> = (0..21).map(|_| rng.gen_range(-80.0..80.0)).collect();
        let predictor = linear(coefficients, rng.gen_range(-50.0..150.0));

        for _ in 0..500 {
            let mut features = vec![
                rng.gen_range(1..=44) as f64,
                rng.gen_range(60..=100) as f64,
                rng.gen_range(50..=100) as f64,
                rng.gen_range(0..=8) as f64,
            ];
            features.extend((0..17).map(|_| rng.gen_range(0..=1) as f64));

            let score = predictor.predict(&features).unwrap();
            assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
        }
    }
}
