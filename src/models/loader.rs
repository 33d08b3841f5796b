//! Parameter store: the model state every prediction reads
//!
//! Built once at startup and never mutated afterwards, so request handlers
//! share it through an `Arc` without locking.

use crate::config::ModelConfig;
use crate::features::FEATURE_COUNT;
use crate::models::extractor::FallbackExtractor;
use crate::models::parameters::{ModelParameters, Regressor};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the store's predictions come from
#[derive(Clone)]
pub enum ModelSource {
    /// A complete model object, authoritative when present
    Regressor(Arc<dyn Regressor>),
    /// Coefficients recovered by the fallback extractor
    Linear(ModelParameters),
    /// Nothing usable was found
    Absent,
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Regressor(model) => write!(f, "Regressor({})", model.name()),
            ModelSource::Linear(params) => f
                .debug_struct("Linear")
                .field("coefficients", &params.coefficients.len())
                .field("intercept", &params.intercept)
                .finish(),
            ModelSource::Absent => write!(f, "Absent"),
        }
    }
}

/// Immutable holder of the model used for predictions
#[derive(Debug, Clone)]
pub struct ParameterStore {
    source: ModelSource,
    artifact_path: PathBuf,
}

impl ParameterStore {
    /// Populate the store from configuration.
    ///
    /// Tries the full model first, then the fallback extractor. Never fails:
    /// an empty store is a valid outcome and surfaces at prediction time.
    pub fn load(config: &ModelConfig) -> Self {
        let artifact_path = config.artifact_path.clone();

        if let Some(model) = load_full_model(config) {
            info!(model = %model.name(), "Using full model for predictions");
            return Self {
                source: ModelSource::Regressor(model),
                artifact_path,
            };
        }

        let extractor = FallbackExtractor::new(config.expected_features);
        match extractor.extract_from_path(&artifact_path) {
            Some(params) if params.feature_count() != FEATURE_COUNT => {
                warn!(
                    path = %artifact_path.display(),
                    coefficients = params.feature_count(),
                    expected = FEATURE_COUNT,
                    "Extracted coefficients do not match the feature vector, predictions will fail"
                );
                Self::empty(artifact_path)
            }
            Some(params) => {
                if !params.is_finite() {
                    warn!(
                        path = %artifact_path.display(),
                        "Extracted parameters contain non-finite values"
                    );
                }
                Self::from_parameters(params, artifact_path)
            }
            None => {
                warn!(
                    path = %artifact_path.display(),
                    "No model parameters available, predictions will fail"
                );
                Self::empty(artifact_path)
            }
        }
    }

    pub fn from_parameters(params: ModelParameters, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Linear(params),
            artifact_path: artifact_path.into(),
        }
    }

    pub fn from_regressor(model: Arc<dyn Regressor>, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Regressor(model),
            artifact_path: artifact_path.into(),
        }
    }

    pub fn empty(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Absent,
            artifact_path: artifact_path.into(),
        }
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Artifact location named in configuration errors
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self.source, ModelSource::Absent)
    }

    /// One-line description for startup logs
    pub fn describe(&self) -> String {
        match &self.source {
            ModelSource::Regressor(model) => format!("full model ({})", model.name()),
            ModelSource::Linear(params) => format!(
                "extracted linear parameters ({} coefficients)",
                params.feature_count()
            ),
            ModelSource::Absent => "no model".to_string(),
        }
    }
}

#[cfg(feature = "onnx")]
fn load_full_model(config: &ModelConfig) -> Option<Arc<dyn Regressor>> {
    let path = config.onnx_path.as_ref()?;
    if !path.exists() {
        warn!(path = %path.display(), "ONNX model file not found");
        return None;
    }

    match crate::models::onnx::OnnxRegressor::load(path, config.onnx_threads) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load ONNX model, using fallback extraction");
            None
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn load_full_model(config: &ModelConfig) -> Option<Arc<dyn Regressor>> {
    if let Some(path) = &config.onnx_path {
        warn!(
            path = %path.display(),
            "ONNX model configured but this build has no onnx support, using fallback extraction"
        );
    }
    None
}
