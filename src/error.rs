//! Error types surfaced by the prediction core

use std::path::PathBuf;
use thiserror::Error;

/// Boxed inner cause carried by [`PredictError::Prediction`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single prediction request
#[derive(Debug, Error)]
pub enum PredictError {
    /// Neither a full model nor extracted parameters are available
    #[error("No trained model or extracted coefficients available. Expected file at {}", .artifact_path.display())]
    Configuration { artifact_path: PathBuf },

    /// Feature vector has the wrong shape
    #[error("Expected {expected} features, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    /// The underlying computation failed
    #[error("Model prediction failed: {0}")]
    Prediction(#[source] BoxError),
}

impl PredictError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Configuration { .. } => "configuration",
            PredictError::InvalidInput { .. } => "invalid_input",
            PredictError::Prediction(_) => "prediction",
        }
    }
}
