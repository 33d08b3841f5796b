//! Exam Score Prediction Service Library
//!
//! Predicts a student's exam score from 21 performance features using a
//! linear regression whose parameters are recovered from a pickled
//! scikit-learn artifact without unpickling it.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod types;

pub use config::AppConfig;
pub use error::PredictError;
pub use features::{FeatureExtractor, FEATURE_COUNT};
pub use models::{FallbackExtractor, ModelParameters, ParameterStore, Predictor};
pub use types::{ExamScoreInput, PredictionOutput};
