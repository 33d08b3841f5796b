//! Model loading and inference components

pub mod extractor;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod parameters;
pub mod pickle;
pub mod predictor;

pub use extractor::FallbackExtractor;
pub use loader::{ModelSource, ParameterStore};
pub use parameters::{ModelParameters, Regressor};
pub use predictor::Predictor;
