//! Request and response types for the exam score service

pub mod response;
pub mod student;

pub use response::{ErrorResponse, HealthResponse, PredictionOutput, ServiceInfo};
pub use student::{ExamScoreInput, ValidationError};
