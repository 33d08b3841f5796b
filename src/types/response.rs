//! Response bodies returned by the HTTP API

use crate::types::student::ExamScoreInput;
use serde::{Deserialize, Serialize};

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// Predicted score, rounded to two decimals
    pub predicted_exam_score: f64,
    pub status: String,
}

impl PredictionOutput {
    pub fn success(score: f64) -> Self {
        Self {
            predicted_exam_score: round2(score),
            status: "success".to_string(),
        }
    }
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Service metadata served at the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub features: usize,
    pub target: String,
    pub example_request: ExamScoreInput,
}

/// Liveness only; does not reflect whether a model was loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rounds_to_two_decimals() {
        let out = PredictionOutput::success(67.12789);
        assert_eq!(out.predicted_exam_score, 67.13);
        assert_eq!(out.status, "success");

        assert_eq!(PredictionOutput::success(100.0).predicted_exam_score, 100.0);
    }

    #[test]
    fn test_output_serialization() {
        let json = serde_json::to_value(PredictionOutput::success(2.0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"predicted_exam_score": 2.0, "status": "success"})
        );
    }

    #[test]
    fn test_health_body() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert_eq!(json, r#"{"status":"healthy"}"#);
    }
}
