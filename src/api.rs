//! HTTP surface: routing, input validation and error translation

use crate::error::PredictError;
use crate::features::{FeatureExtractor, FEATURE_COUNT};
use crate::metrics::PredictionMetrics;
use crate::models::predictor::Predictor;
use crate::types::{ErrorResponse, ExamScoreInput, HealthResponse, PredictionOutput, ServiceInfo};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    predictor: Predictor,
    extractor: FeatureExtractor,
    metrics: Arc<PredictionMetrics>,
}

impl ApiState {
    pub fn new(predictor: Predictor, metrics: Arc<PredictionMetrics>) -> Self {
        Self {
            predictor,
            extractor: FeatureExtractor::new(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }
}

/// Build the service router with permissive CORS
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Exam Score Prediction API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: FEATURE_COUNT,
        target: "exam_score".to_string(),
        example_request: ExamScoreInput::example(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn predict(
    State(state): State<ApiState>,
    payload: Result<Json<ExamScoreInput>, JsonRejection>,
) -> Result<Json<PredictionOutput>, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected malformed prediction request");
        // every body problem, syntax or shape, is an unprocessable request
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    input.validate().map_err(|e| {
        warn!(error = %e, "Prediction request out of range");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(e.to_string())),
        )
    })?;

    let features = state.extractor.extract(&input);
    debug!(features = ?features, "Received prediction request");

    let started = Instant::now();
    match state.predictor.predict(&features) {
        Ok(score) => {
            let latency = started.elapsed();
            state.metrics.record_prediction(latency, score);
            info!(
                score = score,
                latency_us = latency.as_micros() as u64,
                "Prediction served"
            );
            Ok(Json(PredictionOutput::success(score)))
        }
        Err(e) => {
            state.metrics.record_failure(e.kind());
            warn!(kind = e.kind(), error = %e, "Prediction failed");
            Err(prediction_error(&e))
        }
    }
}

fn prediction_error(e: &PredictError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!("Prediction error: {}", e))),
    )
}
