//! HTTP acceptance tests for the prediction API
//!
//! Drives the router in-process with `oneshot`, no socket involved.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use exam_score_service::{
    api::{router, ApiState},
    config::ModelConfig,
    metrics::PredictionMetrics,
    ExamScoreInput, ModelParameters, ParameterStore, Predictor,
};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(store: ParameterStore) -> (Router, Arc<PredictionMetrics>) {
    let metrics = Arc::new(PredictionMetrics::new());
    let state = ApiState::new(Predictor::new(Arc::new(store)), metrics.clone());
    (router(state), metrics)
}

fn linear_app(coefficients: Vec<f64>, intercept: f64) -> (Router, Arc<PredictionMetrics>) {
    app_with(ParameterStore::from_parameters(
        ModelParameters::new(coefficients, intercept),
        "models/linear_regression_model.pkl",
    ))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_predict(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn example_body() -> Value {
    serde_json::to_value(ExamScoreInput::example()).unwrap()
}

/// Protocol 4 pickle holding a 21-float buffer and a 1-float buffer
fn pickle_artifact(coefficients: &[f64], intercept: f64) -> Vec<u8> {
    let mut data = vec![0x80, 4];
    data.extend_from_slice(b"csklearn.linear_model._base\nLinearRegression\n");
    data.extend_from_slice(&[b')', 0x81, b'}']);
    for block in [coefficients, &[intercept][..]] {
        let bytes: Vec<u8> = block.iter().flat_map(|v| v.to_le_bytes()).collect();
        data.push(b'C');
        data.push(bytes.len() as u8);
        data.extend_from_slice(&bytes);
    }
    data.extend_from_slice(&[b'b', b'.']);
    data
}

#[tokio::test]
async fn test_predict_success() {
    // 2 * attendance/100 + 40 = 41.7 for attendance 85
    let mut coefficients = vec![0.0; 21];
    coefficients[1] = 2.0;
    let (app, metrics) = linear_app(coefficients, 40.0);

    let (status, json) = send(app, post_predict(&example_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["predicted_exam_score"].as_f64(), Some(41.7));
    assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_predict_is_repeatable() {
    let coefficients: Vec<f64> = (0..21).map(|i| i as f64 * 1.3 - 8.0).collect();
    let (app, _) = linear_app(coefficients, 45.0);

    let (_, first) = send(app.clone(), post_predict(&example_body())).await;
    let (_, second) = send(app, post_predict(&example_body())).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_clamps_score() {
    let (app, _) = linear_app(vec![0.0; 21], 180.0);
    let (status, json) = send(app, post_predict(&example_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predicted_exam_score"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_predict_without_model_is_bad_request() {
    let (app, metrics) = app_with(ParameterStore::empty("models/linear_regression_model.pkl"));

    let (status, json) = send(app, post_predict(&example_body())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Prediction error: No trained model"));
    assert!(detail.contains("models/linear_regression_model.pkl"));
    assert_eq!(metrics.get_failures_by_kind().get("configuration"), Some(&1));
}

#[tokio::test]
async fn test_out_of_range_is_unprocessable() {
    let (app, metrics) = linear_app(vec![0.0; 21], 50.0);
    let mut body = example_body();
    body["hours_studied"] = json!(45);
    body["motivation_level_low"] = json!(-1);

    let (status, json) = send(app, post_predict(&body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("hours_studied must be between 1 and 44"));
    assert!(detail.contains("motivation_level_low"));
    assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_missing_field_is_unprocessable() {
    let (app, _) = linear_app(vec![0.0; 21], 50.0);
    let mut body = example_body();
    body.as_object_mut().unwrap().remove("attendance");

    let (status, json) = send(app, post_predict(&body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("attendance"));
}

#[tokio::test]
async fn test_unreadable_body_is_unprocessable() {
    let (app, metrics) = linear_app(vec![0.0; 21], 50.0);

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, json) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].is_string());

    // no content type at all
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from(example_body().to_string()))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_health_ignores_model_state() {
    let (app, _) = app_with(ParameterStore::empty("missing.pkl"));

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_root_describes_service() {
    let (app, _) = linear_app(vec![0.0; 21], 0.0);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["features"], 21);
    assert_eq!(json["target"], "exam_score");
    assert_eq!(json["example_request"]["hours_studied"], 20);
    assert_eq!(json["example_request"].as_object().unwrap().len(), 21);
}

#[tokio::test]
async fn test_store_loaded_from_pickle_serves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear_regression_model.pkl");
    let mut coefficients = vec![0.0; 21];
    coefficients[0] = 44.0; // hours_studied / 44 * 44 = hours_studied
    std::fs::write(&path, pickle_artifact(&coefficients, 10.0)).unwrap();

    let store = ParameterStore::load(&ModelConfig {
        artifact_path: path,
        ..ModelConfig::default()
    });
    assert!(store.is_ready());

    let (app, _) = app_with(store);
    let (status, json) = send(app, post_predict(&example_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predicted_exam_score"].as_f64(), Some(30.0));
}
