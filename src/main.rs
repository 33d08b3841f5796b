//! Exam Score Prediction Service - Main Entry Point
//!
//! Loads the model artifact once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use exam_score_service::{
    api::{self, ApiState},
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    metrics::{MetricsReporter, PredictionMetrics},
    models::{ParameterStore, Predictor},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "exam-score-service", version, about = "Exam score prediction API")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "EXAM_SCORE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("exam_score_service={}", logging.level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    info!("Starting Exam Score Prediction Service");
    info!(config = %cli.config.display(), "Configuration loaded");

    // Parameters are read once here and never change afterwards
    let store = Arc::new(ParameterStore::load(&config.model));
    if store.is_ready() {
        info!(source = %store.describe(), "Model ready");
    } else {
        warn!(
            path = %store.artifact_path().display(),
            "Serving without a model, /predict will report a configuration error"
        );
    }

    let metrics = Arc::new(PredictionMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = ApiState::new(Predictor::new(store), metrics.clone());
    let app = api::router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
}
