//! Artifact Inspector
//!
//! Scans a model artifact the way the service does at startup and reports
//! what it found, then runs the sample request through the result.

use anyhow::{Context, Result};
use clap::Parser;
use exam_score_service::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    models::{extractor, FallbackExtractor, ParameterStore, Predictor},
    ExamScoreInput, FeatureExtractor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "inspect-artifact", about = "Inspect a pickled regressor artifact")]
struct Cli {
    /// Configuration file supplying the artifact path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Artifact to scan, overriding the configured path
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Print every candidate float buffer
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inspect_artifact=info".parse()?)
                .add_directive("exam_score_service=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    if let Some(artifact) = cli.artifact {
        config.model.artifact_path = artifact;
    }
    let path = &config.model.artifact_path;

    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!(path = %path.display(), bytes = data.len(), "Artifact read");

    let blocks = extractor::float_blocks(&data).context("Artifact is not a readable pickle")?;
    info!(candidates = blocks.len(), "Float buffers found");
    if cli.verbose {
        for block in &blocks {
            info!(offset = block.offset, len = block.len(), "  candidate");
        }
    }

    let selection = extractor::select(&blocks, config.model.expected_features);
    match &selection.coefficients {
        Some(coef) => info!(offset = coef.offset, len = coef.len(), values = ?coef.values, "Coefficients"),
        None => warn!(expected = config.model.expected_features, "No coefficient buffer of expected length"),
    }
    match &selection.intercept {
        Some(intercept) => info!(offset = intercept.offset, value = intercept.values[0], "Intercept"),
        None => warn!("No scalar buffer for the intercept"),
    }
    if selection.intercept_ambiguous() {
        warn!(
            offsets = ?selection.scalar_offsets,
            "Several scalar buffers present, intercept choice is the first one"
        );
    }

    let Some(params) = FallbackExtractor::new(config.model.expected_features).extract(&data) else {
        anyhow::bail!("No usable parameters in {}", path.display());
    };

    let predictor = Predictor::new(Arc::new(ParameterStore::from_parameters(
        params,
        path.clone(),
    )));
    let features = FeatureExtractor::new().extract(&ExamScoreInput::example());
    let score = predictor.predict(&features)?;
    info!(features = ?features, score = score, "Sample prediction");

    Ok(())
}
