//! Linear model parameters and the full-model seam

use anyhow::Result;

/// Coefficients and intercept of a fitted linear regressor
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl ModelParameters {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.coefficients.len()
    }

    /// `dot(features, coefficients) + intercept`, no length check
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        features
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept
    }

    /// Whether every coefficient and the intercept are finite
    pub fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite())
    }
}

/// A complete model object able to predict from scaled features
pub trait Regressor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Predict one target value from a scaled feature vector
    fn predict(&self, scaled: &[f64]) -> Result<f64>;
}

impl Regressor for ModelParameters {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict(&self, scaled: &[f64]) -> Result<f64> {
        if scaled.len() != self.coefficients.len() {
            anyhow::bail!(
                "model has {} coefficients but received {} features",
                self.coefficients.len(),
                scaled.len()
            );
        }
        Ok(self.evaluate(scaled))
    }
}
