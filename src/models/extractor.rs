//! Fallback recovery of linear model parameters from a pickle artifact
//!
//! A fitted scikit-learn `LinearRegression` stores `coef_` and `intercept_`
//! as numpy buffers, which pickle writes as raw byte strings. This module
//! lifts every byte string that could be a little-endian `f64` buffer and
//! picks the parameters by length, without unpickling anything.

use crate::models::parameters::ModelParameters;
use crate::models::pickle::{OpcodeReader, PickleError};
use std::path::Path;
use tracing::{debug, info, warn};

/// A byte-string operand reinterpreted as little-endian `f64`s
#[derive(Debug, Clone, PartialEq)]
pub struct FloatBlock {
    /// Offset of the opcode that carried the buffer
    pub offset: usize,
    pub values: Vec<f64>,
}

impl FloatBlock {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Every candidate float buffer in the artifact, in stream order.
///
/// Byte strings whose length is not a multiple of 8 are skipped.
pub fn float_blocks(data: &[u8]) -> Result<Vec<FloatBlock>, PickleError> {
    let mut blocks = Vec::new();

    for op in OpcodeReader::new(data) {
        let op = op?;
        let Some(bytes) = op.byte_string() else {
            continue;
        };
        if bytes.len() % 8 != 0 {
            continue;
        }

        let values = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect();

        blocks.push(FloatBlock {
            offset: op.pos,
            values,
        });
    }

    Ok(blocks)
}

/// Outcome of the length-based selection over a block list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub coefficients: Option<FloatBlock>,
    pub intercept: Option<FloatBlock>,
    /// Offsets of every single-value block, selected or not
    pub scalar_offsets: Vec<usize>,
}

impl Selection {
    /// Both parameters, if both were found
    pub fn parameters(&self) -> Option<ModelParameters> {
        match (&self.coefficients, &self.intercept) {
            (Some(coef), Some(intercept)) => Some(ModelParameters {
                coefficients: coef.values.clone(),
                intercept: intercept.values[0],
            }),
            _ => None,
        }
    }

    /// More than one scalar buffer was present, so the intercept pick is a guess
    pub fn intercept_ambiguous(&self) -> bool {
        self.scalar_offsets.len() > 1
    }
}

/// Pick coefficients and intercept in encounter order.
///
/// The first block of `expected_features` values becomes the coefficients;
/// otherwise the first single-value block becomes the intercept. Later
/// blocks of an already-filled length are ignored.
pub fn select(blocks: &[FloatBlock], expected_features: usize) -> Selection {
    let mut selection = Selection::default();

    for block in blocks {
        if block.len() == 1 {
            selection.scalar_offsets.push(block.offset);
        }

        if block.len() == expected_features && selection.coefficients.is_none() {
            selection.coefficients = Some(block.clone());
        } else if block.len() == 1 && selection.intercept.is_none() {
            selection.intercept = Some(block.clone());
        }
    }

    selection
}

/// Recovers [`ModelParameters`] from serialized artifacts
#[derive(Debug, Clone, Copy)]
pub struct FallbackExtractor {
    expected_features: usize,
}

impl FallbackExtractor {
    pub fn new(expected_features: usize) -> Self {
        Self { expected_features }
    }

    pub fn expected_features(&self) -> usize {
        self.expected_features
    }

    /// Scan an artifact and select its parameters.
    ///
    /// Malformed streams are reported as `Err`; use [`Self::extract`] when
    /// only success or absence matters.
    pub fn scan(&self, data: &[u8]) -> Result<Selection, PickleError> {
        let blocks = float_blocks(data)?;
        debug!(blocks = blocks.len(), "Scanned artifact for float buffers");
        Ok(select(&blocks, self.expected_features))
    }

    /// Parameters embedded in `data`, or `None` if they cannot be recovered
    pub fn extract(&self, data: &[u8]) -> Option<ModelParameters> {
        let selection = match self.scan(data) {
            Ok(selection) => selection,
            Err(e) => {
                warn!(error = %e, "Artifact is not a readable pickle stream");
                return None;
            }
        };

        if selection.intercept_ambiguous() {
            warn!(
                candidates = ?selection.scalar_offsets,
                "Several scalar buffers in artifact, using the first as intercept"
            );
        }

        let parameters = selection.parameters();
        if parameters.is_none() {
            warn!(
                expected_features = self.expected_features,
                coefficients_found = selection.coefficients.is_some(),
                intercept_found = selection.intercept.is_some(),
                "Artifact does not contain a complete parameter set"
            );
        }
        parameters
    }

    /// Read and extract an artifact file; unreadable files yield `None`
    pub fn extract_from_path<P: AsRef<Path>>(&self, path: P) -> Option<ModelParameters> {
        let path = path.as_ref();
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read model artifact");
                return None;
            }
        };

        let parameters = self.extract(&data)?;
        info!(
            path = %path.display(),
            coefficients = parameters.coefficients.len(),
            intercept = parameters.intercept,
            "Extracted linear model parameters from artifact"
        );
        Some(parameters)
    }
}
