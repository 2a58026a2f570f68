//! Model capability errors

use thiserror::Error;

/// Errors reported by a [`crate::StatefulModel`]
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failure inside an external model implementation, passed through as-is
    #[error("model capability failed: {0}")]
    Capability(String),

    #[error("window shape mismatch: inputs {inputs:?}, targets {targets:?}")]
    ShapeMismatch {
        inputs: Vec<usize>,
        targets: Vec<usize>,
    },

    #[error("unsupported window shape {shape:?} for vocabulary of {vocab_size}")]
    UnsupportedShape { shape: Vec<usize>, vocab_size: usize },

    #[error("token {token} out of range for vocabulary of {vocab_size}")]
    TokenOutOfRange { token: u32, vocab_size: usize },

    #[error("expected {expected} weights, got {actual}")]
    WeightCount { expected: usize, actual: usize },
}
