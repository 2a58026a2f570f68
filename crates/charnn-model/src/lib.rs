//! Stateful model capability for charnn
//!
//! This crate provides:
//! - The [`StatefulModel`] trait the fine-tune loop and the generator drive
//! - [`ModelError`], the error every model capability reports
//! - [`BigramModel`], a reference next-character model over the fixed alphabet
//! - Checkpoint save/load with alphabet validation
//!
//! # Example
//!
//! ```no_run
//! use charnn_model::{BigramConfig, BigramModel, StatefulModel, save_checkpoint};
//!
//! let mut model = BigramModel::new(BigramConfig::default());
//! model.reset_state()?;
//! let probs = model.predict(3)?;
//! assert_eq!(probs.len(), model.vocab_size());
//!
//! save_checkpoint(&model, "models/base/model", None)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bigram;
pub mod checkpoint;
pub mod config;
pub mod error;

pub use aprender::autograd::Tensor;
pub use bigram::BigramModel;
pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointMetadata, CHECKPOINT_VERSION};
pub use config::BigramConfig;
pub use error::ModelError;

/// A sequence model whose hidden state persists across calls
///
/// `reset_state` clears the recurrent state; every `predict`, `fit` and
/// `evaluate` call advances it. Callers own the ordering: a single model must
/// not be driven by two loops at once.
pub trait StatefulModel {
    /// Number of symbols the model predicts over
    fn vocab_size(&self) -> usize;

    /// Clear the recurrent hidden state
    fn reset_state(&mut self) -> Result<(), ModelError>;

    /// Feed one token and return the next-token probability vector
    fn predict(&mut self, token: u32) -> Result<Vec<f32>, ModelError>;

    /// One optimisation step over a single window, returning its loss
    fn fit(&mut self, inputs: &Tensor, targets: &Tensor) -> Result<f32, ModelError>;

    /// Loss over a single window without updating weights
    fn evaluate(&mut self, inputs: &Tensor, targets: &Tensor) -> Result<f32, ModelError>;

    /// Flattened copy of all trainable weights
    fn weights(&self) -> Vec<f32>;

    /// Replace all trainable weights
    fn set_weights(&mut self, weights: &[f32]) -> Result<(), ModelError>;
}
