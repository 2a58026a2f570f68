//! Stateful sequence batching
//!
//! The token stream is truncated and laid out as a `(batch_size, length)`
//! grid whose rows are disjoint contiguous slices of the stream. Window `i`
//! of every row forms training step `i`, so row `r` of step `i + 1` is the
//! literal continuation of row `r` of step `i`. A stateful model can then
//! carry per-row hidden state from one step to the next, and across epochs,
//! because the grid is never reshuffled.

use aprender::autograd::Tensor;
use charnn_tokenizer::VOCAB_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while building or driving a batcher
#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
    #[error(
        "insufficient data: {len} tokens cannot fill one window of {batch_size} x {seq_len}"
    )]
    InsufficientData {
        len: usize,
        batch_size: usize,
        seq_len: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Grid shape and window encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Number of parallel rows per step
    pub batch_size: usize,
    /// Window width along the time axis
    pub seq_len: usize,
    /// Expand input windows to `[batch, seq, vocab]` one-hot
    pub one_hot_features: bool,
    /// Expand target windows to `[batch, seq, vocab]` one-hot
    pub one_hot_labels: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            seq_len: 64,
            one_hot_features: false,
            one_hot_labels: true,
        }
    }
}

/// Batcher cursor for checkpointing
///
/// Restoring it resumes at the same window of the same epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatcherState {
    /// Next window to hand out; equal to the window count at the end of an epoch
    pub window: usize,
    /// Completed passes over all windows
    pub epoch: usize,
}

/// One training step: a feature window, its label window and where it sits
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub inputs: &'a Tensor,
    pub targets: &'a Tensor,
    pub epoch: usize,
    pub window: usize,
}

/// Infinite, restartable source of training windows
///
/// The grid is built once in [`SequenceBatcher::new`]; afterwards only the
/// cursor (window index, epoch) moves.
pub struct SequenceBatcher {
    config: BatcherConfig,
    num_batches: usize,
    effective_len: usize,
    windows: Vec<(Tensor, Tensor)>,
    window: usize,
    epoch: usize,
}

impl SequenceBatcher {
    /// Lay out `tokens` as a grid of windows
    ///
    /// # Arguments
    /// * `tokens` - Token ids in `[0, VOCAB_SIZE)`
    /// * `config` - Grid shape and window encoding
    ///
    /// # Errors
    /// * [`BatchError::InvalidArgument`] if `batch_size` or `seq_len` is 0, their
    ///   product overflows, or a token is out of range while one-hot encoding
    ///   is requested
    /// * [`BatchError::InsufficientData`] if `tokens` cannot fill a single step
    pub fn new(tokens: &[u32], config: BatcherConfig) -> Result<Self, BatchError> {
        let BatcherConfig {
            batch_size,
            seq_len,
            one_hot_features,
            one_hot_labels,
        } = config;

        if batch_size == 0 || seq_len == 0 {
            return Err(BatchError::InvalidArgument(format!(
                "batch_size and seq_len must be positive, got {batch_size} x {seq_len}"
            )));
        }
        if one_hot_features || one_hot_labels {
            if let Some(&token) = tokens.iter().find(|&&t| t as usize >= VOCAB_SIZE) {
                return Err(BatchError::InvalidArgument(format!(
                    "token {token} out of range for one-hot encoding over {VOCAB_SIZE} symbols"
                )));
            }
        }

        let step_tokens = batch_size.checked_mul(seq_len).ok_or_else(|| {
            BatchError::InvalidArgument(format!(
                "window of {batch_size} x {seq_len} tokens overflows usize"
            ))
        })?;
        let num_batches = tokens.len().saturating_sub(1) / step_tokens;
        if num_batches == 0 {
            return Err(BatchError::InsufficientData {
                len: tokens.len(),
                batch_size,
                seq_len,
            });
        }

        let effective_len = num_batches * step_tokens;
        let row_len = num_batches * seq_len;
        info!(num_batches, "number of batches");
        info!(
            effective_len,
            dropped = tokens.len() - 1 - effective_len,
            "effective text length"
        );

        let windows = (0..num_batches)
            .map(|i| {
                let mut inputs = Vec::with_capacity(step_tokens);
                let mut targets = Vec::with_capacity(step_tokens);
                for r in 0..batch_size {
                    let start = r * row_len + i * seq_len;
                    inputs.extend_from_slice(&tokens[start..start + seq_len]);
                    targets.extend_from_slice(&tokens[start + 1..start + seq_len + 1]);
                }
                (
                    encode_window(&inputs, batch_size, seq_len, one_hot_features),
                    encode_window(&targets, batch_size, seq_len, one_hot_labels),
                )
            })
            .collect();

        Ok(Self {
            config,
            num_batches,
            effective_len,
            windows,
            window: 0,
            epoch: 0,
        })
    }

    /// Next window of the current epoch, `None` once every window was handed out
    ///
    /// Call [`SequenceBatcher::advance_epoch`] to start the next pass.
    pub fn next_window(&mut self) -> Option<Batch<'_>> {
        if self.window >= self.num_batches {
            return None;
        }
        let index = self.window;
        self.window += 1;
        Some(self.batch_at(index))
    }

    /// Rewind to window 0 and bump the epoch counter
    pub fn advance_epoch(&mut self) {
        info!("epoch {} finished", self.epoch);
        self.window = 0;
        self.epoch += 1;
    }

    /// Next window, wrapping into the next epoch when the current one is done
    ///
    /// Never runs dry: for epoch 0, 1, 2, ... it yields windows
    /// `0..num_batches` in order.
    pub fn next_batch(&mut self) -> Batch<'_> {
        if self.window >= self.num_batches {
            self.advance_epoch();
        }
        let index = self.window;
        self.window += 1;
        self.batch_at(index)
    }

    fn batch_at(&self, index: usize) -> Batch<'_> {
        let (inputs, targets) = &self.windows[index];
        Batch {
            inputs,
            targets,
            epoch: self.epoch,
            window: index,
        }
    }

    /// Number of windows per epoch
    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    /// Tokens covered by the grid after truncation
    pub fn effective_len(&self) -> usize {
        self.effective_len
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn seq_len(&self) -> usize {
        self.config.seq_len
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Rewind to window 0 of epoch 0
    pub fn reset(&mut self) {
        self.window = 0;
        self.epoch = 0;
    }

    /// Get current state for checkpointing
    pub fn get_state(&self) -> BatcherState {
        BatcherState {
            window: self.window,
            epoch: self.epoch,
        }
    }

    /// Restore a cursor taken with [`SequenceBatcher::get_state`]
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidArgument`] if the window lies past the grid.
    pub fn restore_state(&mut self, state: BatcherState) -> Result<(), BatchError> {
        if state.window > self.num_batches {
            return Err(BatchError::InvalidArgument(format!(
                "window {} out of range for {} windows",
                state.window, self.num_batches
            )));
        }
        debug!(window = state.window, epoch = state.epoch, "restoring batcher state");
        self.window = state.window;
        self.epoch = state.epoch;
        Ok(())
    }
}

/// Encode a window as `[batch, seq]` ids or `[batch, seq, VOCAB_SIZE]` one-hot
fn encode_window(ids: &[u32], batch_size: usize, seq_len: usize, one_hot: bool) -> Tensor {
    if one_hot {
        let mut data = vec![0.0f32; ids.len() * VOCAB_SIZE];
        for (i, &id) in ids.iter().enumerate() {
            data[i * VOCAB_SIZE + id as usize] = 1.0;
        }
        Tensor::new(&data, &[batch_size, seq_len, VOCAB_SIZE])
    } else {
        let data: Vec<f32> = ids.iter().map(|&id| id as f32).collect();
        Tensor::new(&data, &[batch_size, seq_len])
    }
}

/// Split `tokens` into `(validation, training)`
///
/// The validation part is the first `floor(len * val_split)` tokens.
///
/// # Errors
/// Returns [`BatchError::InvalidArgument`] if `val_split` is outside `[0, 1)`.
pub fn split_validation(tokens: &[u32], val_split: f64) -> Result<(&[u32], &[u32]), BatchError> {
    if !(0.0..1.0).contains(&val_split) {
        return Err(BatchError::InvalidArgument(format!(
            "val_split must be in [0, 1), got {val_split}"
        )));
    }
    let val_len = (tokens.len() as f64 * val_split).floor() as usize;
    Ok(tokens.split_at(val_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_config(batch_size: usize, seq_len: usize) -> BatcherConfig {
        BatcherConfig {
            batch_size,
            seq_len,
            one_hot_features: false,
            one_hot_labels: false,
        }
    }

    #[test]
    fn test_num_batches_uses_len_minus_one() {
        // 2 * 3 = 6 tokens per step; 13 tokens give (13 - 1) / 6 = 2 steps
        let tokens: Vec<u32> = (0..13).collect();
        let batcher = SequenceBatcher::new(&tokens, ids_config(2, 3)).unwrap();
        assert_eq!(batcher.num_batches(), 2);
        assert_eq!(batcher.effective_len(), 12);

        // 12 tokens leave no room for the final target
        let tokens: Vec<u32> = (0..12).collect();
        let batcher = SequenceBatcher::new(&tokens, ids_config(2, 3)).unwrap();
        assert_eq!(batcher.num_batches(), 1);
    }

    #[test]
    fn test_zero_shape_rejected() {
        let tokens: Vec<u32> = (0..20).collect();
        assert!(matches!(
            SequenceBatcher::new(&tokens, ids_config(0, 3)),
            Err(BatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_shape_rejected() {
        let tokens: Vec<u32> = (0..50).collect();
        assert!(matches!(
            SequenceBatcher::new(&tokens, ids_config(usize::MAX / 2 + 1, 2)),
            Err(BatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_one_hot_rejects_out_of_range() {
        let tokens = vec![1, 2, 3, VOCAB_SIZE as u32, 4, 5];
        let config = BatcherConfig {
            batch_size: 1,
            seq_len: 2,
            one_hot_features: true,
            one_hot_labels: false,
        };
        assert!(matches!(
            SequenceBatcher::new(&tokens, config),
            Err(BatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_split_validation_bounds() {
        let tokens: Vec<u32> = (0..10).collect();
        assert!(split_validation(&tokens, 1.0).is_err());
        assert!(split_validation(&tokens, -0.1).is_err());

        let (val, train) = split_validation(&tokens, 0.0).unwrap();
        assert!(val.is_empty());
        assert_eq!(train.len(), 10);
    }
}
