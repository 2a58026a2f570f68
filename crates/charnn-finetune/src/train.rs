//! Epoch-driven fine-tuning loop

use crate::dataloader::SequenceBatcher;
use charnn_model::{ModelError, StatefulModel};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Fine-tuning loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineTuneConfig {
    /// Epochs to complete before returning
    pub num_epochs: usize,
    /// Rows per step; must match both batchers
    pub batch_size: usize,
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            batch_size: 64,
        }
    }
}

/// Losses recorded at one epoch boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Number of completed epochs
    pub epoch: usize,
    /// Loss of the training step that crossed the boundary
    pub train_loss: f32,
    /// Loss on one validation window
    pub val_loss: f32,
}

/// Per-epoch losses of one fine-tune run, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    records: Vec<EpochRecord>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    pub fn train_losses(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.val_loss).collect()
    }

    /// Record with the lowest validation loss, the earliest one on ties
    pub fn best_validation(&self) -> Option<&EpochRecord> {
        self.records.iter().fold(None, |best, r| match best {
            Some(b) if b.val_loss <= r.val_loss => Some(b),
            _ => Some(r),
        })
    }
}

/// Model call that failed inside the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reset,
    Fit,
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Reset => write!(f, "reset"),
            Stage::Fit => write!(f, "fit"),
            Stage::Evaluate => write!(f, "evaluate"),
        }
    }
}

/// Errors that abort a fine-tune run
#[derive(Debug, Error)]
pub enum FineTuneError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A model call failed; `history` holds every epoch completed before it
    #[error("model {stage} failed during epoch {epoch}: {source}")]
    Model {
        stage: Stage,
        epoch: usize,
        history: LossHistory,
        #[source]
        source: ModelError,
    },
}

impl FineTuneError {
    /// Loss history accumulated before the failure, if any
    pub fn history(&self) -> Option<&LossHistory> {
        match self {
            FineTuneError::Model { history, .. } => Some(history),
            FineTuneError::InvalidArgument(_) => None,
        }
    }
}

/// Hooks invoked by [`fine_tune`]; every method defaults to a no-op
pub trait EpochCallbacks {
    /// When an epoch starts, with the batcher's epoch index
    ///
    /// For the first epoch this fires before any step. For later epochs it
    /// fires after `on_epoch_end`, by which time the window that crossed the
    /// boundary has already been fitted and reported through `on_step_end`
    /// under the new epoch index.
    fn on_epoch_begin(&mut self, _epoch: usize) {}

    /// After every training step
    fn on_step_end(&mut self, _epoch: usize, _step: usize, _loss: f32) {}

    /// After validation and state reset at an epoch boundary
    fn on_epoch_end(&mut self, _record: &EpochRecord) {}
}

impl EpochCallbacks for () {}

/// Fine-tune `model` one window at a time until `num_epochs` epochs completed
///
/// Model state is reset once up front. Each step pulls the next window from
/// `train` and fits it. When the batcher reports a new epoch, one window is
/// pulled from `validation` and evaluated, the losses are recorded and model
/// state is reset. The loop returns once the completed epoch count reaches
/// `num_epochs`, so it always ends on a boundary.
///
/// # Arguments
/// * `model` - Model to train in place
/// * `config` - Epoch count and expected batch size
/// * `train` - Training windows
/// * `validation` - Validation windows, one consumed per epoch
/// * `callbacks` - Epoch hooks, `&mut ()` for none
///
/// # Errors
/// [`FineTuneError::InvalidArgument`] on a zero epoch count or batch size
/// mismatch; [`FineTuneError::Model`] on the first model failure, carrying the
/// history built so far. Nothing is retried.
pub fn fine_tune<M: StatefulModel + ?Sized>(
    model: &mut M,
    config: &FineTuneConfig,
    train: &mut SequenceBatcher,
    validation: &mut SequenceBatcher,
    callbacks: &mut dyn EpochCallbacks,
) -> Result<LossHistory, FineTuneError> {
    if config.num_epochs == 0 {
        return Err(FineTuneError::InvalidArgument(
            "num_epochs must be at least 1".to_string(),
        ));
    }
    for (name, batcher) in [("training", &*train), ("validation", &*validation)] {
        if batcher.batch_size() != config.batch_size {
            return Err(FineTuneError::InvalidArgument(format!(
                "{name} batcher has batch size {}, expected {}",
                batcher.batch_size(),
                config.batch_size
            )));
        }
    }

    let mut history = LossHistory::new();
    let mut last_epoch = train.epoch();
    let mut step = 0usize;

    model.reset_state().map_err(|source| FineTuneError::Model {
        stage: Stage::Reset,
        epoch: last_epoch,
        history: history.clone(),
        source,
    })?;
    callbacks.on_epoch_begin(last_epoch);

    loop {
        let batch = train.next_batch();
        let epoch = batch.epoch;

        let train_loss = match model.fit(batch.inputs, batch.targets) {
            Ok(loss) => loss,
            Err(source) => {
                return Err(FineTuneError::Model {
                    stage: Stage::Fit,
                    epoch,
                    history,
                    source,
                })
            }
        };
        step += 1;
        debug!(epoch, window = batch.window, loss = train_loss, "training step");
        callbacks.on_step_end(epoch, step, train_loss);

        if epoch != last_epoch {
            let val = validation.next_batch();
            let val_loss = match model.evaluate(val.inputs, val.targets) {
                Ok(loss) => loss,
                Err(source) => {
                    return Err(FineTuneError::Model {
                        stage: Stage::Evaluate,
                        epoch,
                        history,
                        source,
                    })
                }
            };
            info!(
                "Epoch: {}, Training loss: {}, Validation loss: {}",
                epoch, train_loss, val_loss
            );

            let record = EpochRecord {
                epoch,
                train_loss,
                val_loss,
            };
            history.push(record);

            if let Err(source) = model.reset_state() {
                return Err(FineTuneError::Model {
                    stage: Stage::Reset,
                    epoch,
                    history,
                    source,
                });
            }
            last_epoch = epoch;
            callbacks.on_epoch_end(&record);

            if history.len() >= config.num_epochs {
                return Ok(history);
            }
            callbacks.on_epoch_begin(epoch);
        }
    }
}
