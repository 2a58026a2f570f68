//! Stateful batching and fine-tuning for charnn
//!
//! This crate provides:
//! - [`SequenceBatcher`]: a fixed grid of temporally-contiguous windows that
//!   keeps a stateful model's per-row hidden state valid across steps
//! - [`fine_tune`]: the epoch-driven loop with per-epoch validation and state reset
//! - Corpus providers, metrics, the run report and JSON configuration
//!
//! # Example
//!
//! ```no_run
//! use charnn_finetune::{fine_tune, split_validation, BatcherConfig, FineTuneConfig, SequenceBatcher};
//! use charnn_model::{BigramConfig, BigramModel};
//! use charnn_tokenizer::Tokenizer;
//!
//! let tokens = Tokenizer::new().encode(&std::fs::read_to_string("corpus.txt")?);
//! let (val, train) = split_validation(&tokens, 0.2)?;
//!
//! let mut train = SequenceBatcher::new(train, BatcherConfig::default())?;
//! let mut val = SequenceBatcher::new(val, BatcherConfig::default())?;
//! let mut model = BigramModel::new(BigramConfig::default());
//!
//! let config = FineTuneConfig { num_epochs: 3, batch_size: 64 };
//! let history = fine_tune(&mut model, &config, &mut train, &mut val, &mut ())?;
//! println!("best epoch: {:?}", history.best_validation());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod corpus;
pub mod dataloader;
pub mod logging;
pub mod metrics;
pub mod train;

pub use config::FineTuneConfigFile;
pub use corpus::{normalize_user, CorpusError, CorpusProvider, DirectoryCorpus, TweetServer};
pub use dataloader::{split_validation, Batch, BatchError, BatcherConfig, BatcherState, SequenceBatcher};
pub use metrics::{FineTuneReport, MetricsLogger};
pub use train::{
    fine_tune, EpochCallbacks, EpochRecord, FineTuneConfig, FineTuneError, LossHistory, Stage,
};
