//! Fine-tuning configuration loaded from JSON
//!
//! Every section falls back to its defaults when omitted, so a config file
//! only needs the values it changes.

use crate::dataloader::BatcherConfig;
use anyhow::{Context, Result};
use charnn_model::BigramConfig;
use charnn_tokenizer::VOCAB_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete fine-tuning configuration loaded from file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneConfigFile {
    /// Grid shape and window encoding
    pub batcher: BatcherConfig,
    /// Epochs, validation split and logging
    pub training: TrainingHyperparams,
    /// Model hyperparameters
    pub model: ModelHyperparams,
    /// Sample printed after fine-tuning
    pub generation: GenerationConfig,
}

/// Training loop hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingHyperparams {
    /// Epochs to fine-tune for
    pub num_epochs: usize,
    /// Fraction of the corpus, taken from its start, held out for validation
    pub val_split: f64,
    /// Logging interval (steps, 0 = disabled)
    pub log_interval: usize,
}

impl Default for TrainingHyperparams {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            val_split: 0.2,
            log_interval: 10,
        }
    }
}

/// Model hyperparameters used when a fresh base model is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelHyperparams {
    pub learning_rate: f32,
    pub smoothing: f32,
}

impl Default for ModelHyperparams {
    fn default() -> Self {
        let base = BigramConfig::default();
        Self {
            learning_rate: base.learning_rate,
            smoothing: base.smoothing,
        }
    }
}

impl ModelHyperparams {
    /// Model config over the full alphabet
    pub fn to_model_config(&self) -> BigramConfig {
        BigramConfig {
            vocab_size: VOCAB_SIZE,
            learning_rate: self.learning_rate,
            smoothing: self.smoothing,
        }
    }
}

/// Text generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Text used to prime the model
    pub seed_text: String,
    /// Characters to generate
    pub length: usize,
    /// Candidates kept per sampling step
    pub top_n: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed_text: "This is a seed sentence.".to_string(),
            length: 2048,
            top_n: 3,
        }
    }
}

impl Default for FineTuneConfigFile {
    fn default() -> Self {
        Self {
            batcher: BatcherConfig::default(),
            training: TrainingHyperparams::default(),
            model: ModelHyperparams::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl FineTuneConfigFile {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }
}
