//! Reference model configuration

use charnn_tokenizer::VOCAB_SIZE;
use serde::{Deserialize, Serialize};

/// Bigram model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigramConfig {
    /// Vocabulary size (must match the alphabet)
    pub vocab_size: usize,
    /// SGD step size applied in `fit`
    pub learning_rate: f32,
    /// Label smoothing mass spread uniformly over the vocabulary
    pub smoothing: f32,
}

impl Default for BigramConfig {
    fn default() -> Self {
        Self {
            vocab_size: VOCAB_SIZE,
            learning_rate: 1.0,
            smoothing: 0.0,
        }
    }
}
