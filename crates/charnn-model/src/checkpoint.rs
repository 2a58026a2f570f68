//! Checkpoint save/load functionality
//!
//! A checkpoint is two JSON files sharing a stem: `<path>.json` holds the
//! metadata (format version, model config, alphabet fingerprint, training
//! info) and `<path>.weights.json` holds the flattened weights.

use crate::{BigramConfig, BigramModel, StatefulModel};
use anyhow::{Context, Result};
use charnn_tokenizer::Alphabet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Checkpoint format version for compatibility checking
pub const CHECKPOINT_VERSION: &str = "1.0.0";

/// Checkpoint metadata containing training information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Completed fine-tune epochs
    pub epoch: usize,
    /// Validation loss at this checkpoint
    pub loss: Option<f32>,
    /// Additional metadata as key-value pairs
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize)]
struct WeightsFile {
    weights: Vec<f32>,
}

/// Save a bigram model checkpoint to disk
///
/// # Arguments
/// * `model` - The model to save
/// * `path` - Checkpoint stem; parent directories are created if needed
/// * `metadata` - Optional training metadata
///
/// # Errors
/// Returns an error if the directory cannot be created or a file cannot be written.
pub fn save_checkpoint<P: AsRef<Path>>(
    model: &BigramModel,
    path: P,
    metadata: Option<CheckpointMetadata>,
) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create checkpoint directory: {}", parent.display())
        })?;
    }

    let weights_path = path.with_extension("weights.json");
    let weights = serde_json::to_string(&WeightsFile {
        weights: model.weights(),
    })
    .context("Failed to serialize weights")?;
    fs::write(&weights_path, weights)
        .with_context(|| format!("Failed to write weights file: {}", weights_path.display()))?;

    let metadata = metadata.unwrap_or_default();
    let mut extra = metadata.extra;
    extra.insert("version".to_string(), CHECKPOINT_VERSION.into());
    extra.insert("config".to_string(), serde_json::to_value(model.config())?);
    extra.insert(
        "alphabet".to_string(),
        Alphabet::global().fingerprint().into(),
    );
    let metadata = CheckpointMetadata { extra, ..metadata };

    let metadata_path = path.with_extension("json");
    let json_data =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata to JSON")?;
    fs::write(&metadata_path, json_data)
        .with_context(|| format!("Failed to write metadata file: {}", metadata_path.display()))?;

    Ok(())
}

/// Load a bigram model checkpoint from disk
///
/// # Errors
/// Returns an error if a file cannot be read or parsed, the version differs
/// from [`CHECKPOINT_VERSION`], the checkpoint was built against a different
/// alphabet, or the weight count does not match the config.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<(BigramModel, CheckpointMetadata)> {
    let path = path.as_ref();

    let metadata_path = path.with_extension("json");
    let json_data = fs::read_to_string(&metadata_path)
        .with_context(|| format!("Failed to read metadata file: {}", metadata_path.display()))?;
    let metadata: CheckpointMetadata =
        serde_json::from_str(&json_data).context("Failed to parse metadata JSON")?;

    let version = metadata
        .extra
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing version in metadata"))?;
    if version != CHECKPOINT_VERSION {
        anyhow::bail!(
            "Checkpoint version mismatch: expected {}, got {}",
            CHECKPOINT_VERSION,
            version
        );
    }

    let alphabet = metadata
        .extra
        .get("alphabet")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing alphabet in metadata"))?;
    if alphabet != Alphabet::global().fingerprint() {
        anyhow::bail!(
            "Checkpoint {} was built against a different alphabet",
            path.display()
        );
    }

    let config_value = metadata
        .extra
        .get("config")
        .ok_or_else(|| anyhow::anyhow!("Missing config in metadata"))?;
    let config: BigramConfig = serde_json::from_value(config_value.clone())
        .context("Failed to parse config from metadata")?;
    if config.vocab_size != Alphabet::global().size() {
        anyhow::bail!(
            "Checkpoint vocabulary size {} does not match alphabet size {}",
            config.vocab_size,
            Alphabet::global().size()
        );
    }

    let weights_path = path.with_extension("weights.json");
    let weights_data = fs::read_to_string(&weights_path)
        .with_context(|| format!("Failed to read weights file: {}", weights_path.display()))?;
    let weights: WeightsFile =
        serde_json::from_str(&weights_data).context("Failed to parse weights JSON")?;

    let mut model = BigramModel::new(config);
    model
        .set_weights(&weights.weights)
        .context("Checkpoint weights do not match config")?;

    Ok((model, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_checkpoint_writes_both_files() {
        let model = BigramModel::new(BigramConfig::default());
        let temp_dir = TempDir::new().unwrap();
        let checkpoint_path = temp_dir.path().join("nested").join("model");

        save_checkpoint(&model, &checkpoint_path, None).unwrap();

        assert!(checkpoint_path.with_extension("json").exists());
        assert!(checkpoint_path.with_extension("weights.json").exists());
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_checkpoint(temp_dir.path().join("absent"));
        assert!(result.is_err());
    }
}
