//! Fine-tuning binary

use anyhow::{Context, Result};
use charnn_finetune::logging::init_logging;
use charnn_finetune::{
    fine_tune, normalize_user, split_validation, CorpusProvider, DirectoryCorpus,
    FineTuneConfig, FineTuneConfigFile, FineTuneReport, MetricsLogger, SequenceBatcher,
    TweetServer,
};
use charnn_generate::generate_text;
use charnn_model::{load_checkpoint, save_checkpoint, BigramModel, CheckpointMetadata};
use charnn_tokenizer::Tokenizer;
use clap::{ArgGroup, Parser};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for fine-tuning
#[derive(Parser, Debug)]
#[command(name = "charnn-finetune")]
#[command(about = "Fine-tune a character-level model on one user's text")]
#[command(group(ArgGroup::new("source").required(true).args(["corpus_dir", "tweet_server"])))]
struct Args {
    /// User whose text to fine-tune on (a leading @ is ignored)
    #[arg(long, short = 'u')]
    user: String,

    /// Directory holding <user>.txt corpora
    #[arg(long)]
    corpus_dir: Option<PathBuf>,

    /// Base URL of a tweet server (e.g. http://localhost:3000)
    #[arg(long)]
    tweet_server: Option<String>,

    /// Base model checkpoint stem
    #[arg(long, short = 'm')]
    base_model: PathBuf,

    /// Create a fresh base checkpoint if none exists at --base-model
    #[arg(long)]
    init_base: bool,

    /// Output directory; the model lands in <output-dir>/<user>/
    #[arg(long, short = 'o', default_value = "./checkpoints")]
    output_dir: PathBuf,

    /// Path to JSON config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Override the generation seed text
    #[arg(long)]
    seed_text: Option<String>,

    /// Override the number of generated characters
    #[arg(long)]
    length: Option<usize>,

    /// Override the candidates kept per sampling step
    #[arg(long)]
    top_n: Option<usize>,

    /// Seed for the random source (entropy when omitted)
    #[arg(long)]
    rng_seed: Option<u64>,
}

fn load_config(args: &Args) -> Result<FineTuneConfigFile> {
    let mut config = match &args.config {
        Some(path) => FineTuneConfigFile::from_file(path)?,
        None => FineTuneConfigFile::default(),
    };
    if let Some(epochs) = args.epochs {
        config.training.num_epochs = epochs;
    }
    if let Some(seed_text) = &args.seed_text {
        config.generation.seed_text = seed_text.clone();
    }
    if let Some(length) = args.length {
        config.generation.length = length;
    }
    if let Some(top_n) = args.top_n {
        config.generation.top_n = top_n;
    }
    Ok(config)
}

fn load_base_model(args: &Args, config: &FineTuneConfigFile) -> Result<BigramModel> {
    let metadata_path = args.base_model.with_extension("json");
    if !metadata_path.exists() && args.init_base {
        warn!(
            "No base model at {}, creating a fresh one",
            args.base_model.display()
        );
        let model = BigramModel::new(config.model.to_model_config());
        save_checkpoint(&model, &args.base_model, None)?;
        return Ok(model);
    }

    info!("Loading base model from {:?}", args.base_model);
    let (model, _metadata) = load_checkpoint(&args.base_model).with_context(|| {
        format!(
            "Failed to load base model {}",
            args.base_model.display()
        )
    })?;
    Ok(model)
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = load_config(&args)?;
    let user = normalize_user(&args.user).to_string();

    let provider: Box<dyn CorpusProvider> = match (&args.corpus_dir, &args.tweet_server) {
        (Some(dir), _) => Box::new(DirectoryCorpus::new(dir)),
        (None, Some(url)) => Box::new(TweetServer::new(url)?),
        (None, None) => anyhow::bail!("Either --corpus-dir or --tweet-server is required"),
    };
    let text = provider
        .load(&user)
        .with_context(|| format!("Error loading text for {user}"))?;

    let tokenizer = Tokenizer::new();
    let tokens = tokenizer.encode(&text);
    info!(chars = tokens.len(), "corpus encoded");

    let (val_tokens, train_tokens) = split_validation(&tokens, config.training.val_split)?;
    let mut train = SequenceBatcher::new(train_tokens, config.batcher.clone())
        .context("Failed to batch training split")?;
    let mut validation = SequenceBatcher::new(val_tokens, config.batcher.clone())
        .context("Failed to batch validation split")?;

    let mut model = load_base_model(&args, &config)?;

    let tune_config = FineTuneConfig {
        num_epochs: config.training.num_epochs,
        batch_size: config.batcher.batch_size,
    };
    let mut metrics = MetricsLogger::new(config.training.log_interval);
    let history = fine_tune(
        &mut model,
        &tune_config,
        &mut train,
        &mut validation,
        &mut metrics,
    )
    .context("Fine-tuning failed")?;

    let save_dir = args.output_dir.join(&user);
    let checkpoint_path = save_dir.join("model");
    let mut extra = HashMap::new();
    extra.insert("user".to_string(), serde_json::Value::String(user.clone()));
    extra.insert(
        "base_model".to_string(),
        serde_json::Value::String(args.base_model.display().to_string()),
    );
    let metadata = CheckpointMetadata {
        epoch: history.len(),
        loss: history.last().map(|r| r.val_loss),
        extra,
    };
    save_checkpoint(&model, &checkpoint_path, Some(metadata))?;
    info!("Saved fine-tuned model to {}", checkpoint_path.display());

    let report = FineTuneReport::generate_report(&user, &history, metrics.avg_epoch_seconds());
    let report_path = save_dir.join("report.json");
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    println!("{}", report.to_markdown());

    let mut rng = match args.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generated = generate_text(
        &mut model,
        &config.generation.seed_text,
        config.generation.length,
        config.generation.top_n,
        &mut rng,
    )
    .context("Generation failed")?;
    println!("{generated}");

    Ok(())
}
