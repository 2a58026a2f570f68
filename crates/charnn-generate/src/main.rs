//! Text generation binary

use anyhow::{Context, Result};
use charnn_generate::{generate_text, generated_lines, DEFAULT_TOP_N};
use charnn_model::load_checkpoint;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for generation
#[derive(Parser, Debug)]
#[command(name = "charnn-generate")]
#[command(about = "Generate text from a charnn checkpoint")]
struct Args {
    /// Checkpoint stem (without the .json extension)
    #[arg(long, short = 'm')]
    checkpoint: PathBuf,

    /// Text used to prime the model
    #[arg(long, short = 's', default_value = "This is a seed sentence.")]
    seed_text: String,

    /// Number of characters to generate
    #[arg(long, short = 'l', default_value_t = 2048)]
    length: usize,

    /// Candidates kept per sampling step
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Seed for the random source (entropy when omitted)
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Print whole generated lines only, dropping the cut-off first and last lines
    #[arg(long)]
    lines: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,charnn_generate=info,charnn_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Loading model from {:?}", args.checkpoint);
    let (mut model, metadata) = load_checkpoint(&args.checkpoint)
        .with_context(|| format!("Failed to load checkpoint {}", args.checkpoint.display()))?;
    info!(epoch = metadata.epoch, loss = ?metadata.loss, "Model loaded");

    let mut rng = match args.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let text = generate_text(
        &mut model,
        &args.seed_text,
        args.length,
        args.top_n,
        &mut rng,
    )
    .context("Generation failed")?;

    if args.lines {
        for line in generated_lines(&text) {
            println!("{line}");
        }
    } else {
        println!("{text}");
    }

    Ok(())
}
