use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use jmenovka_core::{TrainingConfig, run_pipeline};
use jmenovka_trainer::CandleTrainer;
use tracing_subscriber::EnvFilter;

/// Train a Czech named-entity recognizer from a `<ne>`-annotated corpus.
#[derive(Debug, Parser)]
#[command(name = "train", version)]
struct Args {
    /// Corpus file, one annotated sentence per line.
    #[arg(default_value = "named_ent_xml_simple_cleared.txt", env = "JMENOVKA_INPUT")]
    input: PathBuf,

    /// Directory the trained pipeline is written to.
    #[arg(short, long, default_value = "cs_ner", env = "JMENOVKA_OUTPUT")]
    output: PathBuf,

    #[arg(long, default_value_t = 100, env = "JMENOVKA_EPOCHS")]
    epochs: usize,

    #[arg(long, default_value_t = 100, env = "JMENOVKA_BATCH_SIZE")]
    batch_size: usize,

    #[arg(long, default_value_t = 0.2, env = "JMENOVKA_DROPOUT")]
    dropout: f32,

    #[arg(long, default_value_t = 0.001, env = "JMENOVKA_LEARNING_RATE")]
    learning_rate: f64,

    /// Language code recorded with the saved pipeline.
    #[arg(long, default_value = "cs", env = "JMENOVKA_LANG")]
    lang: String,

    /// Seed for the per-epoch shuffle.
    #[arg(long, default_value_t = 0, env = "JMENOVKA_SEED")]
    seed: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Training failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = TrainingConfig::new()
        .with_lang(args.lang)
        .with_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_dropout(args.dropout)
        .with_learning_rate(args.learning_rate)
        .with_seed(args.seed)
        .with_output_dir(args.output);

    let mut trainer = CandleTrainer::new();
    let artifact = run_pipeline(&args.input, &mut trainer, &config)
        .with_context(|| format!("training on {} failed", args.input.display()))?;

    if let Some(loss) = artifact.final_loss() {
        tracing::info!(loss, labels = artifact.labels.len(), "training finished");
    }
    Ok(())
}
