use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::Context;
use candle_core::Device;
use clap::Parser;
use jmenovka_trainer::Pipeline;
use tracing_subscriber::EnvFilter;

/// Tag entities in plain-text lines with a trained pipeline.
#[derive(Debug, Parser)]
#[command(name = "predict", version)]
struct Args {
    /// Directory written by `train`.
    #[arg(short, long, default_value = "cs_ner", env = "JMENOVKA_MODEL")]
    model: PathBuf,

    /// Text to tag; lines are read from standard input when none are given.
    text: Vec<String>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Prediction failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let device = Device::cuda_if_available(0)?;
    let nlp = Pipeline::from_disk(&args.model, device)
        .with_context(|| format!("cannot load pipeline from {}", args.model.display()))?;
    tracing::info!(lang = nlp.lang(), pipes = ?nlp.pipe_names(), "pipeline loaded");

    if args.text.is_empty() {
        for line in io::stdin().lock().lines() {
            print_entities(&nlp, &line?)?;
        }
    } else {
        for text in &args.text {
            print_entities(&nlp, text)?;
        }
    }
    Ok(())
}

fn print_entities(nlp: &Pipeline, text: &str) -> anyhow::Result<()> {
    let spans = nlp.predict(text)?;
    let found: Vec<String> = spans
        .iter()
        .map(|s| {
            let surface: String = text.chars().skip(s.start).take(s.end - s.start).collect();
            format!("{surface}\t{}", s.label)
        })
        .collect();

    println!("{text}");
    for entity in found {
        println!("  {entity}");
    }
    Ok(())
}
