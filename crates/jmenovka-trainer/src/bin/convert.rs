use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use jmenovka_core::{read_corpus, resolve_records};
use tracing_subscriber::EnvFilter;

/// Parse and resolve a `<ne>`-annotated corpus into JSON Lines.
///
/// Each output line is `{"text": ..., "entities": [[start, end, label], ...]}`
/// with character offsets and no overlapping entities.
#[derive(Debug, Parser)]
#[command(name = "convert", version)]
struct Args {
    /// Corpus file, one annotated sentence per line.
    #[arg(default_value = "named_ent_xml_simple_cleared.txt", env = "JMENOVKA_INPUT")]
    input: PathBuf,

    /// Output file; standard output when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Conversion failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let records = resolve_records(read_corpus(&args.input)?);

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(records = records.len(), "corpus converted");
    Ok(())
}
