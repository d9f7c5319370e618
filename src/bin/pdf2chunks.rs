//! CLI binary for pdf2chunks.
//!
//! A thin shim over the library crate: reads a local PDF, drives the
//! window stream and chunker, and writes chunks as JSON lines. Useful for
//! smoke-testing a deployment's model configuration without a queue.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use pdf2chunks::{
    chunking::{DocumentChunker, SegmentSplitter, SizeSplitter},
    pipeline::render::{PageRenderer, PdfiumRenderer},
    pipeline::transcribe::VisionTranscriber,
    stream::stream_windows,
    ChunkStrategy, Document, IngestConfig,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pdf2chunks",
    version,
    about = "Extract a PDF with a vision model and emit retrieval chunks as JSON lines"
)]
struct Cli {
    /// Path to the PDF file to ingest.
    input: PathBuf,

    /// Write chunks to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pages rendered and transcribed per window.
    #[arg(long, default_value_t = 10)]
    window_size: usize,

    /// Render resolution in DPI (72–400).
    #[arg(long, default_value_t = 150)]
    dpi: u32,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Character overlap between consecutive chunks.
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    /// Segment-splitting strategy. `semantic` needs an embedder and is
    /// only available through the library API.
    #[arg(long, value_enum, default_value = "size")]
    strategy: StrategyArg,

    /// Provider name (openai, anthropic, ollama, …). Auto-detected from the
    /// environment when omitted.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier, e.g. gpt-4.1-nano.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Print the page count and window plan, then exit without touching
    /// the model.
    #[arg(long)]
    inspect_only: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Size,
    Semantic,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = IngestConfig::builder()
        .window_size(cli.window_size)
        .dpi(cli.dpi)
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap);
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    let config = builder.build()?;

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("cannot read '{}'", cli.input.display()))?;
    let source = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());

    let renderer = Arc::new(PdfiumRenderer::new());

    if cli.inspect_only {
        let total = renderer
            .page_count(&bytes)
            .context("cannot read page count")?;
        let windows = total.div_ceil(config.window_size);
        println!(
            "{source}: {total} pages, {windows} windows of ≤{} pages at {} DPI",
            config.window_size, config.dpi
        );
        return Ok(());
    }

    let splitter = match cli.strategy {
        StrategyArg::Size => {
            SegmentSplitter::Size(SizeSplitter::new(config.chunk_size, config.chunk_overlap))
        }
        StrategyArg::Semantic => bail!(
            "the {} strategy needs an embedding function; construct a \
             SemanticSplitter through the library API",
            ChunkStrategy::Semantic
        ),
    };
    let chunker = DocumentChunker::new(splitter);

    // Model resolution is fatal: without a model there is nothing to run.
    let transcriber =
        Arc::new(VisionTranscriber::from_config(&config).context("cannot resolve vision model")?);

    let mut out: Box<dyn Write> = match cli.output {
        Some(ref path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("cannot create '{}'", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    let started = Instant::now();
    let document = Document::new(source.clone(), bytes);
    let mut windows = stream_windows(renderer, transcriber, document, &config).await?;

    let mut pages = 0usize;
    let mut degraded = 0usize;
    let mut total_chunks = 0usize;
    while let Some(batch) = windows.next().await {
        pages += batch.len();
        degraded += batch.iter().filter(|p| p.error.is_some()).count();
        for chunk in chunker.chunk_batch(&batch).await {
            serde_json::to_writer(&mut out, &chunk)?;
            out.write_all(b"\n")?;
            total_chunks += 1;
        }
        eprintln!(
            "  {} {}",
            green("✓"),
            dim(&format!("{pages} pages, {total_chunks} chunks so far")),
        );
    }
    out.flush()?;

    eprintln!(
        "{} {} — {} pages ({} degraded), {} chunks in {:.1}s",
        green("✔"),
        bold(&source),
        pages,
        degraded,
        total_chunks,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
