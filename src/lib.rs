//! # pdf2chunks
//!
//! Memory-bounded PDF ingestion worker: vision-model page extraction and
//! retrieval chunking.
//!
//! ## Why this crate?
//!
//! Traditional PDF-to-text tools (pdftotext, pdf-extract) fail on complex
//! layouts — multi-column text, tables, and figures come out garbled or out
//! of reading order. This crate rasterises each page and lets a vision
//! language model read it as a human would, then splits the resulting
//! Markdown into retrieval-ready chunks with stable, content-derived
//! identifiers. Because inference is slow and rasters are big, the whole
//! pipeline streams in fixed-size page windows: peak memory is bounded by
//! one window, and one bad window degrades instead of killing the job.
//!
//! ## Pipeline Overview
//!
//! ```text
//! job {bucket, key}
//!  │
//!  ├─ 1. Fetch      object store → document bytes
//!  ├─ 2. Stream     render + transcribe W pages at a time (pull-based)
//!  │       ├─ Render      rasterise one window via pdfium (spawn_blocking)
//!  │       ├─ Encode      JPEG → base64 ImageData
//!  │       ├─ Transcribe  vision model → Markdown (retry, degrade on failure)
//!  │       └─ Polish      deterministic Markdown cleanup
//!  ├─ 3. Chunk      header split → size/semantic segments → stable ids
//!  └─ 4. Settle     sink chunks, ack/reject the job
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2chunks::{
//!     chunking::{DocumentChunker, SegmentSplitter, SizeSplitter},
//!     pipeline::render::PdfiumRenderer,
//!     pipeline::transcribe::VisionTranscriber,
//!     stream::stream_windows,
//!     Document, IngestConfig,
//! };
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = IngestConfig::default();
//!     let transcriber = Arc::new(VisionTranscriber::from_config(&config)?);
//!     let chunker = DocumentChunker::new(SegmentSplitter::Size(SizeSplitter::new(
//!         config.chunk_size,
//!         config.chunk_overlap,
//!     )));
//!
//!     let bytes = std::fs::read("document.pdf")?;
//!     let document = Document::new("document.pdf", bytes);
//!     let mut windows = stream_windows(
//!         Arc::new(PdfiumRenderer::new()),
//!         transcriber,
//!         document,
//!         &config,
//!     )
//!     .await?;
//!
//!     while let Some(batch) = windows.next().await {
//!         for chunk in chunker.chunk_batch(&batch).await {
//!             println!("{} {}", chunk.id, chunk.metadata.page_num);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2chunks` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the worker as a library:
//! ```toml
//! pdf2chunks = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chunking;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod stream;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chunking::DocumentChunker;
pub use config::{ChunkStrategy, IngestConfig, IngestConfigBuilder};
pub use error::{IngestError, PageError};
pub use output::{Chunk, ChunkMetadata, Document, PageMetadata, PageResult, PageWindow};
pub use stream::{stream_windows, WindowStream};
pub use worker::{run_worker, JobOutcome, WorkerContext};
