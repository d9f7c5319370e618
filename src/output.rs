//! Data model of the pipeline: documents, page windows, per-page results
//! and the terminal [`Chunk`] type handed to downstream indexing.
//!
//! Everything here is plain data. The batching machinery lives in
//! [`crate::stream`], the chunking logic in [`crate::chunking`]; these types
//! are the contract between them and the shape future components (the vector
//! index writer) must accept.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// An in-memory document awaiting extraction.
///
/// Created when the job runner downloads the object, discarded when the job
/// completes. The byte buffer is shared behind an [`Arc`] so window
/// processing can hand it to blocking render tasks without copying.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source name carried into every chunk's metadata, normally the
    /// object-storage key's basename.
    pub source: String,
    /// Raw document bytes.
    pub bytes: Arc<Vec<u8>>,
}

impl Document {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// A contiguous, half-open range `[start_page, end_page)` of 1-indexed pages.
///
/// Windows are computed once per document, never overlap, and their union
/// covers `1..=total_pages` exactly. Batching is a memory detail, not a
/// semantic one: the same pages come out whatever the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start_page: usize,
    pub end_page: usize,
}

impl PageWindow {
    /// Partition a document into windows of at most `window_size` pages.
    pub fn partition(total_pages: usize, window_size: usize) -> Vec<PageWindow> {
        let step = window_size.max(1);
        (1..=total_pages)
            .step_by(step)
            .map(|start_page| PageWindow {
                start_page,
                end_page: (start_page + step).min(total_pages + 1),
            })
            .collect()
    }

    /// Number of pages in this window.
    pub fn len(&self) -> usize {
        self.end_page - self.start_page
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The 1-indexed page numbers covered by this window.
    pub fn pages(&self) -> Range<usize> {
        self.start_page..self.end_page
    }
}

/// Document-level metadata attached to every page result and inherited by
/// every chunk built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Source name (object key basename).
    pub source: String,
    /// Total pages in the document.
    pub total_pages: usize,
    /// DPI the page was rasterised at.
    pub processed_at_dpi: u32,
}

/// The transcription outcome for a single page.
///
/// Produced exactly once per page, in increasing page order within a window
/// and across windows, and immutable once produced. A failed page still
/// occupies its slot: `text` is empty and `error` says why, so partial
/// extraction is visible instead of silently shrinking the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Extracted Markdown, possibly empty.
    pub text: String,
    /// Inherited document metadata.
    pub metadata: PageMetadata,
    /// Set when this page (or its whole window) failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

/// A retrieval-ready text unit with a stable content-derived identifier.
///
/// The terminal entity of this crate; ownership passes to the downstream
/// index writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Hex digest of `(source, page_num, text prefix)` — identical input
    /// always yields the identical id across re-runs.
    pub id: String,
    /// Segment text.
    pub text: String,
    /// Merged page + structural metadata.
    pub metadata: ChunkMetadata,
}

/// Metadata carried by every chunk.
///
/// Flattened to a plain mapping on serialisation so downstream indexers see
/// `{source, total_pages, page_num, processed_at_dpi, chunk_strategy,
/// header_1..header_3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub total_pages: usize,
    pub page_num: usize,
    pub processed_at_dpi: u32,
    /// Which segment splitter produced this chunk: `"size"` or `"semantic"`.
    pub chunk_strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_3: Option<String>,
}
