//! Chunk assembly: splitter output + page metadata → [`Chunk`]s with
//! stable ids.
//!
//! ## Why content-derived ids?
//!
//! Re-running ingestion over the same document must produce the same ids,
//! so the downstream index can upsert instead of accumulating duplicates.
//! The id digests `(source, page_num, first 50 chars of text)` — enough to
//! distinguish chunks in practice while staying independent of run order,
//! window size and wall-clock time. Two chunks whose first 50 characters
//! coincide on the same page collide; that is an accepted, bounded property
//! of the prefix scheme.

use crate::chunking::segment::SegmentSplitter;
use crate::chunking::structural::split_headers;
use crate::output::{Chunk, ChunkMetadata, PageResult};
use tracing::info;

/// Number of leading text characters fed into the chunk id digest.
const ID_PREFIX_CHARS: usize = 50;

/// Turns transcribed pages into retrieval-ready chunks.
///
/// Owns the configured [`SegmentSplitter`]; constructed once at worker
/// startup and shared by every job.
pub struct DocumentChunker {
    splitter: SegmentSplitter,
}

impl DocumentChunker {
    pub fn new(splitter: SegmentSplitter) -> Self {
        Self { splitter }
    }

    /// Chunk one page. Empty or whitespace-only page text produces zero
    /// chunks — a skip, not an error.
    pub async fn chunk_page(&self, page: &PageResult) -> Vec<Chunk> {
        if page.text.trim().is_empty() {
            return Vec::new();
        }

        let strategy = self.splitter.strategy().as_str().to_string();
        let mut chunks = Vec::new();

        for section in split_headers(&page.text) {
            let mut headers = [None, None, None];
            for (level, title) in &section.headers {
                headers[(*level - 1) as usize] = Some(title.clone());
            }
            let [header_1, header_2, header_3] = headers;

            for segment in self.splitter.split(&section.text).await {
                let id = chunk_id(&page.metadata.source, page.page_num, &segment);
                chunks.push(Chunk {
                    id,
                    text: segment,
                    metadata: ChunkMetadata {
                        source: page.metadata.source.clone(),
                        total_pages: page.metadata.total_pages,
                        page_num: page.page_num,
                        processed_at_dpi: page.metadata.processed_at_dpi,
                        chunk_strategy: strategy.clone(),
                        header_1: header_1.clone(),
                        header_2: header_2.clone(),
                        header_3: header_3.clone(),
                    },
                });
            }
        }

        chunks
    }

    /// Chunk one window's batch of pages, in page order.
    pub async fn chunk_batch(&self, batch: &[PageResult]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in batch {
            chunks.extend(self.chunk_page(page).await);
        }
        info!(
            pages = batch.len(),
            chunks = chunks.len(),
            "chunked page batch"
        );
        chunks
    }
}

/// Stable hex id for a chunk: digest of `"{source}-p{page}-{prefix}"`.
fn chunk_id(source: &str, page_num: usize, text: &str) -> String {
    let prefix: String = text.chars().take(ID_PREFIX_CHARS).collect();
    let raw = format!("{source}-p{page_num}-{prefix}");
    format!("{:016x}", seahash::hash(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::segment::SizeSplitter;
    use crate::output::PageMetadata;

    fn page(text: &str) -> PageResult {
        PageResult {
            page_num: 3,
            text: text.to_string(),
            metadata: PageMetadata {
                source: "report.pdf".into(),
                total_pages: 12,
                processed_at_dpi: 150,
            },
            error: None,
        }
    }

    fn size_chunker() -> DocumentChunker {
        DocumentChunker::new(SegmentSplitter::Size(SizeSplitter::new(1000, 200)))
    }

    #[test]
    fn id_is_deterministic_and_prefix_sensitive() {
        let a = chunk_id("doc.pdf", 1, "identical text");
        let b = chunk_id("doc.pdf", 1, "identical text");
        assert_eq!(a, b);

        assert_ne!(a, chunk_id("doc.pdf", 2, "identical text"));
        assert_ne!(a, chunk_id("other.pdf", 1, "identical text"));
        assert_ne!(a, chunk_id("doc.pdf", 1, "different text"));
    }

    #[test]
    fn id_ignores_text_past_the_prefix() {
        let head = "a".repeat(50);
        let a = chunk_id("doc.pdf", 1, &format!("{head} tail one"));
        let b = chunk_id("doc.pdf", 1, &format!("{head} tail two"));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_page_produces_zero_chunks() {
        let chunker = size_chunker();
        assert!(chunker.chunk_page(&page("")).await.is_empty());
        assert!(chunker.chunk_page(&page("   \n\t ")).await.is_empty());
    }

    #[tokio::test]
    async fn chunk_carries_merged_metadata() {
        let chunker = size_chunker();
        let chunks = chunker
            .chunk_page(&page("# Results\n\nThe experiment worked."))
            .await;
        assert_eq!(chunks.len(), 1);
        let meta = &chunks[0].metadata;
        assert_eq!(meta.source, "report.pdf");
        assert_eq!(meta.page_num, 3);
        assert_eq!(meta.total_pages, 12);
        assert_eq!(meta.processed_at_dpi, 150);
        assert_eq!(meta.chunk_strategy, "size");
        assert_eq!(meta.header_1.as_deref(), Some("Results"));
        assert!(meta.header_2.is_none());
    }

    #[tokio::test]
    async fn header_path_lands_in_metadata_per_section() {
        let chunker = size_chunker();
        let chunks = chunker
            .chunk_page(&page("# A\n\nalpha\n\n## B\n\nbeta"))
            .await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.header_1.as_deref(), Some("A"));
        assert!(chunks[0].metadata.header_2.is_none());
        assert_eq!(chunks[1].metadata.header_2.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn chunk_batch_is_deterministic() {
        let chunker = size_chunker();
        let batch = vec![page("# A\n\nalpha"), page("plain text page")];
        let first = chunker.chunk_batch(&batch).await;
        let second = chunker.chunk_batch(&batch).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn long_section_yields_multiple_ordered_chunks() {
        let chunker = DocumentChunker::new(SegmentSplitter::Size(SizeSplitter::new(100, 20)));
        let body: String = (1..=30)
            .map(|i| format!("sentence number {i} goes right here. "))
            .collect();
        let chunks = chunker.chunk_page(&page(&body)).await;
        assert!(chunks.len() > 1);
        let ids: std::collections::HashSet<_> = chunks.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), chunks.len(), "ids must be distinct");
    }
}
