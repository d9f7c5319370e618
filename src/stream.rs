//! Batch streaming controller: pull-based, memory-bounded window streaming.
//!
//! ## Why stream in windows?
//!
//! A vision model reads one page in seconds, so a large document takes
//! minutes and its rasterised pages would take gigabytes. The controller
//! renders and transcribes in fixed-size windows: at most `window_size`
//! images exist at any moment, and every window's images are dropped before
//! the next window starts rendering.
//!
//! ## Why pull-based?
//!
//! The stream is built with `stream::iter(windows).then(..)`, so a window's
//! future is only created — and its rendering only starts — when the caller
//! polls for it. Between windows the producer is suspended; the consumer
//! (chunking, indexing) sets the pace and back-pressure needs no queue-depth
//! counter.
//!
//! ## Failure semantics
//!
//! Page-count failure aborts before any rendering
//! ([`IngestError::InvalidDocument`]). After that nothing aborts the stream:
//! a window whose rendering fails yields one degraded [`PageResult`] with
//! `error` set, a page whose transcription fails keeps its slot with empty
//! text, and the next window is produced regardless.

use crate::config::IngestConfig;
use crate::error::{IngestError, PageError};
use crate::output::{Document, PageMetadata, PageResult, PageWindow};
use crate::pipeline::encode;
use crate::pipeline::render::PageRenderer;
use crate::pipeline::transcribe::VisionTranscriber;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of per-window page-result batches.
pub type WindowStream = Pin<Box<dyn Stream<Item = Vec<PageResult>> + Send>>;

/// Stream a document's pages as transcribed batches, one window at a time.
///
/// Windows arrive in increasing page order and cover the document exactly
/// once. The stream is finite and non-restartable; drop it to abandon the
/// remaining windows.
///
/// # Errors
/// [`IngestError::InvalidDocument`] when the page count cannot be read —
/// raised before any rendering begins.
pub async fn stream_windows(
    renderer: Arc<dyn PageRenderer>,
    transcriber: Arc<VisionTranscriber>,
    document: Document,
    config: &IngestConfig,
) -> Result<WindowStream, IngestError> {
    let bytes = Arc::clone(&document.bytes);

    // Fast page-count probe, no rendering.
    let probe_renderer = Arc::clone(&renderer);
    let probe_bytes = Arc::clone(&bytes);
    let total_pages =
        tokio::task::spawn_blocking(move || probe_renderer.page_count(&probe_bytes))
            .await
            .map_err(|e| IngestError::Internal(format!("page-count task panicked: {e}")))?
            .map_err(|e| IngestError::InvalidDocument {
                detail: e.to_string(),
            })?;

    if total_pages == 0 {
        return Err(IngestError::InvalidDocument {
            detail: "document has no pages".into(),
        });
    }

    info!(
        source = %document.source,
        total_pages,
        window_size = config.window_size,
        "starting page stream"
    );

    let windows = PageWindow::partition(total_pages, config.window_size);
    let metadata = PageMetadata {
        source: document.source.clone(),
        total_pages,
        processed_at_dpi: config.dpi,
    };
    let dpi = config.dpi;
    let max_edge = config.max_render_pixels;

    let s = stream::iter(windows).then(move |window| {
        let renderer = Arc::clone(&renderer);
        let transcriber = Arc::clone(&transcriber);
        let bytes = Arc::clone(&bytes);
        let metadata = metadata.clone();
        async move {
            process_window(renderer, transcriber, bytes, window, dpi, max_edge, metadata).await
        }
    });

    Ok(Box::pin(s))
}

/// Render, encode and transcribe one window of pages.
///
/// All window-local state (rasters, encoded images) lives inside this call
/// and is dropped before it returns, which is what bounds peak memory to one
/// window.
async fn process_window(
    renderer: Arc<dyn PageRenderer>,
    transcriber: Arc<VisionTranscriber>,
    bytes: Arc<Vec<u8>>,
    window: PageWindow,
    dpi: u32,
    max_edge: u32,
    metadata: PageMetadata,
) -> Vec<PageResult> {
    debug!(
        start_page = window.start_page,
        end_page = window.end_page,
        "rendering window"
    );

    let render_bytes = Arc::clone(&bytes);
    let rendered = tokio::task::spawn_blocking(move || {
        renderer.render_window(&render_bytes, window, dpi, max_edge)
    })
    .await;

    let images = match rendered {
        Ok(Ok(images)) if images.len() == window.len() => images,
        Ok(Ok(images)) => {
            return vec![degraded(
                window,
                metadata,
                format!(
                    "renderer returned {} images for a {}-page window",
                    images.len(),
                    window.len()
                ),
            )];
        }
        Ok(Err(e)) => {
            warn!(
                start_page = window.start_page,
                end_page = window.end_page,
                error = %e,
                "window rendering failed, continuing with next window"
            );
            return vec![degraded(window, metadata, e.to_string())];
        }
        Err(join_err) => {
            warn!(
                start_page = window.start_page,
                error = %join_err,
                "render task panicked, continuing with next window"
            );
            return vec![degraded(window, metadata, format!("render task panicked: {join_err}"))];
        }
    };

    let mut results = Vec::with_capacity(images.len());
    for (offset, image) in images.into_iter().enumerate() {
        let page_num = window.start_page + offset;
        let encoded = encode::encode_page(&image);
        // The raster is not needed past this point; release it before the
        // slow inference call.
        drop(image);

        let transcribed = match encoded {
            Ok(data) => transcriber.transcribe(page_num, data).await,
            Err(e) => Err(PageError::TranscriptionFailed {
                page: page_num,
                detail: format!("image encoding failed: {e}"),
            }),
        };

        results.push(match transcribed {
            Ok(text) => PageResult {
                page_num,
                text,
                metadata: metadata.clone(),
                error: None,
            },
            Err(e) => {
                warn!(page = page_num, error = %e, "page degraded to empty text");
                PageResult {
                    page_num,
                    text: String::new(),
                    metadata: metadata.clone(),
                    error: Some(e),
                }
            }
        });
    }

    results
}

/// The single error-flagged result emitted for a window that failed as a whole.
fn degraded(window: PageWindow, metadata: PageMetadata, detail: String) -> PageResult {
    PageResult {
        page_num: window.start_page,
        text: String::new(),
        metadata,
        error: Some(PageError::WindowFailed {
            start_page: window.start_page,
            end_page: window.end_page,
            detail,
        }),
    }
}
