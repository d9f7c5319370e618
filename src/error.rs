//! Error types for the pdf2chunks library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`] — **Fatal to the job**: processing cannot proceed at all
//!   (unreadable document, malformed job payload, no usable model). Returned
//!   as `Err(IngestError)` from the top-level entry points; the job runner
//!   maps these onto its ack/reject decision.
//!
//! * [`PageError`] — **Non-fatal**: a single window or page failed (render
//!   glitch, transient inference error) but the rest of the document is fine.
//!   Stored inside [`crate::output::PageResult`] so callers see partial
//!   success rather than losing the whole document to one bad page.
//!
//! Splitting failures have no variant here at all: the chunking stage absorbs
//! them internally by falling back to a coarser split, so no text is ever
//! dropped and nothing is surfaced to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2chunks library.
///
/// Window- and page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The page count could not be read; the document is not processable.
    ///
    /// Raised before any rendering begins so a broken upload never burns
    /// inference time.
    #[error("invalid document: {detail}")]
    InvalidDocument { detail: String },

    // ── Job errors ────────────────────────────────────────────────────────
    /// The job payload could not be parsed or is missing its object key.
    ///
    /// The runner acknowledges (drops) these: a payload that cannot be
    /// parsed today will not become valid on redelivery.
    #[error("malformed job payload: {detail}")]
    MalformedJob { detail: String },

    /// The object store could not deliver the document bytes.
    #[error("download failed for '{key}': {reason}")]
    DownloadFailed { key: String, reason: String },

    /// Writing chunks to the downstream sink failed.
    #[error("chunk sink error: {detail}")]
    SinkFailed { detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No usable vision model could be resolved at startup.
    ///
    /// Fatal to the worker process: a worker with no model must not accept
    /// jobs it can never complete.
    #[error("vision model unavailable (provider '{provider}'): {hint}")]
    ModelUnavailable { provider: String, hint: String },

    /// A configured model or projector file does not exist on disk.
    #[error("model file not found: '{path}'")]
    ModelFileNotFound { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error scoped to one window or one page.
///
/// Stored alongside [`crate::output::PageResult`]; the window stream keeps
/// producing subsequent windows after emitting one of these.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Rendering (or the surrounding window machinery) failed for a whole
    /// window of pages. The stream yields a single degraded result for the
    /// window and moves on.
    #[error("pages {start_page}-{end_page}: window processing failed: {detail}")]
    WindowFailed {
        start_page: usize,
        end_page: usize,
        detail: String,
    },

    /// The vision model failed to transcribe one page after all retries.
    /// The page keeps its slot in the batch with empty text.
    #[error("page {page}: transcription failed: {detail}")]
    TranscriptionFailed { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_document_display() {
        let e = IngestError::InvalidDocument {
            detail: "page count unreadable".into(),
        };
        assert!(e.to_string().contains("page count unreadable"));
    }

    #[test]
    fn window_failed_display() {
        let e = PageError::WindowFailed {
            start_page: 11,
            end_page: 21,
            detail: "render glitch".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("11-21"), "got: {msg}");
        assert!(msg.contains("render glitch"));
    }

    #[test]
    fn transcription_failed_roundtrips_through_serde() {
        let e = PageError::TranscriptionFailed {
            page: 3,
            detail: "timeout".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: PageError = serde_json::from_str(&json).unwrap();
        assert!(back.to_string().contains("page 3"));
    }
}
