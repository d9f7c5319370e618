//! Pipeline stages for page extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a fake renderer in tests) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ transcribe ──▶ postprocess
//! (pdfium)   (base64)   (vision model)  (cleanup)
//! ```
//!
//! 1. [`render`]     — rasterise one window of pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`encode`]     — JPEG-encode and base64-wrap each `DynamicImage` for
//!    the multimodal request body
//! 3. [`transcribe`] — drive the vision-model call with retry/backoff; the
//!    only stage with network I/O
//! 4. [`postprocess`] — deterministic text cleanup of model quirks so the
//!    chunking stage sees well-formed Markdown

pub mod encode;
pub mod postprocess;
pub mod render;
pub mod transcribe;
