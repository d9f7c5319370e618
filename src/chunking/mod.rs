//! Two-stage chunk segmentation: structural split, segment split, assembly.
//!
//! ## Data Flow
//!
//! ```text
//! PageResult ──▶ structural ──▶ segment ──▶ assemble ──▶ Vec<Chunk>
//!  (markdown)    (headers)      (size |      (ids +
//!                               semantic)     metadata)
//! ```
//!
//! 1. [`structural`] — partition a page's Markdown along header boundaries,
//!    keeping the header lines in the section body so embeddings retain
//!    section context
//! 2. [`segment`]    — divide each section into retrieval-sized pieces,
//!    either by bounded character count or by topic coherence
//! 3. [`assemble`]   — merge page and structural metadata and mint stable
//!    content-derived chunk ids
//!
//! Every stage degrades instead of erroring: a section that cannot be split
//! finer travels through whole. Text is never dropped.

pub mod assemble;
pub mod segment;
pub mod structural;

pub use assemble::DocumentChunker;
pub use segment::{EmbedError, Embedder, SegmentSplitter, SemanticSplitter, SizeSplitter};
pub use structural::{split_headers, Section};
