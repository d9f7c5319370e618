//! Chunk sink seam: where finished chunks go.
//!
//! The vector-index writer is out of scope for this crate, but the runner
//! still needs somewhere to hand each window's chunks. [`ChunkSink`] is the
//! shape that future component must accept; [`NullSink`] stands in until it
//! exists.

use crate::output::Chunk;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Error surfaced by a [`ChunkSink`] implementation. Fatal to the job: a
/// sink that cannot accept chunks means completed work would be lost.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Receives each window's chunks as they are produced.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn write(&self, chunks: &[Chunk]) -> Result<(), SinkError>;
}

/// Discards chunks, logging the count. The stand-in until an index writer
/// is wired up.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl ChunkSink for NullSink {
    async fn write(&self, chunks: &[Chunk]) -> Result<(), SinkError> {
        debug!(chunks = chunks.len(), "discarding chunk batch (null sink)");
        Ok(())
    }
}
