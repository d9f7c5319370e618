//! Per-job orchestration: pull, download, stream, chunk, settle.
//!
//! ## State machine
//!
//! ```text
//! RECEIVED ──▶ DOWNLOADING ──▶ STREAMING(windows) ──▶ ACKNOWLEDGED
//!     │              │               │
//!     │ malformed    │ fetch failed  │ invalid doc / sink failed
//!     ▼              ▼               ▼
//! ACKNOWLEDGED    REJECTED        REJECTED
//! ```
//!
//! Malformed payloads are acknowledged — dropped — because a payload that
//! cannot be parsed will never become valid on redelivery. Everything else
//! that fails at job level is rejected without requeue; retry policy is the
//! dead-letter queue's business, not this worker's.
//!
//! Exactly one job is in flight per worker process. Throughput scales
//! horizontally: many worker processes competing on the same queue, each
//! with its own model and its own loop.

use crate::chunking::DocumentChunker;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::output::Document;
use crate::pipeline::render::PageRenderer;
use crate::pipeline::transcribe::VisionTranscriber;
use crate::stream::stream_windows;
use crate::worker::queue::{Disposition, JobQueue, JobSpec};
use crate::worker::sink::ChunkSink;
use crate::worker::storage::ObjectStore;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Every service handle a job needs, constructed once at startup.
///
/// No ambient globals: the context is passed by reference into the job loop
/// and owns the loaded model (via the transcriber) for the process lifetime.
pub struct WorkerContext {
    pub renderer: Arc<dyn PageRenderer>,
    pub transcriber: Arc<VisionTranscriber>,
    pub chunker: DocumentChunker,
    pub store: Arc<dyn ObjectStore>,
    pub sink: Arc<dyn ChunkSink>,
    pub config: IngestConfig,
}

/// What happened to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    pub disposition: Disposition,
    /// Page results seen across all windows (degraded ones included).
    pub pages: usize,
    /// Chunks produced and written to the sink.
    pub chunks: usize,
}

impl JobOutcome {
    fn settled(disposition: Disposition) -> Self {
        Self {
            disposition,
            pages: 0,
            chunks: 0,
        }
    }
}

/// Process one raw job payload end to end and decide its disposition.
pub async fn process_payload(ctx: &WorkerContext, payload: &[u8]) -> JobOutcome {
    let started = Instant::now();

    let job = match JobSpec::parse(payload) {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "dropping malformed job");
            return JobOutcome::settled(Disposition::Ack);
        }
    };
    info!(key = %job.key, "received job");

    let bucket = job
        .bucket
        .as_deref()
        .or(ctx.config.default_bucket.as_deref());
    let bytes = match ctx.store.fetch(bucket, &job.key).await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            let e = IngestError::DownloadFailed {
                key: job.key.clone(),
                reason: "object is empty".into(),
            };
            error!(error = %e, "rejecting job");
            return JobOutcome::settled(Disposition::Reject);
        }
        Err(e) => {
            let e = IngestError::DownloadFailed {
                key: job.key.clone(),
                reason: e.to_string(),
            };
            error!(error = %e, "rejecting job");
            return JobOutcome::settled(Disposition::Reject);
        }
    };

    let document = Document::new(job.source_name(), bytes);
    let mut stream = match stream_windows(
        Arc::clone(&ctx.renderer),
        Arc::clone(&ctx.transcriber),
        document,
        &ctx.config,
    )
    .await
    {
        Ok(stream) => stream,
        Err(e) => {
            error!(key = %job.key, error = %e, "cannot stream document");
            return JobOutcome::settled(Disposition::Reject);
        }
    };

    let mut pages = 0usize;
    let mut chunks = 0usize;
    while let Some(batch) = stream.next().await {
        pages += batch.len();
        let degraded = batch.iter().filter(|p| p.error.is_some()).count();
        if degraded > 0 {
            warn!(degraded, "window contained degraded pages");
        }

        let batch_chunks = ctx.chunker.chunk_batch(&batch).await;
        if let Err(e) = ctx.sink.write(&batch_chunks).await {
            let e = IngestError::SinkFailed {
                detail: e.to_string(),
            };
            error!(key = %job.key, error = %e, "abandoning job");
            return JobOutcome {
                disposition: Disposition::Reject,
                pages,
                chunks,
            };
        }
        chunks += batch_chunks.len();
    }

    info!(
        key = %job.key,
        pages,
        chunks,
        duration_ms = started.elapsed().as_millis() as u64,
        "job complete"
    );
    JobOutcome {
        disposition: Disposition::Ack,
        pages,
        chunks,
    }
}

/// The worker loop: one job at a time until the queue closes.
pub async fn run_worker<Q: JobQueue>(queue: &mut Q, ctx: &WorkerContext) {
    info!("worker started, waiting for jobs");
    while let Some(delivery) = queue.next().await {
        let outcome = process_payload(ctx, &delivery.payload).await;
        match outcome.disposition {
            Disposition::Ack => queue.ack(delivery.tag).await,
            Disposition::Reject => queue.reject(delivery.tag).await,
        }
    }
    info!("queue closed, worker exiting");
}
