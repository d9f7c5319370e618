//! Job-runner boundary: queue, object store and sink seams plus the
//! per-job orchestration loop.
//!
//! Everything external lives behind a trait here — the crate never speaks
//! AMQP or S3 itself. The runner wires the seams to the streaming controller
//! and chunker:
//!
//! ```text
//! JobQueue ──▶ JobSpec ──▶ ObjectStore ──▶ stream_windows ──▶ chunk_batch ──▶ ChunkSink
//!    ▲                                                                          │
//!    └────────────────────── ack / reject ◀────────────────────────────────────┘
//! ```

pub mod queue;
pub mod runner;
pub mod sink;
pub mod storage;

pub use queue::{Delivery, Disposition, JobQueue, JobSpec, ValidJob};
pub use runner::{process_payload, run_worker, JobOutcome, WorkerContext};
pub use sink::{ChunkSink, NullSink, SinkError};
pub use storage::{ObjectStore, StoreError};
