//! Job-queue seam and job payload parsing.
//!
//! The transport (AMQP, SQS, …) is an external collaborator; this module
//! defines only what the runner needs: pull one delivery, settle it with an
//! ack or a reject. The queue's one-job-at-a-time delivery policy is the
//! pipeline's backpressure — a worker does not see job N+1 until it settles
//! job N.

use crate::error::IngestError;
use async_trait::async_trait;
use serde::Deserialize;

/// A job message as consumed from the queue.
///
/// `{"bucket": "...", "key": "..."}`; `bucket` falls back to the configured
/// default when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl JobSpec {
    /// Parse and validate a raw payload.
    ///
    /// A payload that is not JSON, or that lacks a non-empty `key`, is
    /// [`IngestError::MalformedJob`] — the runner drops such jobs with an
    /// ack because redelivery can never make them valid.
    pub fn parse(payload: &[u8]) -> Result<ValidJob, IngestError> {
        let spec: JobSpec =
            serde_json::from_slice(payload).map_err(|e| IngestError::MalformedJob {
                detail: format!("not a JSON job object: {e}"),
            })?;
        match spec.key {
            Some(key) if !key.trim().is_empty() => Ok(ValidJob {
                bucket: spec.bucket,
                key,
            }),
            _ => Err(IngestError::MalformedJob {
                detail: "missing file key".into(),
            }),
        }
    }
}

/// A parsed job with its mandatory key present.
#[derive(Debug, Clone)]
pub struct ValidJob {
    pub bucket: Option<String>,
    pub key: String,
}

impl ValidJob {
    /// Source name recorded in chunk metadata: the key's basename.
    pub fn source_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// One message pulled from the queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Vec<u8>,
    /// Opaque delivery tag echoed back on ack/reject.
    pub tag: u64,
}

/// How the runner settled a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Done (or unfixably malformed): remove from the queue.
    Ack,
    /// Failed: hand to the dead-letter policy, never requeue here.
    Reject,
}

/// Durable queue client seam.
#[async_trait]
pub trait JobQueue: Send {
    /// Next delivery, or `None` when the queue is closed and the worker
    /// should exit.
    async fn next(&mut self) -> Option<Delivery>;

    async fn ack(&mut self, tag: u64);

    /// Reject without requeue; redelivery is the dead-letter policy's call.
    async fn reject(&mut self, tag: u64);
}
