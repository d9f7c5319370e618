//! Object-storage seam: get-by-key, bytes out.

use async_trait::async_trait;
use thiserror::Error;

/// Error surfaced by an [`ObjectStore`] implementation, covering both
/// not-found and transport failures.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Fetches raw object bytes from a bucket.
///
/// `bucket = None` means the implementation's (or deployment's) default
/// bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, bucket: Option<&str>, key: &str) -> Result<Vec<u8>, StoreError>;
}
