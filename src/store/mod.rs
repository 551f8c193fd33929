//! Artifact store abstraction.
//!
//! The coordinator writes one JSON blob per converted document and hands its
//! location to the catalog. Anything that can put and get named blobs can
//! back it: the in-memory store is used by tests and throwaway runs, the
//! filesystem store by a single-node deployment.
//!
//! Implementations are shared behind `Arc<dyn ArtifactStore>` and called
//! concurrently without external locking; every blob name is independent.

use crate::error::PdfCacheError;
use crate::model::StoredArtifact;
use async_trait::async_trait;
use bytes::Bytes;

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;

/// Durable blob storage keyed by name.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `name`, overwriting any previous blob of that name.
    /// Overlapping writes of the same name must all succeed.
    ///
    /// The returned metadata is what the catalog persists.
    async fn put(&self, name: &str, data: Bytes) -> Result<StoredArtifact, PdfCacheError>;

    /// Fetch a blob by the `location` previously returned from [`put`](Self::put).
    async fn get(&self, location: &str) -> Result<Bytes, PdfCacheError>;
}

/// Blob names are single path segments: no separators, no parent references.
pub(crate) fn validate_name(name: &str) -> Result<(), PdfCacheError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(PdfCacheError::ArtifactWriteFailed {
            name: name.to_string(),
            detail: "blob name must be a single path segment".into(),
        });
    }
    Ok(())
}

/// Host name of this process, used as the origin identifier of stored blobs.
pub(crate) fn local_host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
