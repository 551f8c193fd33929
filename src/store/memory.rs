use super::{validate_name, ArtifactStore};
use crate::error::PdfCacheError;
use crate::model::StoredArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const SCHEME: &str = "memory://";

/// Process-local artifact store. Contents are lost on drop.
#[derive(Debug)]
pub struct MemoryArtifactStore {
    container: String,
    blobs: RwLock<HashMap<String, Bytes>>,
    puts: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            blobs: RwLock::new(HashMap::new()),
            puts: AtomicUsize::new(0),
        }
    }

    /// Total number of successful puts, overwrites included.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    fn location_of(&self, name: &str) -> String {
        format!("{SCHEME}{}/{}", self.container, name)
    }
}

impl Default for MemoryArtifactStore {
    fn default() -> Self {
        Self::new("pdf-images")
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<StoredArtifact, PdfCacheError> {
        validate_name(name)?;
        let location = self.location_of(name);
        debug!("memory put {} ({} bytes)", location, data.len());
        self.blobs.write().await.insert(location.clone(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(StoredArtifact {
            name: name.to_string(),
            location,
            container_id: self.container.clone(),
            origin_host: "memory".to_string(),
        })
    }

    async fn get(&self, location: &str) -> Result<Bytes, PdfCacheError> {
        self.blobs
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| PdfCacheError::ArtifactNotFound(location.to_string()))
    }
}
