use super::{local_host_name, validate_name, ArtifactStore};
use crate::error::PdfCacheError;
use crate::model::StoredArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const SCHEME: &str = "file://";

/// Filesystem artifact store: blobs live in `{root}/{container}/{name}`.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// that follows a catalog record never observes a half-written blob.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    container: String,
    dir: PathBuf,
    host: String,
}

impl FsArtifactStore {
    /// Open the store, creating the container directory if it does not exist.
    pub async fn new(root: impl AsRef<Path>, container: impl Into<String>) -> Result<Self, PdfCacheError> {
        let container = container.into();
        let dir = root.as_ref().join(&container);
        fs::create_dir_all(&dir).await.map_err(|e| {
            PdfCacheError::InvalidConfig(format!(
                "Failed to create storage directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        let dir = fs::canonicalize(&dir).await.map_err(|e| {
            PdfCacheError::InvalidConfig(format!(
                "Failed to canonicalize storage directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!("Artifact container '{}' ready at {}", container, dir.display());
        Ok(Self {
            container,
            dir,
            host: local_host_name(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a location back to a path inside the container, refusing anything
    /// that points elsewhere.
    fn path_of(&self, location: &str) -> Result<PathBuf, PdfCacheError> {
        let outside = || PdfCacheError::ArtifactReadFailed {
            location: location.to_string(),
            detail: "location is outside this store".into(),
        };
        let raw = location.strip_prefix(SCHEME).ok_or_else(outside)?;
        let path = Path::new(raw);
        if path.parent() != Some(self.dir.as_path()) {
            return Err(outside());
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(outside)?;
        validate_name(name).map_err(|_| outside())?;
        Ok(path.to_path_buf())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<StoredArtifact, PdfCacheError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        let write_failed = |detail: String| PdfCacheError::ArtifactWriteFailed {
            name: name.to_string(),
            detail,
        };

        // Each write gets its own temp file; concurrent writers of one name
        // both succeed and the last rename wins.
        let dir = self.dir.clone();
        let target = path.clone();
        let payload = data.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".blob-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            tmp.write_all(&payload)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| write_failed(format!("write task panicked: {e}")))?
        .map_err(|e| write_failed(e.to_string()))?;

        let location = format!("{SCHEME}{}", path.display());
        debug!("Blob '{}' stored at {} ({} bytes)", name, location, data.len());
        Ok(StoredArtifact {
            name: name.to_string(),
            location,
            container_id: self.container.clone(),
            origin_host: self.host.clone(),
        })
    }

    async fn get(&self, location: &str) -> Result<Bytes, PdfCacheError> {
        let path = self.path_of(location)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PdfCacheError::ArtifactNotFound(location.to_string()))
            }
            Err(e) => Err(PdfCacheError::ArtifactReadFailed {
                location: location.to_string(),
                detail: e.to_string(),
            }),
        }
    }
}
