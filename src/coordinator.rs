//! The conversion coordinator: cache check on the request path, rendering
//! and persistence off it.
//!
//! ## Request path vs. background path
//!
//! ```text
//! submit(bytes)  ── fingerprint ──▶ catalog.get ──▶ Lookup { found? }
//!                                                      │ miss
//!                                                      ▼
//! convert(bytes) ── fingerprint ──▶ render (blocking pool, windowed)
//!                               ──▶ store.put("{address}.json")
//!                               ──▶ catalog.insert  (linearization point)
//! ```
//!
//! `submit` is one hash plus one catalog read and never renders. `convert` is
//! the expensive half and is driven by [`crate::queue::ConversionQueue`].
//!
//! ## Concurrent conversions of the same document
//!
//! `convert` does not re-check the catalog before rendering. Two uploads of
//! the same new document can both render and both write the blob; the
//! catalog insert is first-writer-wins and the loser gets
//! [`ConvertOutcome::AlreadyConverted`], which is a success. Blob names are
//! derived from the address, so the loser's write lands on the same name
//! rather than leaving an orphan. Every [`ArtifactStore`] must accept
//! overlapping `put`s of one name.

use crate::catalog::Catalog;
use crate::error::PdfCacheError;
use crate::fingerprint::{fingerprint, ContentAddress};
use crate::model::{
    ConversionFailure, ConversionRecord, ConvertOutcome, InsertOutcome, Lookup, PageImage,
    Submission,
};
use crate::pipeline::render::{render_document_async, PageRenderer};
use crate::progress::ProgressCallback;
use crate::store::ArtifactStore;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Owns the collaborators of the conversion pipeline.
///
/// Construct once at process start and share behind an `Arc`.
pub struct ConversionCoordinator {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ArtifactStore>,
    renderer: Arc<dyn PageRenderer>,
    batch_size: usize,
}

impl ConversionCoordinator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ArtifactStore>,
        renderer: Arc<dyn PageRenderer>,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            renderer,
            batch_size: batch_size.max(1),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Single catalog read. No side effects.
    pub async fn lookup(&self, address: &ContentAddress) -> Result<Lookup, PdfCacheError> {
        let record = self.catalog.get(address).await?;
        Ok(Lookup {
            address: address.clone(),
            location: record.map(|r| r.artifact_location),
        })
    }

    /// Fingerprint the upload and check the catalog. Never renders.
    pub async fn submit(&self, document: &[u8]) -> Result<Submission, PdfCacheError> {
        let address = fingerprint(document);
        let lookup = self.lookup(&address).await?;
        debug!(
            "Submitted {} ({} bytes): {}",
            address,
            document.len(),
            if lookup.found() { "hit" } else { "miss" }
        );
        Ok(lookup)
    }

    /// Render, store and record a document.
    pub async fn convert(&self, document: Bytes) -> Result<ConvertOutcome, PdfCacheError> {
        self.convert_with_progress(document, None).await
    }

    /// [`convert`](Self::convert) with a progress callback for the render stage.
    pub async fn convert_with_progress(
        &self,
        document: Bytes,
        progress: Option<ProgressCallback>,
    ) -> Result<ConvertOutcome, PdfCacheError> {
        let start = Instant::now();
        let address = fingerprint(&document);
        info!("Starting conversion: {}", address);

        let pages = render_document_async(
            Arc::clone(&self.renderer),
            document,
            self.batch_size,
            progress,
        )
        .await?;
        let page_count = pages.len();
        let render_ms = start.elapsed().as_millis() as u64;

        let blob = serde_json::to_vec(&pages)
            .map_err(|e| PdfCacheError::Internal(format!("page serialisation: {e}")))?;
        let artifact = self
            .store
            .put(&address.artifact_name(), Bytes::from(blob))
            .await?;

        // The blob is readable from here on; only now may the record appear.
        let record = ConversionRecord::new(address.clone(), &artifact);
        let outcome = match self.catalog.insert(record).await? {
            InsertOutcome::Inserted => ConvertOutcome::Converted {
                location: artifact.location,
                pages: page_count,
            },
            InsertOutcome::AlreadyExists => {
                info!("{} was converted concurrently; keeping existing record", address);
                let location = self
                    .catalog
                    .get(&address)
                    .await?
                    .map(|r| r.artifact_location)
                    .unwrap_or(artifact.location);
                ConvertOutcome::AlreadyConverted { location }
            }
        };

        if let Err(e) = self.catalog.clear_failure(&address).await {
            warn!("Failed to clear stale failure marker for {}: {}", address, e);
        }

        info!(
            "Conversion complete: {} ({} pages, render {}ms, total {}ms)",
            address,
            page_count,
            render_ms,
            start.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Read back the stored pages of a completed conversion.
    ///
    /// Returns `Ok(None)` when no record exists for `address`.
    pub async fn fetch_pages(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<Vec<PageImage>>, PdfCacheError> {
        let Some(record) = self.catalog.get(address).await? else {
            return Ok(None);
        };
        let blob = self.store.get(&record.artifact_location).await?;
        let pages = serde_json::from_slice(&blob).map_err(|source| {
            PdfCacheError::ArtifactCorrupt {
                location: record.artifact_location.clone(),
                source,
            }
        })?;
        Ok(Some(pages))
    }

    /// Persist a failure marker for a conversion that raised after scheduling.
    pub async fn record_failure(
        &self,
        address: &ContentAddress,
        error: &PdfCacheError,
    ) -> Result<(), PdfCacheError> {
        self.catalog
            .record_failure(ConversionFailure::new(address.clone(), error.to_string()))
            .await
    }
}
