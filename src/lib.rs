//! # edgequake-pdf2img
//!
//! Content-addressed PDF → page-image conversion with deduplication.
//!
//! Uploads are fingerprinted with SHA-256. A document whose fingerprint is
//! already in the catalog is answered from cache; a new one is queued and
//! rasterised in the background, one JPEG per page. Clients poll with the
//! fingerprint as the task id until the catalog shows the conversion.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Fingerprint  SHA-256 → 64-char lowercase hex ContentAddress
//!  ├─ 2. Lookup       catalog hit → "already_exists", done
//!  ├─ 3. Enqueue      bounded queue, 503 when full
//!  ├─ 4. Render       pdfium, batch_size pages per window (spawn_blocking)
//!  ├─ 5. Encode       JPEG q25 → base64 PageImage
//!  ├─ 6. Store        one JSON blob "{address}.json" in the artifact store
//!  └─ 7. Record       catalog insert (first writer wins) → "completed"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{
//!     ConversionCoordinator, ConversionQueue, MemoryArtifactStore, MemoryCatalog,
//!     PdfiumRenderer, QueueConfig, StatusQuery,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let renderer = PdfiumRenderer::bind(None, 2000)?;
//!     let coordinator = Arc::new(ConversionCoordinator::new(
//!         Arc::new(MemoryCatalog::new()),
//!         Arc::new(MemoryArtifactStore::default()),
//!         Arc::new(renderer),
//!         10,
//!     ));
//!     let queue = ConversionQueue::start(Arc::clone(&coordinator), QueueConfig::default());
//!     let status = StatusQuery::new(Arc::clone(coordinator.catalog()), queue.in_flight());
//!
//!     let bytes = tokio::fs::read("document.pdf").await?;
//!     let outcome = queue.submit(bytes.into()).await?;
//!     let report = status
//!         .wait_for_terminal(outcome.address(), Duration::from_millis(200), Duration::from_secs(60))
//!         .await?;
//!     println!("{}: {:?}", report.status, report.location);
//!     queue.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cli`      | on      | The `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server`   | on      | axum HTTP routes under `/api` |
//! | `postgres` | on      | [`PgCatalog`] on sqlx; without it only [`MemoryCatalog`] is available |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod chat;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod queue;
#[cfg(feature = "server")]
pub mod server;
pub mod status;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{Catalog, MemoryCatalog};
#[cfg(feature = "postgres")]
pub use catalog::PgCatalog;
pub use chat::LlmClients;
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use coordinator::ConversionCoordinator;
pub use error::PdfCacheError;
pub use fingerprint::{fingerprint, ContentAddress};
pub use model::{
    ConversionFailure, ConversionRecord, ConvertOutcome, Lookup, PageImage, StoredArtifact,
    Submission, TaskStatus,
};
pub use pipeline::render::{render_document, PageRenderer, PdfiumRenderer};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
pub use queue::{ConversionQueue, InFlight, QueueConfig, SubmitOutcome};
pub use status::{StatusQuery, StatusReport};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
