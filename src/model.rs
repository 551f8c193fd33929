//! Records exchanged between the coordinator, the catalog and the artifact
//! store, plus the small vocabulary reported to pollers.

use crate::fingerprint::ContentAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image format tag written into every [`PageImage`].
pub const PAGE_FORMAT: &str = "JPEG";

/// Transport encoding tag written into every [`PageImage`].
pub const PAGE_ENCODING: &str = "base64";

/// One rendered page, as stored in the artifact blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number, contiguous in document order.
    pub page: u32,
    /// Base64 (standard alphabet) JPEG bytes.
    pub image_data: String,
    pub format: String,
    pub encoding: String,
}

impl PageImage {
    pub fn jpeg(page: u32, image_data: String) -> Self {
        Self {
            page,
            image_data,
            format: PAGE_FORMAT.to_string(),
            encoding: PAGE_ENCODING.to_string(),
        }
    }
}

/// Location metadata returned by an artifact store after a successful put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Blob name within the container.
    pub name: String,
    /// Opaque URI a reader can pass back to [`crate::store::ArtifactStore::get`].
    pub location: String,
    pub container_id: String,
    pub origin_host: String,
}

/// Completion record persisted in the catalog, one per content address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub content_address: ContentAddress,
    pub artifact_location: String,
    pub container_id: String,
    pub origin_host: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// Build a fresh, active record for an artifact that has just been stored.
    pub fn new(content_address: ContentAddress, artifact: &StoredArtifact) -> Self {
        let now = Utc::now();
        Self {
            content_address,
            artifact_location: artifact.location.clone(),
            container_id: artifact.container_id.clone(),
            origin_host: artifact.origin_host.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Terminal marker for a scheduled conversion that raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub content_address: ContentAddress,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl ConversionFailure {
    pub fn new(content_address: ContentAddress, reason: impl Into<String>) -> Self {
        Self {
            content_address,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Result of a catalog insert-if-new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for the address already existed; nothing was written.
    AlreadyExists,
}

/// Result of [`crate::coordinator::ConversionCoordinator::lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub address: ContentAddress,
    pub location: Option<String>,
}

impl Lookup {
    pub fn found(&self) -> bool {
        self.location.is_some()
    }
}

/// Result of [`crate::coordinator::ConversionCoordinator::submit`].
pub type Submission = Lookup;

/// How a `convert` call finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// This call rendered the document and created the catalog record.
    Converted { location: String, pages: usize },
    /// Another conversion created the record first; this call's blob write
    /// was redundant.
    AlreadyConverted { location: String },
}

impl ConvertOutcome {
    pub fn location(&self) -> &str {
        match self {
            ConvertOutcome::Converted { location, .. } => location,
            ConvertOutcome::AlreadyConverted { location } => location,
        }
    }
}

/// Status vocabulary reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    /// Not yet visible; this process has the job queued or running.
    Pending,
    /// Not yet visible, and this process knows nothing about the job.
    NotFound,
    /// The conversion raised after scheduling. Terminal until resubmitted.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Pending => "pending",
            TaskStatus::NotFound => "not_found",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
