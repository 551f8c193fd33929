//! Read-only status lookup for pollers.
//!
//! Resolution order for an address:
//!
//! 1. active catalog record → [`TaskStatus::Completed`] with its location;
//! 2. queued or running in this process → [`TaskStatus::Pending`];
//! 3. failure marker → [`TaskStatus::Failed`];
//! 4. otherwise → [`TaskStatus::NotFound`].
//!
//! A marker left by an earlier attempt stays in place until the retry starts
//! running, so an in-flight retry must outrank it.
//!
//! `Pending` and `NotFound` both mean "not yet visible". A poller that sees
//! `NotFound` right after a successful upload is talking to a replica that
//! did not schedule the job; it should keep polling.

use crate::catalog::Catalog;
use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use crate::model::TaskStatus;
use crate::queue::InFlight;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a poller learns about one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: TaskStatus,
    pub address: ContentAddress,
    /// Artifact location, present only when completed.
    pub location: Option<String>,
    pub message: String,
}

impl StatusReport {
    fn new(status: TaskStatus, address: &ContentAddress, location: Option<String>) -> Self {
        let message = match status {
            TaskStatus::Completed => "Task completed".to_string(),
            TaskStatus::Pending => "Task is queued or processing".to_string(),
            TaskStatus::NotFound => "Task not found".to_string(),
            TaskStatus::Failed => "Task failed".to_string(),
        };
        Self {
            status,
            address: address.clone(),
            location,
            message,
        }
    }
}

/// Translates catalog state (and local queue state) into a [`StatusReport`].
#[derive(Clone)]
pub struct StatusQuery {
    catalog: Arc<dyn Catalog>,
    in_flight: InFlight,
}

impl StatusQuery {
    pub fn new(catalog: Arc<dyn Catalog>, in_flight: InFlight) -> Self {
        Self { catalog, in_flight }
    }

    pub async fn status(&self, address: &ContentAddress) -> Result<StatusReport, PdfCacheError> {
        // Sampled before the reads: a job releases its in-flight slot only
        // after writing its record or failure marker.
        let queued = self.in_flight.contains(address);

        if let Some(record) = self.catalog.get(address).await? {
            return Ok(StatusReport::new(
                TaskStatus::Completed,
                address,
                Some(record.artifact_location),
            ));
        }

        if queued {
            debug!("Status for {}: pending", address);
            return Ok(StatusReport::new(TaskStatus::Pending, address, None));
        }

        if let Some(failure) = self.catalog.get_failure(address).await? {
            let mut report = StatusReport::new(TaskStatus::Failed, address, None);
            report.message = format!("Task failed: {}", failure.reason);
            return Ok(report);
        }

        debug!("Status for {}: not found", address);
        Ok(StatusReport::new(TaskStatus::NotFound, address, None))
    }

    /// Poll until the address reaches a terminal state or `timeout` elapses.
    ///
    /// Returns the last report seen; check `status.is_terminal()` to tell a
    /// timeout from completion.
    pub async fn wait_for_terminal(
        &self,
        address: &ContentAddress,
        interval: Duration,
        timeout: Duration,
    ) -> Result<StatusReport, PdfCacheError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let report = self.status(address).await?;
            if report.status.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Ok(report);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::fingerprint::fingerprint;
    use crate::model::{ConversionFailure, ConversionRecord, StoredArtifact};

    fn query() -> (Arc<MemoryCatalog>, StatusQuery) {
        let catalog = Arc::new(MemoryCatalog::new());
        let q = StatusQuery::new(catalog.clone(), InFlight::new());
        (catalog, q)
    }

    #[tokio::test]
    async fn unknown_is_not_found() {
        let (_, q) = query();
        let report = q.status(&fingerprint(b"never seen")).await.unwrap();
        assert_eq!(report.status, TaskStatus::NotFound);
        assert!(report.location.is_none());
    }

    #[tokio::test]
    async fn record_wins_over_failure() {
        let (catalog, q) = query();
        let addr = fingerprint(b"doc");
        catalog
            .record_failure(ConversionFailure::new(addr.clone(), "old"))
            .await
            .unwrap();
        assert_eq!(q.status(&addr).await.unwrap().status, TaskStatus::Failed);

        let artifact = StoredArtifact {
            name: addr.artifact_name(),
            location: "memory://c/x.json".into(),
            container_id: "c".into(),
            origin_host: "memory".into(),
        };
        catalog
            .insert(ConversionRecord::new(addr.clone(), &artifact))
            .await
            .unwrap();
        let report = q.status(&addr).await.unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(report.location.as_deref(), Some("memory://c/x.json"));
    }

    #[tokio::test]
    async fn failure_message_carries_reason() {
        let (catalog, q) = query();
        let addr = fingerprint(b"bad");
        catalog
            .record_failure(ConversionFailure::new(addr.clone(), "document has no pages"))
            .await
            .unwrap();
        let report = q.status(&addr).await.unwrap();
        assert!(report.message.contains("document has no pages"));
    }

    #[tokio::test]
    async fn wait_gives_up_after_timeout() {
        let (_, q) = query();
        let report = q
            .wait_for_terminal(
                &fingerprint(b"x"),
                Duration::from_millis(10),
                Duration::from_millis(50),
            )
            .await
            .unwrap();
        assert_eq!(report.status, TaskStatus::NotFound);
    }
}
