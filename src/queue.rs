//! Background conversion queue.
//!
//! A bounded `mpsc` channel feeds a single dispatcher task, which hands each
//! job to a worker gated by a [`Semaphore`]. `enqueue` never waits: when the
//! channel is full the caller gets [`PdfCacheError::QueueFull`] and can turn
//! it into a 503.
//!
//! The queue also tracks which addresses are scheduled or running in this
//! process ([`InFlight`]). A second upload of a document that is already in
//! flight is not queued again, and status queries report it as `pending`.
//! An address leaves the in-flight set only after its catalog record (or its
//! failure marker) has been written.

use crate::coordinator::ConversionCoordinator;
use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Addresses scheduled or running in this process.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<ContentAddress>>>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `address`. Returns `None` if it is already claimed.
    fn claim(&self, address: &ContentAddress) -> Option<InFlightGuard> {
        let fresh = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone());
        fresh.then(|| InFlightGuard {
            set: self.clone(),
            address: address.clone(),
        })
    }

    fn release(&self, address: &ContentAddress) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address);
    }
}

/// Releases its address when dropped, including when a worker panics.
struct InFlightGuard {
    set: InFlight,
    address: ContentAddress,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.release(&self.address);
    }
}

struct ConversionJob {
    document: Bytes,
    guard: InFlightGuard,
}

/// Queue sizing.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Jobs that may wait in the channel before `enqueue` reports full.
    pub capacity: usize,
    /// Conversions allowed to run at once.
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            workers: 4,
        }
    }
}

/// Result of handing a document to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// A new job was scheduled.
    Scheduled(ContentAddress),
    /// A job for this address was already scheduled or running.
    AlreadyInFlight(ContentAddress),
}

impl Enqueued {
    pub fn address(&self) -> &ContentAddress {
        match self {
            Self::Scheduled(a) | Self::AlreadyInFlight(a) => a,
        }
    }
}

/// Result of an upload: either a cache hit or a scheduled conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    AlreadyExists {
        address: ContentAddress,
        location: String,
    },
    Processing {
        address: ContentAddress,
    },
}

impl SubmitOutcome {
    pub fn address(&self) -> &ContentAddress {
        match self {
            Self::AlreadyExists { address, .. } | Self::Processing { address } => address,
        }
    }
}

/// Bounded worker pool for background conversions.
pub struct ConversionQueue {
    tx: mpsc::Sender<ConversionJob>,
    coordinator: Arc<ConversionCoordinator>,
    in_flight: InFlight,
    capacity: usize,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ConversionQueue {
    /// Start the dispatcher. Must be called inside a Tokio runtime.
    pub fn start(coordinator: Arc<ConversionCoordinator>, config: QueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = tokio::spawn(dispatch(
            rx,
            Arc::clone(&coordinator),
            workers,
            shutdown_rx,
        ));
        info!(
            "Conversion queue started (capacity {}, workers {})",
            capacity, workers
        );

        Self {
            tx,
            coordinator,
            in_flight: InFlight::new(),
            capacity,
            shutdown_tx,
            dispatcher: tokio::sync::Mutex::new(Some(dispatcher)),
        }
    }

    pub fn coordinator(&self) -> &Arc<ConversionCoordinator> {
        &self.coordinator
    }

    /// Handle on the in-flight set, for status queries.
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check the catalog and schedule a conversion on a miss.
    pub async fn submit(&self, document: Bytes) -> Result<SubmitOutcome, PdfCacheError> {
        let lookup = self.coordinator.submit(&document).await?;
        if let Some(location) = lookup.location {
            info!("PDF already exists: {}", lookup.address);
            return Ok(SubmitOutcome::AlreadyExists {
                address: lookup.address,
                location,
            });
        }
        let enqueued = self.enqueue(lookup.address, document).await?;
        Ok(SubmitOutcome::Processing {
            address: enqueued.address().clone(),
        })
    }

    /// Schedule a conversion of `document`, stored under `address`.
    ///
    /// A failure marker from an earlier attempt is left alone here; the
    /// worker clears it when the job starts. A rejected resubmission
    /// therefore still reads as `failed`.
    #[tracing::instrument(skip_all, fields(address = %address, bytes = document.len()))]
    pub async fn enqueue(
        &self,
        address: ContentAddress,
        document: Bytes,
    ) -> Result<Enqueued, PdfCacheError> {
        let Some(guard) = self.in_flight.claim(&address) else {
            info!("Conversion already in flight");
            return Ok(Enqueued::AlreadyInFlight(address));
        };

        match self.tx.try_send(ConversionJob { document, guard }) {
            Ok(()) => {
                info!("Conversion scheduled");
                Ok(Enqueued::Scheduled(address))
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Conversion queue is full");
                Err(PdfCacheError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PdfCacheError::QueueClosed),
        }
    }

    /// Stop accepting work, finish queued and running jobs, then return.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Conversion dispatcher ended abnormally: {}", e);
            }
        }
        info!("Conversion queue stopped");
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<ConversionJob>,
    coordinator: Arc<ConversionCoordinator>,
    workers: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut draining = false;

    loop {
        let next = if draining {
            rx.recv().await
        } else {
            tokio::select! {
                job = rx.recv() => job,
                _ = shutdown_rx.changed() => {
                    // Closing keeps already-buffered jobs receivable.
                    rx.close();
                    draining = true;
                    continue;
                }
            }
        };
        let Some(job) = next else { break };

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            run_job(&coordinator, job).await;
            drop(permit);
        });
    }

    // Wait for running workers to hand their permits back.
    let _ = semaphore.acquire_many(workers as u32).await;
}

#[tracing::instrument(skip_all, fields(address = %job.guard.address))]
async fn run_job(coordinator: &ConversionCoordinator, job: ConversionJob) {
    let ConversionJob { document, guard } = job;
    if let Err(e) = coordinator.catalog().clear_failure(&guard.address).await {
        warn!("Failed to clear earlier failure marker: {}", e);
    }
    match coordinator.convert(document).await {
        Ok(outcome) => info!("Background conversion stored at {}", outcome.location()),
        Err(e) => {
            error!("Background conversion failed: {}", e);
            if let Err(mark) = coordinator.record_failure(&guard.address, &e).await {
                error!("Failed to record conversion failure: {}", mark);
            }
        }
    }
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    #[test]
    fn in_flight_claim_is_exclusive_until_dropped() {
        let set = InFlight::new();
        let addr = fingerprint(b"x");
        let guard = set.claim(&addr).unwrap();
        assert!(set.contains(&addr));
        assert!(set.claim(&addr).is_none());
        drop(guard);
        assert!(!set.contains(&addr));
        assert!(set.is_empty());
    }

    #[test]
    fn enqueued_address() {
        let addr = fingerprint(b"y");
        assert_eq!(Enqueued::Scheduled(addr.clone()).address(), &addr);
        assert_eq!(Enqueued::AlreadyInFlight(addr.clone()).address(), &addr);
    }
}
