//! Catalog abstraction: completion records keyed by content address.
//!
//! The catalog is the source of truth for "has this document been
//! converted". Its primary-key uniqueness is the dedup contract: the insert
//! of a [`ConversionRecord`] is the linearization point, and a second insert
//! for the same address is reported as [`InsertOutcome::AlreadyExists`]
//! instead of an error.
//!
//! The catalog also holds [`ConversionFailure`] markers so a scheduled
//! conversion that raised becomes a terminal state for pollers rather than an
//! eternal `not_found`.
//!
//! Each call is one unit of work: implementations check a connection out,
//! run one statement (or one transaction) and release it. Callers never hold
//! a session across calls.

use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use crate::model::{ConversionFailure, ConversionRecord, InsertOutcome};
use async_trait::async_trait;

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryCatalog;
#[cfg(feature = "postgres")]
pub use postgres::PgCatalog;

/// Durable record store keyed by content address.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the active record for `address`. Deactivated records read as absent.
    async fn get(&self, address: &ContentAddress)
        -> Result<Option<ConversionRecord>, PdfCacheError>;

    /// Insert `record` unless an active record for its address exists.
    ///
    /// A deactivated record is replaced and reactivated.
    async fn insert(&self, record: ConversionRecord) -> Result<InsertOutcome, PdfCacheError>;

    /// Soft-delete the record for `address`. Returns whether a row changed.
    async fn deactivate(&self, address: &ContentAddress) -> Result<bool, PdfCacheError>;

    /// Persist (or replace) the failure marker for an address.
    async fn record_failure(&self, failure: ConversionFailure) -> Result<(), PdfCacheError>;

    /// Fetch the failure marker for `address`, if any.
    async fn get_failure(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<ConversionFailure>, PdfCacheError>;

    /// Remove the failure marker for `address`. Missing markers are not an error.
    async fn clear_failure(&self, address: &ContentAddress) -> Result<(), PdfCacheError>;
}
