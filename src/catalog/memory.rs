use super::Catalog;
use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use crate::model::{ConversionFailure, ConversionRecord, InsertOutcome};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process catalog. The write lock makes insert-if-absent atomic.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: RwLock<HashMap<ContentAddress, ConversionRecord>>,
    failures: RwLock<HashMap<ContentAddress, ConversionFailure>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, active or not.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<ConversionRecord>, PdfCacheError> {
        Ok(self
            .records
            .read()
            .await
            .get(address)
            .filter(|r| r.active)
            .cloned())
    }

    async fn insert(&self, record: ConversionRecord) -> Result<InsertOutcome, PdfCacheError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.content_address) {
            Some(existing) if existing.active => Ok(InsertOutcome::AlreadyExists),
            Some(existing) => {
                existing.artifact_location = record.artifact_location;
                existing.container_id = record.container_id;
                existing.origin_host = record.origin_host;
                existing.active = true;
                existing.updated_at = Utc::now();
                Ok(InsertOutcome::Inserted)
            }
            None => {
                records.insert(record.content_address.clone(), record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn deactivate(&self, address: &ContentAddress) -> Result<bool, PdfCacheError> {
        let mut records = self.records.write().await;
        match records.get_mut(address) {
            Some(r) if r.active => {
                r.active = false;
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_failure(&self, failure: ConversionFailure) -> Result<(), PdfCacheError> {
        self.failures
            .write()
            .await
            .insert(failure.content_address.clone(), failure);
        Ok(())
    }

    async fn get_failure(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<ConversionFailure>, PdfCacheError> {
        Ok(self.failures.read().await.get(address).cloned())
    }

    async fn clear_failure(&self, address: &ContentAddress) -> Result<(), PdfCacheError> {
        self.failures.write().await.remove(address);
        Ok(())
    }
}
