use super::Catalog;
use crate::error::PdfCacheError;
use crate::fingerprint::ContentAddress;
use crate::model::{ConversionFailure, ConversionRecord, InsertOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS pdf_documents (
    hash_id        VARCHAR(64)   PRIMARY KEY,
    blob_url       VARCHAR(2000) NOT NULL,
    container_name VARCHAR(100)  NOT NULL,
    host_name      VARCHAR(255)  NOT NULL,
    is_active      BOOLEAN       NOT NULL DEFAULT TRUE,
    created_at     TIMESTAMPTZ   NOT NULL DEFAULT NOW(),
    updated_at     TIMESTAMPTZ   NOT NULL DEFAULT NOW()
)
"#;

const CREATE_FAILURES: &str = r#"
CREATE TABLE IF NOT EXISTS pdf_conversion_failures (
    hash_id   VARCHAR(64) PRIMARY KEY,
    reason    TEXT        NOT NULL,
    failed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Postgres-backed catalog.
///
/// Every method checks one connection out of the pool for a single statement;
/// the pool is the only shared state.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a bounded pool (5 steady connections, 15 max).
    pub async fn connect(database_url: &str) -> Result<Self, PdfCacheError> {
        info!("Initializing database connection");
        let pool = PgPoolOptions::new()
            .min_connections(5)
            .max_connections(15)
            .acquire_timeout(Duration::from_secs(10))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        info!("Database connection initialized");
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), PdfCacheError> {
        sqlx::query(CREATE_DOCUMENTS).execute(&self.pool).await?;
        sqlx::query(CREATE_FAILURES).execute(&self.pool).await?;
        info!("Database tables created or already exist");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

fn address_from_row(row: &PgRow) -> Result<ContentAddress, PdfCacheError> {
    let hash: String = row.try_get("hash_id")?;
    ContentAddress::parse(&hash)
}

fn record_from_row(row: &PgRow) -> Result<ConversionRecord, PdfCacheError> {
    Ok(ConversionRecord {
        content_address: address_from_row(row)?,
        artifact_location: row.try_get("blob_url")?,
        container_id: row.try_get("container_name")?,
        origin_host: row.try_get("host_name")?,
        active: row.try_get("is_active")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn get(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<ConversionRecord>, PdfCacheError> {
        let row = sqlx::query(
            r#"
            SELECT hash_id, blob_url, container_name, host_name, is_active, created_at, updated_at
            FROM pdf_documents
            WHERE hash_id = $1 AND is_active
            "#,
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, record: ConversionRecord) -> Result<InsertOutcome, PdfCacheError> {
        // Conflicts with an active row change nothing; an inactive row is revived.
        let result = sqlx::query(
            r#"
            INSERT INTO pdf_documents (hash_id, blob_url, container_name, host_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6)
            ON CONFLICT (hash_id) DO UPDATE
            SET blob_url = EXCLUDED.blob_url,
                container_name = EXCLUDED.container_name,
                host_name = EXCLUDED.host_name,
                is_active = TRUE,
                updated_at = NOW()
            WHERE pdf_documents.is_active = FALSE
            "#,
        )
        .bind(record.content_address.as_str())
        .bind(&record.artifact_location)
        .bind(&record.container_id)
        .bind(&record.origin_host)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn deactivate(&self, address: &ContentAddress) -> Result<bool, PdfCacheError> {
        let result = sqlx::query(
            r#"
            UPDATE pdf_documents
            SET is_active = FALSE, updated_at = NOW()
            WHERE hash_id = $1 AND is_active
            "#,
        )
        .bind(address.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_failure(&self, failure: ConversionFailure) -> Result<(), PdfCacheError> {
        sqlx::query(
            r#"
            INSERT INTO pdf_conversion_failures (hash_id, reason, failed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash_id) DO UPDATE
            SET reason = EXCLUDED.reason, failed_at = EXCLUDED.failed_at
            "#,
        )
        .bind(failure.content_address.as_str())
        .bind(&failure.reason)
        .bind(failure.failed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_failure(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<ConversionFailure>, PdfCacheError> {
        let row = sqlx::query(
            "SELECT hash_id, reason, failed_at FROM pdf_conversion_failures WHERE hash_id = $1",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ConversionFailure, PdfCacheError> {
            Ok(ConversionFailure {
                content_address: address_from_row(&row)?,
                reason: row.try_get("reason")?,
                failed_at: row.try_get::<DateTime<Utc>, _>("failed_at")?,
            })
        })
        .transpose()
    }

    async fn clear_failure(&self, address: &ContentAddress) -> Result<(), PdfCacheError> {
        sqlx::query("DELETE FROM pdf_conversion_failures WHERE hash_id = $1")
            .bind(address.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
