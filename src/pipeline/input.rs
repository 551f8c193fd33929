//! Input resolution for the CLI: read a local path or download a URL into
//! memory and check the PDF magic bytes.
//!
//! The service receives bytes directly from the multipart upload and never
//! goes through this module.

use crate::error::PdfCacheError;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Reject bytes that do not start with `%PDF`.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), PdfCacheError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(PdfCacheError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Resolve the input string to the document bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Bytes, PdfCacheError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    check_pdf_magic(&bytes)?;
    Ok(bytes)
}

async fn read_local(path_str: &str) -> Result<Bytes, PdfCacheError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(data) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), data.len());
            Ok(Bytes::from(data))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfCacheError::FileNotFound { path })
        }
        Err(e) => Err(PdfCacheError::Internal(format!(
            "Failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Bytes, PdfCacheError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| PdfCacheError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {}s", timeout_secs))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}
