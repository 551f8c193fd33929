//! Error types for the edgequake-pdf2img library.
//!
//! A single error enum, [`PdfCacheError`], covers every failure the library
//! can report. Variants are grouped by the collaborator that produced them so
//! the HTTP layer can map each group to a status code without string matching:
//!
//! * input errors → `400`
//! * queue backpressure → `503`
//! * everything else → `500`
//!
//! Errors raised inside a background conversion never reach a caller; the
//! conversion queue logs them and records a failure marker in the catalog so
//! pollers see a terminal `failed` state.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum PdfCacheError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Upload did not carry the PDF media type.
    #[error("Only PDF files are allowed (got content type '{content_type}')")]
    UnsupportedMediaType { content_type: String },

    /// A task id / content address is not a 64-character hex digest.
    #[error("Invalid content address '{input}': expected 64 lowercase hex characters")]
    InvalidAddress { input: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// A request field was missing or empty.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An upload body ran past the configured size limit.
    #[error("Upload exceeds the {limit}-byte limit")]
    UploadTooLarge { limit: usize },

    /// Bytes were read but do not start with the `%PDF` magic.
    #[error("Input is not a valid PDF: first bytes {magic:?}")]
    NotAPdf { magic: Vec<u8> },

    // ── Render errors ─────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt, or the document is encrypted.
    #[error("PDF could not be opened: {detail}")]
    CorruptPdf { detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered page could not be re-encoded as JPEG.
    #[error("Encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    /// The renderer returned a different number of pages than requested.
    #[error("Renderer returned {got} pages for range {start}..{end}")]
    PageCountMismatch { start: usize, end: usize, got: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Storage errors ────────────────────────────────────────────────────
    /// Artifact store write failed.
    #[error("Artifact upload failed for '{name}': {detail}")]
    ArtifactWriteFailed { name: String, detail: String },

    /// Artifact store read failed.
    #[error("Artifact download failed for '{location}': {detail}")]
    ArtifactReadFailed { location: String, detail: String },

    /// The artifact location is not known to the store.
    #[error("Artifact not found: '{0}'")]
    ArtifactNotFound(String),

    /// Stored blob could not be decoded back into page images.
    #[error("Artifact '{location}' is not a valid page array: {source}")]
    ArtifactCorrupt {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Catalog errors ────────────────────────────────────────────────────
    /// The catalog backend is unreachable or returned an error.
    #[error("Catalog error: {0}")]
    Catalog(String),

    // ── Queue errors ──────────────────────────────────────────────────────
    /// The bounded conversion queue is full; the caller should retry later.
    #[error("Conversion queue is full ({capacity} pending jobs), please try again later")]
    QueueFull { capacity: usize },

    /// The conversion queue was shut down and accepts no more jobs.
    #[error("Conversion queue is closed")]
    QueueClosed,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfCacheError {
    /// True for errors caused by the request itself rather than a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfCacheError::UnsupportedMediaType { .. }
                | PdfCacheError::InvalidAddress { .. }
                | PdfCacheError::InvalidInput(_)
                | PdfCacheError::UploadTooLarge { .. }
                | PdfCacheError::NotAPdf { .. }
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for PdfCacheError {
    fn from(err: sqlx::Error) -> Self {
        PdfCacheError::Catalog(err.to_string())
    }
}
