//! Configuration for the conversion service.
//!
//! Everything the coordinator, the queue and the renderer need is carried by
//! [`ServiceConfig`], built via [`ServiceConfigBuilder`] or read from the
//! environment with [`ServiceConfig::from_env`].

use crate::error::PdfCacheError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of pages rendered per pdfium window.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// JPEG quality used for every stored page. Not configurable.
pub const JPEG_QUALITY: u8 = 25;

/// Service configuration.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .batch_size(5)
///     .workers(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Pages rendered per window. Default: 10. Env: `PDF_BATCH_SIZE`.
    ///
    /// Bounds peak memory: only one window of decoded bitmaps is alive at a
    /// time.
    pub batch_size: usize,

    /// Longest rendered edge in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Bounded queue capacity; a full queue rejects uploads. Default: 64.
    pub queue_capacity: usize,

    /// Maximum concurrent conversions. Default: available parallelism.
    pub workers: usize,

    /// Root directory of the filesystem artifact store. Default: `./artifacts`.
    pub storage_dir: PathBuf,

    /// Container (sub-directory) name for page blobs. Default: `pdf-images`.
    pub container: String,

    /// Postgres URL for the catalog. `None` selects the in-memory catalog.
    pub database_url: Option<String>,

    /// Explicit pdfium library path. `None` binds to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// HTTP bind address. Default: `0.0.0.0:8000`.
    pub bind: String,

    /// Request body limit for uploads. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Default model for the chat endpoint.
    pub chat_model: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_rendered_pixels: 2000,
            queue_capacity: 64,
            workers: default_workers(),
            storage_dir: PathBuf::from("artifacts"),
            container: "pdf-images".to_string(),
            database_url: None,
            pdfium_lib_path: None,
            bind: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            chat_model: None,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read configuration from process environment variables.
    ///
    /// Unset variables keep their defaults; set-but-unparseable numeric
    /// variables are an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, PdfCacheError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup, so
    /// tests do not have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PdfCacheError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut b = Self::builder();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PDF_BATCH_SIZE") {
            b = b.batch_size(parse_num("PDF_BATCH_SIZE", &v)?);
        }
        if let Some(v) = get("PDF2IMG_MAX_RENDERED_PIXELS") {
            b = b.max_rendered_pixels(parse_num("PDF2IMG_MAX_RENDERED_PIXELS", &v)?);
        }
        if let Some(v) = get("PDF2IMG_QUEUE_CAPACITY") {
            b = b.queue_capacity(parse_num("PDF2IMG_QUEUE_CAPACITY", &v)?);
        }
        if let Some(v) = get("PDF2IMG_WORKERS") {
            b = b.workers(parse_num("PDF2IMG_WORKERS", &v)?);
        }
        if let Some(v) = get("PDF2IMG_MAX_UPLOAD_BYTES") {
            b = b.max_upload_bytes(parse_num("PDF2IMG_MAX_UPLOAD_BYTES", &v)?);
        }
        if let Some(v) = get("PDF2IMG_STORAGE_DIR") {
            b = b.storage_dir(v);
        }
        if let Some(v) = get("PDF2IMG_CONTAINER") {
            b = b.container(v);
        }
        if let Some(v) = get("DATABASE_URL") {
            b = b.database_url(v);
        }
        if let Some(v) = get("PDFIUM_LIB_PATH") {
            b = b.pdfium_lib_path(v);
        }
        if let Some(v) = get("PDF2IMG_BIND") {
            b = b.bind(v);
        }
        if let Some(v) = get("PDF2IMG_CHAT_MODEL") {
            b = b.chat_model(v);
        }
        b.build()
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PdfCacheError> {
    value
        .trim()
        .parse()
        .map_err(|_| PdfCacheError::InvalidConfig(format!("{key} must be a number, got '{value}'")))
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.config.queue_capacity = n;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.config.container = name.into();
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind = addr.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = Some(model.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, PdfCacheError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(PdfCacheError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if c.queue_capacity == 0 {
            return Err(PdfCacheError::InvalidConfig(
                "Queue capacity must be ≥ 1".into(),
            ));
        }
        if c.workers == 0 {
            return Err(PdfCacheError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        if c.container.is_empty()
            || c.container.contains('/')
            || c.container.contains('\\')
            || c.container.contains("..")
        {
            return Err(PdfCacheError::InvalidConfig(format!(
                "Container name '{}' must be a single path segment",
                c.container
            )));
        }
        Ok(self.config)
    }
}
