//! PDF rasterisation: render page windows to `DynamicImage` and encode them.
//!
//! ## Why windows?
//!
//! A decoded 2000 px page bitmap is ~16 MB. Rendering a 300-page document in
//! one go would hold gigabytes at once, so [`render_document`] asks the
//! renderer for `batch_size` pages at a time and encodes each window to
//! compact base64 JPEG before requesting the next one. Peak memory is one
//! window of bitmaps plus the encoded pages so far.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. [`render_document_async`] moves the whole loop onto
//! Tokio's blocking pool so request handlers keep running while a large
//! document renders.

use crate::error::PdfCacheError;
use crate::model::PageImage;
use crate::pipeline::encode;
use crate::progress::{ProgressCallback, RenderProgressCallback};
use bytes::Bytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A blocking page rasteriser.
///
/// Implementations must be pure with respect to their input: the same bytes
/// and range always yield the same number of images, in page order.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfCacheError>;

    /// Render the pages in `pages` (0-indexed, half-open), in order.
    fn render_range(
        &self,
        pdf: &[u8],
        pages: Range<usize>,
    ) -> Result<Vec<DynamicImage>, PdfCacheError>;
}

/// Walk the document in windows of `batch_size` pages and encode every page.
///
/// Blocking; call through [`render_document_async`] from async code.
///
/// # Returns
/// One [`PageImage`] per page, numbered `1..=N` in document order.
pub fn render_document(
    renderer: &dyn PageRenderer,
    pdf: &[u8],
    batch_size: usize,
    progress: Option<&dyn RenderProgressCallback>,
) -> Result<Vec<PageImage>, PdfCacheError> {
    let batch_size = batch_size.max(1);
    let total = renderer.page_count(pdf)?;
    if total == 0 {
        return Err(PdfCacheError::CorruptPdf {
            detail: "document has no pages".into(),
        });
    }
    info!("PDF loaded: {} pages, batch size {}", total, batch_size);

    if let Some(cb) = progress {
        cb.on_render_start(total);
    }

    let mut pages = Vec::with_capacity(total);
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        let images = renderer.render_range(pdf, start..end)?;
        if images.len() != end - start {
            return Err(PdfCacheError::PageCountMismatch {
                start,
                end,
                got: images.len(),
            });
        }
        debug!("Rendered pages {}..={}", start + 1, end);
        if let Some(cb) = progress {
            cb.on_batch_rendered(start + 1, end, total);
        }

        // Consume the window so each bitmap is dropped as soon as it is encoded.
        for (offset, image) in images.into_iter().enumerate() {
            let page_num = start + offset + 1;
            pages.push(encode::encode_page(page_num, &image)?);
            drop(image);
            if let Some(cb) = progress {
                cb.on_page_rendered(page_num, total);
            }
        }
        start = end;
    }

    if let Some(cb) = progress {
        cb.on_render_complete(total);
    }
    Ok(pages)
}

/// Run [`render_document`] on Tokio's blocking pool.
pub async fn render_document_async(
    renderer: Arc<dyn PageRenderer>,
    pdf: Bytes,
    batch_size: usize,
    progress: Option<ProgressCallback>,
) -> Result<Vec<PageImage>, PdfCacheError> {
    tokio::task::spawn_blocking(move || {
        render_document(renderer.as_ref(), &pdf, batch_size, progress.as_deref())
    })
    .await
    .map_err(|e| PdfCacheError::Internal(format!("Render task panicked: {}", e)))?
}

/// [`PageRenderer`] backed by pdfium.
///
/// The library is bound once at construction and shared across render calls;
/// the `thread_safe` feature of `pdfium-render` serialises access internally.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    max_pixels: u32,
}

impl PdfiumRenderer {
    /// Bind to pdfium, either at `lib_path` (a directory or a library file) or
    /// to the system library when `None`.
    pub fn bind(lib_path: Option<&Path>, max_pixels: u32) -> Result<Self, PdfCacheError> {
        let bindings = match lib_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PdfCacheError::PdfiumBindingFailed(format!("{:?}", e)))?;

        info!("pdfium bound (max rendered edge {} px)", max_pixels);
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            max_pixels,
        })
    }

    fn load<'a>(&'a self, pdf: &'a [u8]) -> Result<PdfDocument<'a>, PdfCacheError> {
        self.pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.contains("Password") || detail.contains("password") {
                    PdfCacheError::CorruptPdf {
                        detail: "document is encrypted and requires a password".into(),
                    }
                } else {
                    PdfCacheError::CorruptPdf { detail }
                }
            })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfCacheError> {
        let document = self.load(pdf)?;
        Ok(document.pages().len() as usize)
    }

    fn render_range(
        &self,
        pdf: &[u8],
        pages: Range<usize>,
    ) -> Result<Vec<DynamicImage>, PdfCacheError> {
        let document = self.load(pdf)?;
        let doc_pages = document.pages();
        let total = doc_pages.len() as usize;
        if pages.end > total {
            return Err(PdfCacheError::RasterisationFailed {
                page: pages.end,
                detail: format!("out of range (document has {} pages)", total),
            });
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(pages.len());
        for idx in pages {
            let page = doc_pages
                .get(idx as u16)
                .map_err(|e| PdfCacheError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfCacheError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            results.push(image);
        }

        Ok(results)
    }
}
