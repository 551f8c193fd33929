//! Progress-callback trait for page rendering events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] into
//! [`crate::pipeline::render::render_document`] to observe a conversion as it
//! walks the document window by window. The CLI uses it to drive a terminal
//! progress bar; the service leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::RenderProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
//!         let done = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num}/{total_pages} ({done} done)");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the renderer adapter as it processes each window.
///
/// All methods default to no-ops. Calls happen on the blocking render thread,
/// so implementations must be `Send + Sync` and must not block for long.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before any page is
    /// rendered.
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each window of pages has been rasterised, before encoding.
    ///
    /// `start` and `end` are 1-indexed and inclusive.
    fn on_batch_rendered(&self, start: usize, end: usize, total_pages: usize) {
        let _ = (start, end, total_pages);
    }

    /// Called after a page has been encoded into its final form.
    fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after the last page.
    fn on_render_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// Shared, type-erased progress callback.
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

/// A callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}
