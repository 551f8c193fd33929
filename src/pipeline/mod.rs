//! Pipeline stages for PDF-to-image conversion.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (path/URL) (pdfium)  (JPEG → base64)
//! ```
//!
//! 1. [`input`]: (CLI only) read a local file or download a URL into memory
//! 2. [`render`]: rasterise page windows; runs in `spawn_blocking` because
//!    pdfium is CPU-bound
//! 3. [`encode`]: JPEG-encode and base64-wrap each `DynamicImage` into a
//!    [`crate::model::PageImage`]

pub mod encode;
pub mod input;
pub mod render;
