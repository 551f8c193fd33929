//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`PageImage`].
//!
//! Pages are stored as low-quality JPEG: the consumers of the blob need a
//! legible preview, not an archival copy, and a 25-quality JPEG of a text page
//! is roughly a tenth of the equivalent PNG. Base64 keeps the bytes JSON-safe.

use crate::config::JPEG_QUALITY;
use crate::error::PdfCacheError;
use crate::model::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as a base64 JPEG.
///
/// `page_num` is 1-indexed and is only used for the record and error context.
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_page(page_num: usize, img: &DynamicImage) -> Result<PageImage, PdfCacheError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| PdfCacheError::EncodingFailed {
            page: page_num,
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded page {} ({}x{}) → {} bytes base64",
        page_num,
        rgb.width(),
        rgb.height(),
        b64.len()
    );

    let page = u32::try_from(page_num).map_err(|_| PdfCacheError::EncodingFailed {
        page: page_num,
        detail: "page number exceeds u32".into(),
    })?;

    Ok(PageImage::jpeg(page, b64))
}

/// Decode the image bytes of a stored page.
pub fn decode_page(page: &PageImage) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(&page.image_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let page = encode_page(1, &img).expect("encode should succeed");
        assert_eq!(page.page, 1);
        assert_eq!(page.format, "JPEG");
        assert_eq!(page.encoding, "base64");

        let decoded = decode_page(&page).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn decoded_page_is_readable_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 16, Rgba([0, 0, 255, 128])));
        let page = encode_page(7, &img).unwrap();
        let bytes = decode_page(&page).unwrap();
        let back = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .expect("stored bytes are a JPEG");
        assert_eq!((back.width(), back.height()), (32, 16));
    }
}
