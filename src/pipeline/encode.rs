//! Image encoding: `DynamicImage` → base64 JPEG wrapped in `ImageData`.
//!
//! JPEG rather than PNG: a rendered page compresses to roughly a third of
//! its PNG size, which matters here because the window stream's whole point
//! is a bounded memory footprint, and at 150 DPI with quality 90 the
//! compression artefacts stay below what affects transcription accuracy.
//! `detail: "high"` keeps tiling-based providers on their full image-token
//! budget so small print and table cells remain legible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

const JPEG_QUALITY: u8 = 90;

/// Encode a rasterised page as a base64 JPEG ready for the vision model.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    // JPEG has no alpha channel; flatten before encoding.
    img.to_rgb8().write_with_encoder(encoder)?;

    let b64 = STANDARD.encode(&buf);
    debug!("encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/jpeg").with_detail("high"))
}
