//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take parameters, compute crop rectangles, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{compute_center_crop, compute_cover_fit};
use super::params::{CropParams, Quality};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Crop encoded image bytes to an aspect ratio and re-encode at a fixed size.
///
/// This is what happens to every gallery upload: center-crop to 4:3, resample
/// to 400x300, JPEG at 0.8.
pub fn crop_to_aspect(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &CropParams,
) -> Result<Vec<u8>> {
    let source = backend.decode(bytes)?;
    let rect = compute_center_crop(source.dimensions(), params.aspect);
    let (x, y, w, h) = rect.to_pixels(source.dimensions());

    let cropped = imageops::crop_imm(&source, x, y, w, h).to_image();
    let (out_w, out_h) = params.output;
    let resized = imageops::resize(&cropped, out_w, out_h, FilterType::Lanczos3);

    backend.encode_jpeg(&resized, params.quality)
}

/// Encode a raw camera still as a frame image.
pub fn encode_still(
    backend: &impl ImageBackend,
    still: &RgbaImage,
    quality: Quality,
) -> Result<Vec<u8>> {
    backend.encode_jpeg(still, quality)
}

/// Draw `source` into the `size` slot at `origin` of `canvas`, cover-fitted.
///
/// The source is cropped to the slot aspect around its center and resampled
/// to the slot size, so it is never distorted and never leaves the slot.
pub fn draw_cover(canvas: &mut RgbaImage, source: &RgbaImage, origin: (u32, u32), size: (u32, u32)) {
    let rect = compute_cover_fit(source.dimensions(), size);
    let (x, y, w, h) = rect.to_pixels(source.dimensions());

    let cropped = imageops::crop_imm(source, x, y, w, h).to_image();
    let (slot_w, slot_h) = size;
    let fitted = imageops::resize(&cropped, slot_w, slot_h, FilterType::Lanczos3);

    imageops::replace(canvas, &fitted, i64::from(origin.0), i64::from(origin.1));
}
