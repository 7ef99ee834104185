//! Monochrome filter.
//!
//! Uses the BT.601 luma weights `0.299 R + 0.587 G + 0.114 B`, rounded to
//! the nearest integer. The preview and the exported strip must agree pixel
//! for pixel, so nothing else in the crate computes gray values.

use image::RgbaImage;

use super::backend::{BackendError, ImageBackend};

const WEIGHT_R: f64 = 0.299;
const WEIGHT_G: f64 = 0.587;
const WEIGHT_B: f64 = 0.114;

/// Gray level of one RGB triple.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let l = WEIGHT_R * f64::from(r) + WEIGHT_G * f64::from(g) + WEIGHT_B * f64::from(b);
    l.round().clamp(0.0, 255.0) as u8
}

/// Replace R, G and B of every pixel with its luminance. Alpha is untouched.
pub fn apply_grayscale(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let l = luminance(r, g, b);
        pixel.0 = [l, l, l, a];
    }
}

/// Decode `bytes` and return a grayscale copy of the pixels.
pub fn decode_grayscale(
    backend: &impl ImageBackend,
    bytes: &[u8],
) -> Result<RgbaImage, BackendError> {
    let mut image = backend.decode(bytes)?;
    apply_grayscale(&mut image);
    Ok(image)
}
