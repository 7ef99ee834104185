//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the bitmap decode/encode collaborator: it
//! turns arbitrary encoded bytes into pixels and pixels back into a JPEG
//! blob. Everything above it (cropping, compositing, filtering) works on
//! decoded [`RgbaImage`]s and never touches a codec directly.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and built on
//! the `image` crate.

use image::RgbaImage;
use thiserror::Error;

use super::params::Quality;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode failed: {0}")]
    ImageDecode(String),
    #[error("Image encode failed: {0}")]
    Encode(String),
}

/// Trait for image codec backends.
///
/// `Sync` so decodes can fan out over rayon while drawing stays on one thread.
pub trait ImageBackend: Sync {
    /// Decode arbitrary image bytes to RGBA pixels.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;

    /// Encode pixels as a JPEG blob. Alpha is dropped.
    fn encode_jpeg(&self, image: &RgbaImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}
