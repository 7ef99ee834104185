//! Image processing, pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `ImageReader` with format sniffing → RGBA8 |
//! | **Crop to 4:3** | center crop + `imageops::resize` (Lanczos3) |
//! | **Cover fit** | center crop to slot aspect + resize + `imageops::replace` |
//! | **Monochrome** | BT.601 luma, per pixel |
//! | **Encode** | `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and layout math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Grayscale**: the monochrome filter
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod grayscale;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    CropRect, StripLayout, calculate_strip_layout, compute_center_crop, compute_cover_fit,
};
pub use grayscale::{apply_grayscale, decode_grayscale, luminance};
pub use operations::{crop_to_aspect, draw_cover, encode_still};
pub use params::{CropParams, LayoutSpec, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};
