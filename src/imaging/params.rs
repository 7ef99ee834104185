//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the compositor (which decide what images to create) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100). Clamped on construction;
//!   also constructible from the 0.0–1.0 fractions used by canvas encoders.
//! - [`CropParams`]: Center-crop to an aspect ratio, resample to a fixed size, re-encode.
//! - [`LayoutSpec`]: Logical strip constants (base width, scale, padding, gap, caption band).

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    /// Build from a `0.0..=1.0` fraction (`0.98` → 98).
    pub fn from_fraction(fraction: f32) -> Self {
        Self::new((fraction.clamp(0.0, 1.0) * 100.0).round() as u32)
    }

    /// Quality for captured and uploaded frames.
    pub fn capture() -> Self {
        Self(80)
    }

    /// Quality for exported strips.
    pub fn export() -> Self {
        Self(98)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Center-crop to `aspect`, resample to `output`, re-encode at `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropParams {
    pub aspect: (u32, u32),
    pub output: (u32, u32),
    pub quality: Quality,
}

impl CropParams {
    /// Gallery uploads: 4:3, 400x300, capture quality.
    pub fn upload() -> Self {
        Self {
            aspect: (4, 3),
            output: (400, 300),
            quality: Quality::capture(),
        }
    }
}

/// Logical strip layout constants, in unscaled units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSpec {
    pub base_width: u32,
    pub scale: u32,
    pub padding: u32,
    pub gap: u32,
    pub caption_band: u32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            base_width: 240,
            scale: 3,
            padding: 16,
            gap: 12,
            caption_band: 80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_from_fraction() {
        assert_eq!(Quality::from_fraction(0.98), Quality::export());
        assert_eq!(Quality::from_fraction(0.8), Quality::capture());
        assert_eq!(Quality::from_fraction(0.0).value(), 1);
        assert_eq!(Quality::from_fraction(3.0).value(), 100);
    }

    #[test]
    fn upload_crop_is_four_by_three() {
        let params = CropParams::upload();
        assert_eq!(params.aspect, (4, 3));
        assert_eq!(params.output, (400, 300));
        assert_eq!(params.quality.value(), 80);
    }
}
