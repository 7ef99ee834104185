//! Pure calculation functions for crop rectangles and strip layout.
//!
//! All functions here are pure and testable without any I/O or images.
//! Aspect ratios are passed as integer `(width, height)` pairs so the
//! "is the source wider than the target" comparison is exact; the resulting
//! rectangles are fractional, like canvas source rectangles.

use super::params::LayoutSpec;
use crate::types::FRAMES_PER_STRIP;

/// A source rectangle in pixel space, possibly fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// Snap to whole pixels inside a `source` of the given dimensions.
    ///
    /// Returns `(x, y, width, height)`, always at least 1x1 and never
    /// extending past the source edge.
    pub fn to_pixels(&self, source: (u32, u32)) -> (u32, u32, u32, u32) {
        let (src_w, src_h) = source;
        let x = (self.x.round().max(0.0) as u32).min(src_w.saturating_sub(1));
        let y = (self.y.round().max(0.0) as u32).min(src_h.saturating_sub(1));
        let w = (self.width.round() as u32).clamp(1, (src_w - x).max(1));
        let h = (self.height.round() as u32).clamp(1, (src_h - y).max(1));
        (x, y, w, h)
    }
}

/// Largest centered rectangle of `source` whose aspect equals `ratio`.
///
/// A source wider than the ratio keeps its full height and loses width on
/// both sides; otherwise it keeps its full width and loses height top and
/// bottom. A source already at the ratio comes back unchanged.
///
/// # Examples
/// ```
/// # use photo_strip::imaging::compute_center_crop;
/// // 1000x600 cropped to 4:3 → 800 wide, 100 trimmed from each side
/// let rect = compute_center_crop((1000, 600), (4, 3));
/// assert_eq!((rect.x, rect.width), (100.0, 800.0));
/// ```
pub fn compute_center_crop(source: (u32, u32), ratio: (u32, u32)) -> CropRect {
    let (src_w, src_h) = source;
    let (ratio_w, ratio_h) = ratio;

    // src_w / src_h > ratio_w / ratio_h, cross-multiplied
    let source_is_wider =
        u64::from(src_w) * u64::from(ratio_h) > u64::from(ratio_w) * u64::from(src_h);

    if source_is_wider {
        let width = f64::from(src_h) * f64::from(ratio_w) / f64::from(ratio_h);
        CropRect {
            x: (f64::from(src_w) - width) / 2.0,
            y: 0.0,
            width,
            height: f64::from(src_h),
        }
    } else {
        let height = f64::from(src_w) * f64::from(ratio_h) / f64::from(ratio_w);
        CropRect {
            x: 0.0,
            y: (f64::from(src_h) - height) / 2.0,
            width: f64::from(src_w),
            height,
        }
    }
}

/// Source rectangle that fills a `dest` slot without distortion ("cover").
pub fn compute_cover_fit(source: (u32, u32), dest: (u32, u32)) -> CropRect {
    compute_center_crop(source, dest)
}

/// Resolved pixel geometry of a composited strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub scale: u32,
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub gap: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub caption_band: u32,
}

impl StripLayout {
    /// Top-left corner of the slot for frame `index`.
    pub fn slot_origin(&self, index: usize) -> (u32, u32) {
        let y = self.padding + index as u32 * (self.frame_height + self.gap);
        (self.padding, y)
    }

    /// Height of the stacked frames including the gaps between them.
    pub fn frames_height(&self) -> u32 {
        let n = FRAMES_PER_STRIP as u32;
        self.frame_height * n + self.gap * (n - 1)
    }

    /// Vertical center of the caption band.
    pub fn caption_center_y(&self) -> f32 {
        let band_top = self.padding + self.frames_height();
        band_top as f32 + self.caption_band as f32 / 2.0
    }
}

/// Compute the strip geometry from the logical layout constants.
///
/// Every logical unit is multiplied by `scale`; the frame height is the
/// frame width at a strict 4:3. Output size never depends on the images.
/// Returns `None` when a pixel dimension does not fit in `u32`.
pub fn calculate_strip_layout(spec: &LayoutSpec) -> Option<StripLayout> {
    let scale = spec.scale;
    let width = spec.base_width.checked_mul(scale)?;
    let padding = spec.padding.checked_mul(scale)?;
    let gap = spec.gap.checked_mul(scale)?;
    let caption_band = spec.caption_band.checked_mul(scale)?;

    let frame_width = width.saturating_sub(padding.checked_mul(2)?);
    let frame_height = (f64::from(frame_width) * 3.0 / 4.0).round() as u32;

    let n = FRAMES_PER_STRIP as u32;
    let frames_height = frame_height
        .checked_mul(n)?
        .checked_add(gap.checked_mul(n - 1)?)?;
    let height = padding
        .checked_mul(2)?
        .checked_add(frames_height)?
        .checked_add(caption_band)?;

    Some(StripLayout {
        scale,
        width,
        height,
        padding,
        gap,
        frame_width,
        frame_height,
        caption_band,
    })
}
