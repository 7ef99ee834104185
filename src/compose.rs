//! Strip compositor.
//!
//! Turns a [`FinalStrip`] into one high-resolution bitmap:
//!
//! ```text
//! ┌──────────────┐  ← padding
//! │   frame 1    │
//! ├──────────────┤  ← gap
//! │   frame 2    │
//! │     ...      │
//! │   frame 4    │
//! │              │
//! │ PHOTO COLL.  │  ← caption band: label, then date
//! │  Jan 5, 2024 │
//! └──────────────┘
//! ```
//!
//! Canvas size depends only on the layout constants, never on the frames.
//! Frames are decoded (and filtered) in parallel, then drawn one after another
//! in strip order, since every draw writes to the same canvas.

use chrono::NaiveDate;
use image::RgbaImage;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::caption::{Caption, CaptionFonts, CaptionStyle, FontError, render_caption};
use crate::config::{MAX_STRIP_SIDE, PhotoStripConfig, parse_hex_color};
use crate::frames::FinalStrip;
use crate::imaging::{
    BackendError, ImageBackend, StripLayout, calculate_strip_layout, decode_grayscale, draw_cover,
};
use crate::types::FilterMode;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Cannot create a {width}x{height} drawing surface")]
    RenderSurfaceUnavailable { width: u32, height: u32 },
    #[error("Frame decode failed: {0}")]
    ImageDecode(#[from] BackendError),
    #[error(transparent)]
    Font(#[from] FontError),
}

/// A rendered strip plus the caption text drawn on it.
#[derive(Debug, Clone)]
pub struct ComposedStrip {
    pub image: RgbaImage,
    pub caption: Caption,
    pub filter: FilterMode,
}

pub struct StripCompositor<'a, B: ImageBackend> {
    backend: &'a B,
    layout: StripLayout,
    paper: [u8; 3],
    style: CaptionStyle,
    fonts: CaptionFonts,
}

impl<'a, B: ImageBackend> StripCompositor<'a, B> {
    pub fn new(
        backend: &'a B,
        layout: StripLayout,
        paper: [u8; 3],
        style: CaptionStyle,
        fonts: CaptionFonts,
    ) -> Self {
        Self {
            backend,
            layout,
            paper,
            style,
            fonts,
        }
    }

    /// Build a compositor from `[strip]` and `[caption]`, loading fonts.
    pub fn from_config(backend: &'a B, config: &PhotoStripConfig) -> Result<Self, ComposeError> {
        let strip = &config.strip;
        let layout = calculate_strip_layout(&strip.layout_spec()).ok_or(
            ComposeError::RenderSurfaceUnavailable {
                width: strip.base_width.saturating_mul(strip.scale),
                height: u32::MAX,
            },
        )?;
        let fonts = CaptionFonts::from_config(config)?;
        let paper = parse_hex_color(&strip.paper).unwrap_or(DEFAULT_PAPER);
        Ok(Self::new(
            backend,
            layout,
            paper,
            CaptionStyle::from_config(config),
            fonts,
        ))
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    /// Render `strip` with `filter`, dating the caption `date`.
    #[tracing::instrument(skip_all, fields(filter = %filter))]
    pub fn compose(
        &self,
        strip: &FinalStrip,
        filter: FilterMode,
        date: NaiveDate,
    ) -> Result<ComposedStrip, ComposeError> {
        let layout = &self.layout;
        let mut canvas = self.create_surface()?;

        let backend = self.backend;
        let decoded: Vec<RgbaImage> = strip.frames()[..]
            .par_iter()
            .map(|frame| match filter {
                FilterMode::Monochrome => decode_grayscale(backend, frame.image()),
                FilterMode::Natural => backend.decode(frame.image()),
            })
            .collect::<Result<_, _>>()?;

        let slot = (layout.frame_width, layout.frame_height);
        for (index, (frame, image)) in strip.iter().zip(&decoded).enumerate() {
            debug!(index, frame = %frame.id(), source = ?image.dimensions(), "drawing frame");
            draw_cover(&mut canvas, image, layout.slot_origin(index), slot);
        }

        let caption = Caption::new(self.style.label.clone(), date);
        render_caption(&mut canvas, layout, &self.style, &self.fonts, &caption);

        Ok(ComposedStrip {
            image: canvas,
            caption,
            filter,
        })
    }

    fn create_surface(&self) -> Result<RgbaImage, ComposeError> {
        let (width, height) = (self.layout.width, self.layout.height);
        let unavailable = ComposeError::RenderSurfaceUnavailable { width, height };
        if width == 0 || height == 0 || width > MAX_STRIP_SIDE || height > MAX_STRIP_SIDE {
            return Err(unavailable);
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| ComposeError::RenderSurfaceUnavailable { width, height })?;

        let mut buf = Vec::new();
        if let Err(e) = buf.try_reserve_exact(len) {
            warn!(width, height, error = %e, "cannot allocate drawing surface");
            return Err(unavailable);
        }
        let [r, g, b] = self.paper;
        for _ in 0..(len / 4) {
            buf.extend_from_slice(&[r, g, b, 255]);
        }
        RgbaImage::from_raw(width, height, buf).ok_or(unavailable)
    }
}

/// `#f5f1e8`
const DEFAULT_PAPER: [u8; 3] = [0xf5, 0xf1, 0xe8];
