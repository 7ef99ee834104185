//! Strip caption: the label line and the date line in the bottom band.
//!
//! Text is laid out and rasterized with `fontdue` and alpha-blended onto the
//! canvas. Both lines are horizontally centered on the strip and vertically
//! centered on their own offset from the middle of the caption band.
//!
//! DejaVu Sans (bold for the label, regular for the date) is compiled in, so
//! every strip carries both lines. `caption.label_font` / `caption.date_font`
//! replace either face with a TTF/OTF from disk.

use chrono::NaiveDate;
use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign,
};
use fontdue::{Font, FontSettings};
use image::RgbaImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::config::PhotoStripConfig;
use crate::imaging::StripLayout;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse font {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// The two caption lines of a strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caption {
    pub label: String,
    pub date_text: String,
}

impl Caption {
    pub fn new(label: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            label: label.into(),
            date_text: format_caption_date(date),
        }
    }
}

/// `Jan 5, 2024`: short month, unpadded day, four-digit year.
pub fn format_caption_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Unscaled caption styling, resolved from `[caption]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub label: String,
    pub label_color: [u8; 3],
    pub date_color: [u8; 3],
    pub label_size: f32,
    pub date_size: f32,
    /// Distance of each line from the band center.
    pub line_offset: f32,
}

impl CaptionStyle {
    /// Colors are already validated by [`PhotoStripConfig::validate`].
    pub fn from_config(config: &PhotoStripConfig) -> Self {
        let caption = &config.caption;
        Self {
            label: caption.label.clone(),
            label_color: crate::config::parse_hex_color(&caption.label_color).unwrap_or([0; 3]),
            date_color: crate::config::parse_hex_color(&caption.date_color).unwrap_or([0; 3]),
            label_size: caption.label_size,
            date_size: caption.date_size,
            line_offset: caption.line_offset,
        }
    }
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self::from_config(&PhotoStripConfig::default())
    }
}

/// DejaVu Sans Bold, drawn for the label unless `caption.label_font` is set.
const BUNDLED_BOLD: &[u8] = include_bytes!("../assets/fonts/dejavu/DejaVuSans-Bold.ttf");
/// DejaVu Sans, drawn for the date unless `caption.date_font` is set.
const BUNDLED_REGULAR: &[u8] = include_bytes!("../assets/fonts/dejavu/DejaVuSans.ttf");

/// Fonts for the two lines. A line without a font is not drawn.
pub struct CaptionFonts {
    pub label: Option<Font>,
    pub date: Option<Font>,
}

impl CaptionFonts {
    /// No fonts at all; the band stays plain paper.
    pub fn empty() -> Self {
        Self {
            label: None,
            date: None,
        }
    }

    /// The bundled DejaVu Sans pair: bold label, regular date.
    pub fn bundled() -> Result<Self, FontError> {
        Ok(Self {
            label: Some(parse_font(BUNDLED_BOLD, Path::new("DejaVuSans-Bold.ttf"))?),
            date: Some(parse_font(BUNDLED_REGULAR, Path::new("DejaVuSans.ttf"))?),
        })
    }

    /// Fonts from `[caption]`, with the bundled pair for any line that
    /// names no font file.
    pub fn from_config(config: &PhotoStripConfig) -> Result<Self, FontError> {
        let caption = &config.caption;
        let label = match caption.label_font.as_deref() {
            Some(path) => load_font(path)?,
            None => parse_font(BUNDLED_BOLD, Path::new("DejaVuSans-Bold.ttf"))?,
        };
        let date = match caption.date_font.as_deref() {
            Some(path) => load_font(path)?,
            None => parse_font(BUNDLED_REGULAR, Path::new("DejaVuSans.ttf"))?,
        };
        Ok(Self {
            label: Some(label),
            date: Some(date),
        })
    }
}

impl Default for CaptionFonts {
    fn default() -> Self {
        Self::bundled().unwrap_or_else(|e| {
            warn!(error = %e, "bundled caption fonts unusable, caption band will be blank");
            Self::empty()
        })
    }
}

pub fn load_font(path: &Path) -> Result<Font, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_font(&bytes, path)
}

fn parse_font(bytes: &[u8], path: &Path) -> Result<Font, FontError> {
    Font::from_bytes(bytes, FontSettings::default()).map_err(|message| FontError::Parse {
        path: path.to_path_buf(),
        message: message.to_string(),
    })
}

/// Draw both caption lines into the band of `canvas`.
pub fn render_caption(
    canvas: &mut RgbaImage,
    layout: &StripLayout,
    style: &CaptionStyle,
    fonts: &CaptionFonts,
    caption: &Caption,
) {
    let scale = layout.scale as f32;
    let center = layout.caption_center_y();
    let offset = style.line_offset * scale;

    if let Some(font) = &fonts.label {
        draw_centered_line(
            canvas,
            font,
            &caption.label,
            style.label_size * scale,
            center - offset,
            style.label_color,
        );
    }
    if let Some(font) = &fonts.date {
        draw_centered_line(
            canvas,
            font,
            &caption.date_text,
            style.date_size * scale,
            center + offset,
            style.date_color,
        );
    }
}

/// Draw one line of text centered on the canvas width and on `center_y`.
pub fn draw_centered_line(
    canvas: &mut RgbaImage,
    font: &Font,
    text: &str,
    size: f32,
    center_y: f32,
    color: [u8; 3],
) {
    if text.is_empty() {
        return;
    }
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x: 0.0,
        y: center_y - size,
        max_width: Some(canvas.width() as f32),
        max_height: Some(size * 2.0),
        horizontal_align: HorizontalAlign::Center,
        vertical_align: VerticalAlign::Middle,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(text, size, 0));

    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (_, coverage) = font.rasterize_config(glyph.key);
        blend_glyph(
            canvas,
            glyph.x.round() as i32,
            glyph.y.round() as i32,
            glyph.width,
            &coverage,
            color,
        );
    }
}

/// Blend a coverage mask of `width` columns onto the canvas at `(x, y)`.
fn blend_glyph(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    width: usize,
    coverage: &[u8],
    color: [u8; 3],
) {
    let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);
    for (i, &mask) in coverage.iter().enumerate() {
        if mask == 0 {
            continue;
        }
        let px = x + (i % width) as i32;
        let py = y + (i / width) as i32;
        if px < 0 || py < 0 || px >= canvas_w || py >= canvas_h {
            continue;
        }
        let pixel = canvas.get_pixel_mut(px as u32, py as u32);
        blend_pixel(&mut pixel.0, color, mask);
    }
}

fn blend_pixel(dst: &mut [u8; 4], color: [u8; 3], alpha: u8) {
    let alpha = u16::from(alpha);
    let inv = 255 - alpha;
    for c in 0..3 {
        let blended = (u16::from(color[c]) * alpha + u16::from(dst[c]) * inv + 127) / 255;
        dst[c] = blended as u8;
    }
    dst[3] = 255;
}
