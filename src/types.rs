//! Shared types used across the capture session, compositor and exporter.
//!
//! A [`Frame`] is one logical photo of a strip. Frames are immutable once
//! created: the encoded image bytes never change, and the id stays with the
//! frame for its whole life. Duplicates made to fill a strip get a fresh id
//! but share the image content of their source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every composited strip holds exactly this many frames.
pub const FRAMES_PER_STRIP: usize = 4;

/// Monotonic counter behind [`FrameId::fresh`]. Only uniqueness matters.
static NEXT_FRAME_SEQ: AtomicU64 = AtomicU64::new(1);

/// Where a frame came from. Used as the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    Camera,
    Gallery,
    Duplicate,
}

impl FrameSource {
    fn prefix(self) -> &'static str {
        match self {
            FrameSource::Camera => "camera",
            FrameSource::Gallery => "gallery",
            FrameSource::Duplicate => "duplicate",
        }
    }
}

/// Opaque, process-unique frame identifier (`camera-3`, `gallery-7`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Allocate a new id that no other frame in this process carries.
    pub fn fresh(source: FrameSource) -> Self {
        let seq = NEXT_FRAME_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", source.prefix(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One photo of a strip: an id plus its JPEG-encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: FrameId,
    image: Vec<u8>,
}

impl Frame {
    pub fn new(id: FrameId, image: Vec<u8>) -> Self {
        Self { id, image }
    }

    pub fn id(&self) -> &FrameId {
        &self.id
    }

    /// Encoded image bytes (JPEG for captured and uploaded frames).
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Same image, new identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: FrameId::fresh(FrameSource::Duplicate),
            image: self.image.clone(),
        }
    }
}

/// Render-time color treatment. Never alters stored frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Natural,
    Monochrome,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Natural => "natural",
            FilterMode::Monochrome => "monochrome",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "natural" | "color" => Ok(FilterMode::Natural),
            "monochrome" | "mono" | "bw" => Ok(FilterMode::Monochrome),
            other => Err(format!(
                "unknown filter '{other}' (expected 'natural' or 'monochrome')"
            )),
        }
    }
}
