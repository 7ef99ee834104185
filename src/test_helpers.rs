//! Shared test utilities for the photo-strip test suite.
//!
//! Provides synthetic encoded images and a scripted camera whose stream
//! lifecycle can be observed after it has been moved into a session.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let camera = ScriptedCamera::new();
//! let stats = camera.stats();
//! let mut session = Session::new(camera, MockBackend::new(), SessionSettings::default());
//! session.start_camera().unwrap();
//! assert_eq!(stats.live(), 1);
//! ```

use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use crate::camera::{Camera, CameraError, StreamConstraints, VideoFeed};

// =========================================================================
// Synthetic images
// =========================================================================

/// A small valid JPEG with a gradient, `width` x `height`.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A solid-color RGBA PNG.
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

// =========================================================================
// Scripted camera
// =========================================================================

/// Counters shared between a [`ScriptedCamera`] and the test.
#[derive(Debug, Default)]
pub struct CameraStats {
    live: AtomicIsize,
    acquired: AtomicUsize,
    grabs: AtomicUsize,
}

impl CameraStats {
    /// Streams acquired and not yet stopped.
    pub fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }
}

/// Camera producing solid 64x48 frames whose red channel is the grab count.
pub struct ScriptedCamera {
    stats: Arc<CameraStats>,
    deny: bool,
    broken_feed: bool,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(CameraStats::default()),
            deny: false,
            broken_feed: false,
        }
    }

    /// A camera whose permission is denied.
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    /// A camera that opens but fails on every grab.
    pub fn broken_feed() -> Self {
        Self {
            broken_feed: true,
            ..Self::new()
        }
    }

    pub fn stats(&self) -> Arc<CameraStats> {
        Arc::clone(&self.stats)
    }

    pub fn live_streams(&self) -> isize {
        self.stats.live()
    }
}

impl Camera for ScriptedCamera {
    type Feed = ScriptedFeed;

    fn acquire(&mut self, _constraints: &StreamConstraints) -> Result<ScriptedFeed, CameraError> {
        if self.deny {
            return Err(CameraError::Unavailable("permission denied".into()));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedFeed {
            stats: Arc::clone(&self.stats),
            broken: self.broken_feed,
        })
    }
}

pub struct ScriptedFeed {
    stats: Arc<CameraStats>,
    broken: bool,
}

impl VideoFeed for ScriptedFeed {
    fn grab(&mut self) -> Result<RgbaImage, CameraError> {
        if self.broken {
            return Err(CameraError::Feed("device disconnected".into()));
        }
        let n = self.stats.grabs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RgbaImage::from_pixel(64, 48, Rgba([n as u8, 0, 0, 255])))
    }

    fn stop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}
