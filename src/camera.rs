//! Camera collaborator.
//!
//! A [`Camera`] hands out a [`VideoFeed`] for a set of [`StreamConstraints`].
//! The session never holds a bare feed: it wraps it in a [`CameraStream`],
//! which stops the feed when dropped. Releasing the camera is therefore just
//! dropping the stream, which is idempotent (`Option::take`) and also happens
//! on every early return and when the session itself goes away.
//!
//! [`StillsCamera`] is the file-backed camera used by the CLI: it replays
//! the images of a directory, in name order, as consecutive video frames.

use crate::imaging::{ImageBackend, RustBackend, supported_input_extensions};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),
    #[error("Camera feed failed: {0}")]
    Feed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    User,
    Environment,
}

/// What the session asks the camera for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: Facing,
    /// Preferred resolution; the device may deliver something else.
    pub ideal: (u32, u32),
    /// Lowest acceptable resolution.
    pub min: (u32, u32),
    pub audio: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: Facing::User,
            ideal: (1280, 720),
            min: (640, 480),
            audio: false,
        }
    }
}

/// A source of live video streams.
pub trait Camera {
    type Feed: VideoFeed;

    fn acquire(&mut self, constraints: &StreamConstraints) -> Result<Self::Feed, CameraError>;
}

/// One live stream.
pub trait VideoFeed {
    /// Grab the current frame.
    fn grab(&mut self) -> Result<RgbaImage, CameraError>;

    /// Stop all tracks. Called exactly once, by [`CameraStream`]'s `Drop`.
    fn stop(&mut self);
}

/// A live feed that is stopped when this guard is dropped.
pub struct CameraStream<F: VideoFeed> {
    feed: F,
}

impl<F: VideoFeed> CameraStream<F> {
    pub fn new(feed: F) -> Self {
        Self { feed }
    }

    pub fn grab(&mut self) -> Result<RgbaImage, CameraError> {
        self.feed.grab()
    }
}

impl<F: VideoFeed> Drop for CameraStream<F> {
    fn drop(&mut self) {
        self.feed.stop();
    }
}

/// A device without a camera. Every acquisition fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

/// Feed type of [`NoCamera`]; cannot be constructed.
pub enum NoFeed {}

impl Camera for NoCamera {
    type Feed = NoFeed;

    fn acquire(&mut self, _constraints: &StreamConstraints) -> Result<NoFeed, CameraError> {
        Err(CameraError::Unavailable("no camera on this device".into()))
    }
}

impl VideoFeed for NoFeed {
    fn grab(&mut self) -> Result<RgbaImage, CameraError> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}

/// Camera that replays still images from a directory.
pub struct StillsCamera {
    dir: PathBuf,
}

impl StillsCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_stills(dir: &Path) -> Vec<PathBuf> {
    let exts = supported_input_extensions();
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| exts.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();
    paths
}

impl Camera for StillsCamera {
    type Feed = StillsFeed;

    fn acquire(&mut self, constraints: &StreamConstraints) -> Result<StillsFeed, CameraError> {
        if !self.dir.is_dir() {
            return Err(CameraError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        let stills = list_stills(&self.dir);
        if stills.is_empty() {
            return Err(CameraError::Unavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        debug!(
            dir = %self.dir.display(),
            stills = stills.len(),
            ideal = ?constraints.ideal,
            "stills camera acquired"
        );
        Ok(StillsFeed {
            backend: RustBackend::new(),
            stills,
            next: 0,
            stopped: false,
        })
    }
}

/// Feed of a [`StillsCamera`]. Cycles through its stills forever.
pub struct StillsFeed {
    backend: RustBackend,
    stills: Vec<PathBuf>,
    next: usize,
    stopped: bool,
}

impl VideoFeed for StillsFeed {
    fn grab(&mut self) -> Result<RgbaImage, CameraError> {
        if self.stopped {
            return Err(CameraError::Feed("stream stopped".into()));
        }
        let path = &self.stills[self.next % self.stills.len()];
        self.next += 1;
        let bytes = std::fs::read(path)
            .map_err(|e| CameraError::Feed(format!("{}: {e}", path.display())))?;
        self.backend
            .decode(&bytes)
            .map_err(|e| CameraError::Feed(format!("{}: {e}", path.display())))
    }

    fn stop(&mut self) {
        if !self.stopped {
            debug!("stills camera stopped");
        }
        self.stopped = true;
    }
}
