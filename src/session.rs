//! Capture/selection state machine.
//!
//! One [`Session`] owns everything a strip is built from: the current
//! [`AppStep`], the selection, the capture cursor, the live camera stream,
//! the pending countdown timer and the memoized [`FinalStrip`]. Callers drive
//! it only through the transition methods below; every method either performs
//! its whole transition or returns an error and leaves the session untouched
//! (apart from releasing the camera when the camera itself failed).
//!
//! ## Step Graph
//!
//! ```text
//! choose-method ──open_camera──▶ camera-preview ──start_capture──▶ camera-capture
//!       │                                                      │  lead-in → 3 → 2 → 1 → shot
//!       │                                                      │  keep / retake
//!       │                                                      ▼
//!       ├──add_photos──▶ gallery-select ──create_strip──▶ creating-magic ──3 s──▶ preview-strip
//!       │                                                                          │
//!       ◀──────────────────────────────── reset ───────────────────────────────────┘
//! ```
//!
//! ## Time
//!
//! The session never sleeps. Every delay (lead-in, countdown tick, the
//! creating-magic pause) is armed in a single [`TimerSlot`]; the driver reads
//! [`Session::pending_timer`], waits `delay`, and calls [`Session::fire`] with
//! the id. Arming replaces the previous timer, so a stale id fired late is
//! ignored instead of capturing twice.

use crate::camera::{Camera, CameraError, CameraStream, StreamConstraints};
use crate::config::PhotoStripConfig;
use crate::frames::{FinalStrip, FrameSetError, build_final_strip};
use crate::imaging::{BackendError, CropParams, ImageBackend, Quality, crop_to_aspect, encode_still};
use crate::timer::{Timer, TimerId, TimerSlot};
use crate::types::{FRAMES_PER_STRIP, FilterMode, Frame, FrameId, FrameSource};
use rayon::prelude::*;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown whenever the camera cannot be opened or drops out.
pub const CAMERA_ERROR_MESSAGE: &str =
    "Unable to access camera. Please check permissions and try again.";

/// Duration of one countdown step (3 → 2 → 1 → shot).
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(#[from] CameraError),
    #[error("Cannot {action} during {step}")]
    InvalidTransition { action: &'static str, step: AppStep },
    #[error(transparent)]
    InvalidInput(#[from] FrameSetError),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
}

impl SessionError {
    /// Text to put in front of the user, if this error is user-visible at all.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            SessionError::CameraUnavailable(_) => Some(CAMERA_ERROR_MESSAGE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppStep {
    ChooseMethod,
    CameraPreview,
    CameraCapture,
    GallerySelect,
    CreatingMagic,
    PreviewStrip,
}

impl AppStep {
    pub fn as_str(self) -> &'static str {
        match self {
            AppStep::ChooseMethod => "choose-method",
            AppStep::CameraPreview => "camera-preview",
            AppStep::CameraCapture => "camera-capture",
            AppStep::GallerySelect => "gallery-select",
            AppStep::CreatingMagic => "creating-magic",
            AppStep::PreviewStrip => "preview-strip",
        }
    }

    /// Progress bar percentage for this step.
    pub fn progress(self) -> u8 {
        match self {
            AppStep::ChooseMethod => 25,
            AppStep::CameraPreview => 40,
            AppStep::CameraCapture | AppStep::GallerySelect => 60,
            AppStep::CreatingMagic => 80,
            AppStep::PreviewStrip => 100,
        }
    }

    /// Step heading. `cursor` only matters during capture.
    pub fn title(self, cursor: usize) -> String {
        match self {
            AppStep::ChooseMethod => "Choose Your Method".into(),
            AppStep::CameraPreview => "Camera Ready".into(),
            AppStep::CameraCapture => format!("Frame {} of {}", cursor + 1, FRAMES_PER_STRIP),
            AppStep::GallerySelect => "Curate Selection".into(),
            AppStep::CreatingMagic => "Creating Magic".into(),
            AppStep::PreviewStrip => "Collection Ready".into(),
        }
    }
}

impl fmt::Display for AppStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state of [`AppStep::CameraCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Waiting for the countdown to begin.
    LeadIn,
    /// Counting down; `remaining` is the number on screen.
    CountingDown { remaining: u32 },
    /// A shot is waiting for keep or retake.
    Reviewing,
}

/// What an armed timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    StartCountdown,
    CountdownTick,
    MagicDone,
}

/// Timings and encode parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub countdown: u32,
    pub lead_in: Duration,
    pub next_shot: Duration,
    pub retake: Duration,
    pub magic: Duration,
    pub capture_quality: Quality,
    pub upload: CropParams,
    pub constraints: StreamConstraints,
}

impl SessionSettings {
    pub fn from_config(config: &PhotoStripConfig) -> Self {
        let capture = &config.capture;
        let quality = Quality::new(capture.quality);
        Self {
            countdown: capture.countdown,
            lead_in: Duration::from_millis(capture.lead_in_ms),
            next_shot: Duration::from_millis(capture.next_shot_ms),
            retake: Duration::from_millis(capture.retake_ms),
            magic: Duration::from_millis(capture.magic_ms),
            capture_quality: quality,
            upload: CropParams {
                output: (capture.upload_size[0], capture.upload_size[1]),
                quality,
                ..CropParams::upload()
            },
            constraints: StreamConstraints::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&PhotoStripConfig::default())
    }
}

/// One file handed over by the file picker.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// An upload that became a frame. `index` is its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPhoto {
    pub index: usize,
    pub id: FrameId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUpload {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Result of [`Session::add_photos`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddPhotosOutcome {
    pub added: Vec<AddedPhoto>,
    /// Uploads that were accepted but could not be decoded.
    pub skipped: Vec<SkippedUpload>,
    /// Uploads beyond the free slots, never looked at.
    pub ignored: usize,
}

/// What a fired timer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The id was replaced or cancelled; nothing happened.
    Stale,
    CountdownStarted(u32),
    Tick(u32),
    Captured,
    StripReady,
}

/// What [`Session::keep`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepOutcome {
    NextFrame { cursor: usize },
    StripReady,
}

pub struct Session<C: Camera, B: ImageBackend> {
    camera: C,
    backend: B,
    settings: SessionSettings,
    step: AppStep,
    phase: Option<CapturePhase>,
    stream: Option<CameraStream<C::Feed>>,
    selection: Vec<Frame>,
    pending_shot: Option<Frame>,
    final_strip: Option<FinalStrip>,
    cursor: usize,
    filter: FilterMode,
    timer: TimerSlot<TimerKind>,
    camera_error: Option<&'static str>,
}

impl<C: Camera, B: ImageBackend> Session<C, B> {
    pub fn new(camera: C, backend: B, settings: SessionSettings) -> Self {
        Self {
            camera,
            backend,
            settings,
            step: AppStep::ChooseMethod,
            phase: None,
            stream: None,
            selection: Vec::with_capacity(FRAMES_PER_STRIP),
            pending_shot: None,
            final_strip: None,
            cursor: 0,
            filter: FilterMode::default(),
            timer: TimerSlot::new(),
            camera_error: None,
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn step(&self) -> AppStep {
        self.step
    }

    pub fn capture_phase(&self) -> Option<CapturePhase> {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> &[Frame] {
        &self.selection
    }

    /// The shot currently under review.
    pub fn pending_shot(&self) -> Option<&Frame> {
        self.pending_shot.as_ref()
    }

    /// The memoized strip, present only in preview-strip.
    pub fn final_strip(&self) -> Option<&FinalStrip> {
        self.final_strip.as_ref()
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn camera_error(&self) -> Option<&'static str> {
        self.camera_error
    }

    pub fn camera_live(&self) -> bool {
        self.stream.is_some()
    }

    pub fn pending_timer(&self) -> Option<Timer<TimerKind>> {
        self.timer.pending()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn title(&self) -> String {
        self.step.title(self.cursor)
    }

    // ---------------------------------------------------------------------
    // Camera path
    // ---------------------------------------------------------------------

    /// Acquire the camera and show the live preview.
    ///
    /// Any stream still held is torn down first. On failure the session stays
    /// in choose-method with [`CAMERA_ERROR_MESSAGE`] recorded.
    pub fn open_camera(&mut self) -> Result<(), SessionError> {
        self.require(&[AppStep::ChooseMethod], "open the camera")?;
        self.release_camera();
        self.camera_error = None;

        match self.camera.acquire(&self.settings.constraints) {
            Ok(feed) => {
                self.stream = Some(CameraStream::new(feed));
                self.enter(AppStep::CameraPreview);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "camera acquisition failed");
                self.camera_error = Some(CAMERA_ERROR_MESSAGE);
                Err(SessionError::CameraUnavailable(e))
            }
        }
    }

    /// Begin capturing frame 1 of 4 from the live preview.
    pub fn start_capture(&mut self) -> Result<(), SessionError> {
        self.require(&[AppStep::CameraPreview], "start capturing")?;
        self.selection.clear();
        self.pending_shot = None;
        self.final_strip = None;
        self.cursor = 0;
        self.enter(AppStep::CameraCapture);
        self.arm_countdown(self.settings.lead_in);
        Ok(())
    }

    /// Acquire the camera and go straight into capture.
    pub fn start_camera(&mut self) -> Result<(), SessionError> {
        self.open_camera()?;
        self.start_capture()
    }

    /// Keep the shot under review.
    ///
    /// On the last slot the strip is built, the camera released and the
    /// session moves to preview-strip; otherwise the next countdown is armed.
    pub fn keep(&mut self) -> Result<KeepOutcome, SessionError> {
        self.require_reviewing("keep a shot")?;
        let Some(frame) = self.pending_shot.take() else {
            return Err(self.invalid("keep a shot"));
        };
        debug!(frame = %frame.id(), cursor = self.cursor, "shot kept");
        self.selection.push(frame);

        if self.cursor + 1 >= FRAMES_PER_STRIP {
            self.finish_strip()?;
            return Ok(KeepOutcome::StripReady);
        }

        self.cursor += 1;
        self.arm_countdown(self.settings.next_shot);
        Ok(KeepOutcome::NextFrame {
            cursor: self.cursor,
        })
    }

    /// Discard the shot under review and count down again for the same slot.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        self.require_reviewing("retake a shot")?;
        if let Some(frame) = self.pending_shot.take() {
            debug!(frame = %frame.id(), cursor = self.cursor, "shot discarded");
        }
        self.arm_countdown(self.settings.retake);
        Ok(())
    }

    /// Leave the camera and drop everything captured so far.
    pub fn close_camera(&mut self) -> Result<(), SessionError> {
        self.require(
            &[AppStep::CameraPreview, AppStep::CameraCapture],
            "close the camera",
        )?;
        self.abort_camera();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Gallery path
    // ---------------------------------------------------------------------

    /// Crop uploads to 4:3 and append them to the selection.
    ///
    /// Only as many uploads as there are free slots are looked at; the rest
    /// are counted in [`AddPhotosOutcome::ignored`]. Uploads that fail to
    /// decode are skipped and reported, the others still go in.
    pub fn add_photos(&mut self, uploads: Vec<Upload>) -> Result<AddPhotosOutcome, SessionError> {
        self.require(
            &[AppStep::ChooseMethod, AppStep::GallerySelect],
            "add photos",
        )?;
        if uploads.is_empty() {
            return Ok(AddPhotosOutcome::default());
        }
        if self.step == AppStep::ChooseMethod {
            self.camera_error = None;
            self.enter(AppStep::GallerySelect);
        }

        let room = FRAMES_PER_STRIP.saturating_sub(self.selection.len());
        let ignored = uploads.len().saturating_sub(room);
        let accepted = &uploads[..uploads.len() - ignored];

        let backend = &self.backend;
        let params = &self.settings.upload;
        let cropped: Vec<_> = accepted
            .par_iter()
            .map(|upload| crop_to_aspect(backend, &upload.bytes, params))
            .collect();

        let mut outcome = AddPhotosOutcome {
            ignored,
            ..AddPhotosOutcome::default()
        };
        for (index, (upload, result)) in accepted.iter().zip(cropped).enumerate() {
            match result {
                Ok(bytes) => {
                    let frame = Frame::new(FrameId::fresh(FrameSource::Gallery), bytes);
                    debug!(upload = %upload.name, frame = %frame.id(), "photo added");
                    outcome.added.push(AddedPhoto {
                        index,
                        id: frame.id().clone(),
                    });
                    self.selection.push(frame);
                }
                Err(e) => {
                    warn!(upload = %upload.name, error = %e, "skipping unreadable upload");
                    outcome.skipped.push(SkippedUpload {
                        index,
                        name: upload.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if ignored > 0 {
            info!(ignored, "selection full, extra uploads ignored");
        }
        Ok(outcome)
    }

    /// Remove a selected photo. Returns whether anything was removed.
    pub fn remove_photo(&mut self, id: &FrameId) -> Result<bool, SessionError> {
        self.require(&[AppStep::GallerySelect], "remove a photo")?;
        let before = self.selection.len();
        self.selection.retain(|f| f.id() != id);
        Ok(self.selection.len() != before)
    }

    /// Start creating the strip from the current selection.
    pub fn create_strip(&mut self) -> Result<(), SessionError> {
        self.require(&[AppStep::GallerySelect], "create a strip")?;
        if self.selection.is_empty() {
            return Err(FrameSetError::InvalidInput.into());
        }
        self.enter(AppStep::CreatingMagic);
        self.timer.arm(TimerKind::MagicDone, self.settings.magic);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Anywhere
    // ---------------------------------------------------------------------

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    /// Back to choose-method with nothing selected, nothing held.
    pub fn reset(&mut self) {
        self.release_camera();
        self.timer.cancel();
        self.selection.clear();
        self.pending_shot = None;
        self.final_strip = None;
        self.cursor = 0;
        self.phase = None;
        self.filter = FilterMode::Natural;
        self.camera_error = None;
        self.enter(AppStep::ChooseMethod);
    }

    /// Deliver an elapsed timer.
    pub fn fire(&mut self, id: TimerId) -> Result<TimerOutcome, SessionError> {
        let Some(kind) = self.timer.fire(id) else {
            debug!(?id, "ignoring stale timer");
            return Ok(TimerOutcome::Stale);
        };
        debug!(?id, ?kind, "timer fired");

        match (kind, self.phase) {
            (TimerKind::StartCountdown, Some(CapturePhase::LeadIn)) => {
                let remaining = self.settings.countdown;
                self.phase = Some(CapturePhase::CountingDown { remaining });
                self.timer.arm(TimerKind::CountdownTick, COUNTDOWN_TICK);
                Ok(TimerOutcome::CountdownStarted(remaining))
            }
            (TimerKind::CountdownTick, Some(CapturePhase::CountingDown { remaining }))
                if remaining > 1 =>
            {
                let remaining = remaining - 1;
                self.phase = Some(CapturePhase::CountingDown { remaining });
                self.timer.arm(TimerKind::CountdownTick, COUNTDOWN_TICK);
                Ok(TimerOutcome::Tick(remaining))
            }
            (TimerKind::CountdownTick, Some(CapturePhase::CountingDown { .. })) => {
                self.capture()?;
                Ok(TimerOutcome::Captured)
            }
            (TimerKind::MagicDone, _) if self.step == AppStep::CreatingMagic => {
                self.finish_strip()?;
                Ok(TimerOutcome::StripReady)
            }
            _ => Ok(TimerOutcome::Stale),
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn capture(&mut self) -> Result<(), SessionError> {
        let grabbed = match self.stream.as_mut() {
            Some(stream) => stream.grab(),
            None => Err(CameraError::Unavailable("stream not open".into())),
        };
        let still = match grabbed {
            Ok(still) => still,
            Err(e) => {
                warn!(error = %e, "capture failed, leaving camera");
                self.abort_camera();
                self.camera_error = Some(CAMERA_ERROR_MESSAGE);
                return Err(e.into());
            }
        };

        match encode_still(&self.backend, &still, self.settings.capture_quality) {
            Ok(bytes) => {
                let frame = Frame::new(FrameId::fresh(FrameSource::Camera), bytes);
                info!(frame = %frame.id(), cursor = self.cursor, "shot captured");
                self.pending_shot = Some(frame);
                self.phase = Some(CapturePhase::Reviewing);
                Ok(())
            }
            Err(e) => {
                // Same slot, fresh countdown.
                self.arm_countdown(self.settings.retake);
                Err(e.into())
            }
        }
    }

    /// Build and memoize the strip, then show it.
    fn finish_strip(&mut self) -> Result<(), SessionError> {
        let strip = build_final_strip(&self.selection)?;
        self.selection.clear();
        self.final_strip = Some(strip);
        self.release_camera();
        self.timer.cancel();
        self.pending_shot = None;
        self.cursor = 0;
        self.phase = None;
        self.enter(AppStep::PreviewStrip);
        Ok(())
    }

    fn arm_countdown(&mut self, delay: Duration) {
        self.phase = Some(CapturePhase::LeadIn);
        self.timer.arm(TimerKind::StartCountdown, delay);
    }

    fn abort_camera(&mut self) {
        self.release_camera();
        self.timer.cancel();
        self.selection.clear();
        self.pending_shot = None;
        self.cursor = 0;
        self.phase = None;
        self.enter(AppStep::ChooseMethod);
    }

    fn release_camera(&mut self) {
        if self.stream.take().is_some() {
            debug!("camera released");
        }
    }

    fn enter(&mut self, step: AppStep) {
        if self.step != step {
            info!(from = %self.step, to = %step, "step");
        }
        self.step = step;
    }

    fn require(&self, allowed: &[AppStep], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn require_reviewing(&self, action: &'static str) -> Result<(), SessionError> {
        self.require(&[AppStep::CameraCapture], action)?;
        if self.phase == Some(CapturePhase::Reviewing) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            step: self.step,
        }
    }
}
