//! # Photo Strip
//!
//! A photo-booth strip compositor. Four frames, taken with a camera countdown
//! or picked from existing photos, are stacked on a paper-colored strip with a
//! dated caption and exported as a single JPEG.
//!
//! # Architecture: Collect → Compose → Export
//!
//! ```text
//! 1. Collect   camera / uploads  →  Session        (selection of 1-4 frames)
//! 2. Build     selection         →  FinalStrip     (exactly 4, repeats fill gaps)
//! 3. Compose   FinalStrip        →  ComposedStrip  (720x2316 bitmap + caption)
//! 4. Export    ComposedStrip     →  Delivery       (share sheet, download, link)
//! ```
//!
//! Only the [`session`] holds mutable state. Everything downstream of it is a
//! function of its inputs: the same strip, filter and date always compose to
//! the same pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Capture/selection state machine: steps, countdown, keep/retake, uploads |
//! | [`camera`] | Camera collaborator trait, scoped stream guard, file-backed stills camera |
//! | [`timer`] | Single-slot cancellable timer used for countdowns |
//! | [`frames`] | Builds the four-frame [`frames::FinalStrip`] from a selection |
//! | [`compose`] | Renders a strip onto the paper canvas |
//! | [`caption`] | Caption text, date formatting, glyph rendering |
//! | [`export`] | Encodes and delivers the strip through share/download tiers |
//! | [`imaging`] | Pure-Rust image operations: crop, cover fit, grayscale, codecs |
//! | [`config`] | `photo-strip.toml` loading, validation, merging |
//! | [`types`] | Shared types: frames, frame ids, filter mode |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Timers Are Data
//!
//! The session never sleeps or spawns. Each delay is a [`timer::Timer`] the
//! caller waits out and hands back by id. Arming a new timer invalidates the
//! old id, so a countdown replaced by a retake cannot fire a second shot, and
//! tests drive a whole capture session without touching a clock.
//!
//! ## The Camera Is a Guard
//!
//! A live feed only exists inside a [`camera::CameraStream`], which stops the
//! feed on drop. Releasing the camera is dropping the stream; resetting,
//! finishing a strip, failing mid-capture or dropping the session all release
//! it the same way.
//!
//! ## Decode in Parallel, Draw in Order
//!
//! The compositor decodes and filters the four frames on the rayon pool, then
//! draws them one at a time onto the single canvas in strip order.
//!
//! ## One Grayscale
//!
//! Monochrome is BT.601 luma (`0.299 R + 0.587 G + 0.114 B`) everywhere, and it
//! is only applied at render time. Stored frames are never filtered.

pub mod camera;
pub mod caption;
pub mod compose;
pub mod config;
pub mod export;
pub mod frames;
pub mod imaging;
pub mod output;
pub mod session;
pub mod timer;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
