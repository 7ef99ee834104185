//! CLI output formatting for a strip session.
//!
//! # Output Format
//!
//! ```text
//! [60%] Curate Selection
//! 001 gallery-3 ← beach.jpg
//! 002 gallery-4 ← dunes.png
//!     Skipped: notes.jpg (Image decode failed: ...)
//!     Ignored: 2 photos (selection holds 4)
//! [80%] Creating Magic
//! [100%] Collection Ready
//! Strip (monochrome, 720x2316)
//!     001 gallery-3
//!     002 gallery-4
//!     003 duplicate-7
//!     004 duplicate-8
//!     Caption: PHOTO COLLECTION / Jan 5, 2024
//! Downloaded → out/photo-strip-monochrome-1717171717171.jpg
//! ```
//!
//! Camera sessions print the countdown as it runs:
//!
//! ```text
//! [60%] Frame 1 of 4
//!     3... 2... 1...
//!     Captured camera-12
//! ```
//!
//! # Architecture
//!
//! Every event has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and, where the CLI needs it, a `print_*` wrapper that
//! writes to stdout. Format functions are pure: no I/O, no side effects.

use crate::compose::ComposedStrip;
use crate::export::{DownloadOutcome, ShareOutcome};
use crate::frames::FinalStrip;
use crate::session::{AddPhotosOutcome, AppStep, TimerOutcome};
use crate::types::FrameId;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Step header with its progress percentage.
///
/// ```text
/// [60%] Frame 2 of 4
/// ```
pub fn format_step(step: AppStep, cursor: usize) -> String {
    format!("[{}%] {}", step.progress(), step.title(cursor))
}

pub fn print_step(step: AppStep, cursor: usize) {
    println!("{}", format_step(step, cursor));
}

/// Result of adding uploads. `names` are the upload names in the order they
/// were offered; accepted uploads are listed against their new frame id.
pub fn format_add_photos(outcome: &AddPhotosOutcome, names: &[String], first_index: usize) -> Vec<String> {
    let mut lines: Vec<String> = outcome
        .added
        .iter()
        .enumerate()
        .map(|(i, added)| {
            let name = names.get(added.index).map_or("?", String::as_str);
            format!("{} {} ← {}", format_index(first_index + i), added.id, name)
        })
        .collect();
    for skip in &outcome.skipped {
        lines.push(format!("{}Skipped: {} ({})", indent(1), skip.name, skip.reason));
    }
    if outcome.ignored > 0 {
        lines.push(format!(
            "{}Ignored: {} (selection holds 4)",
            indent(1),
            plural(outcome.ignored, "photo")
        ));
    }
    lines
}

pub fn print_add_photos(outcome: &AddPhotosOutcome, names: &[String], first_index: usize) {
    for line in format_add_photos(outcome, names, first_index) {
        println!("{}", line);
    }
}

/// Countdown progress. `None` for timers that print nothing.
pub fn format_timer_outcome(outcome: TimerOutcome, shot: Option<&FrameId>) -> Option<String> {
    match outcome {
        TimerOutcome::CountdownStarted(n) | TimerOutcome::Tick(n) => {
            Some(format!("{}{}...", indent(1), n))
        }
        TimerOutcome::Captured => Some(match shot {
            Some(id) => format!("{}Captured {}", indent(1), id),
            None => format!("{}Captured", indent(1)),
        }),
        TimerOutcome::Stale | TimerOutcome::StripReady => None,
    }
}

pub fn print_timer_outcome(outcome: TimerOutcome, shot: Option<&FrameId>) {
    if let Some(line) = format_timer_outcome(outcome, shot) {
        println!("{}", line);
    }
}

/// Composed strip: filter, size, frame order and caption.
pub fn format_strip(strip: &FinalStrip, composed: &ComposedStrip) -> Vec<String> {
    let (w, h) = composed.image.dimensions();
    let mut lines = vec![format!("Strip ({}, {}x{})", composed.filter, w, h)];
    for (i, frame) in strip.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), frame.id()));
    }
    lines.push(format!(
        "{}Caption: {} / {}",
        indent(1),
        composed.caption.label,
        composed.caption.date_text
    ));
    lines
}

pub fn print_strip(strip: &FinalStrip, composed: &ComposedStrip) {
    for line in format_strip(strip, composed) {
        println!("{}", line);
    }
}

pub fn format_download_outcome(outcome: &DownloadOutcome) -> Vec<String> {
    match outcome {
        DownloadOutcome::Shared { file_name } => vec![format!("Shared → {}", file_name)],
        DownloadOutcome::Downloaded { path, .. } => {
            vec![format!("Downloaded → {}", path.display())]
        }
    }
}

pub fn print_download_outcome(outcome: &DownloadOutcome) {
    for line in format_download_outcome(outcome) {
        println!("{}", line);
    }
}

pub fn format_share_outcome(outcome: &ShareOutcome) -> Vec<String> {
    let mut lines = vec![match outcome {
        ShareOutcome::SharedFile { file_name } => format!("Shared → {}", file_name),
        ShareOutcome::SharedLink { url } => format!("Shared link → {}", url),
        ShareOutcome::CopiedLink { url, .. } => format!("Copied → {}", url),
        ShareOutcome::ManualCopy { url } => format!("Share manually → {}", url),
    }];
    if let Some(message) = outcome.message() {
        lines.push(format!("{}{}", indent(1), message));
    }
    lines
}

pub fn print_share_outcome(outcome: &ShareOutcome) {
    for line in format_share_outcome(outcome) {
        println!("{}", line);
    }
}
