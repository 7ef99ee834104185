//! Frame set builder: turn 1–4 selected frames into exactly four.
//!
//! Positions that have a source frame use it verbatim. Missing positions
//! repeat the sources cyclically (`i mod n`) as duplicates: same image,
//! fresh id. An empty selection is a caller bug and is rejected.

use crate::types::{FRAMES_PER_STRIP, Frame};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameSetError {
    #[error("Invalid input: a strip needs at least one frame")]
    InvalidInput,
}

/// The four frames actually composited, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStrip {
    frames: [Frame; FRAMES_PER_STRIP],
}

impl FinalStrip {
    pub fn frames(&self) -> &[Frame; FRAMES_PER_STRIP] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        FRAMES_PER_STRIP
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<'a> IntoIterator for &'a FinalStrip {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Build a [`FinalStrip`] from the selected frames.
///
/// Frames beyond the fourth are ignored; a selection never holds more.
pub fn build_final_strip(selection: &[Frame]) -> Result<FinalStrip, FrameSetError> {
    let n = selection.len().min(FRAMES_PER_STRIP);
    if n == 0 {
        return Err(FrameSetError::InvalidInput);
    }

    let frames = std::array::from_fn(|i| {
        if i < n {
            selection[i].clone()
        } else {
            selection[i % n].duplicate()
        }
    });

    Ok(FinalStrip { frames })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameId, FrameSource};

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(FrameId::fresh(FrameSource::Gallery), vec![i as u8; 4]))
            .collect()
    }

    #[test]
    fn empty_selection_is_invalid_input() {
        assert_eq!(build_final_strip(&[]), Err(FrameSetError::InvalidInput));
    }

    #[test]
    fn always_four_frames_with_originals_first() {
        for n in 1..=4 {
            let input = frames(n);
            let strip = build_final_strip(&input).unwrap();
            assert_eq!(strip.len(), 4);

            for (i, frame) in strip.iter().enumerate() {
                if i < n {
                    assert_eq!(frame, &input[i], "n={n} position {i} should be verbatim");
                } else {
                    assert_eq!(frame.image(), input[i % n].image(), "n={n} position {i}");
                    assert_ne!(frame.id(), input[i % n].id());
                }
            }
        }
    }

    #[test]
    fn single_frame_repeats_four_times() {
        let input = frames(1);
        let strip = build_final_strip(&input).unwrap();
        assert!(strip.iter().all(|f| f.image() == input[0].image()));
    }

    #[test]
    fn three_frames_wrap_to_first() {
        let input = frames(3);
        let strip = build_final_strip(&input).unwrap();
        assert_eq!(strip.frames()[3].image(), input[0].image());
    }

    #[test]
    fn all_ids_distinct() {
        let input = frames(2);
        let strip = build_final_strip(&input).unwrap();
        let mut ids: Vec<&str> = strip.iter().map(|f| f.id().as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
