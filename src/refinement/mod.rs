//! Timeline refinement
//!
//! Sequential cleanup and decoration passes over the tracked chord timeline:
//!
//! 1. Early-diatonic correction (intro chords outside the key)
//! 2. Minimum-duration filter
//! 3. Beat-grid snap
//! 4. Duplicate merge
//! 5. Extension decoration (7, maj7, sus2, sus4)
//! 6. Inversion decoration (slash bass)
//! 7. Diatonic validation filter, followed by a final merge
//!
//! The pass sequence is repeated until it no longer changes the timeline, so
//! refining an already refined timeline is a no-op.

pub mod diatonic;
pub mod duration;
pub mod extensions;
pub mod grid;
pub mod inversions;

use crate::analysis::result::{BeatGrid, ChordEvent, Key};
use crate::config::HarmonyMode;
use crate::features::chroma::smoothing::average_chroma;
use crate::features::chroma::FrameFeatures;
use std::ops::Range;

/// Everything the passes read besides the timeline itself
#[derive(Debug, Clone, Copy)]
pub struct RefinementContext<'a> {
    /// Frame features the timeline was tracked from
    pub features: &'a FrameFeatures,
    /// Current key
    pub key: Key,
    /// Beat grid for snapping
    pub beats: &'a BeatGrid,
    /// Tempo in BPM
    pub bpm: f32,
    /// Audio duration in seconds
    pub duration: f32,
    /// Extension decoration mode
    pub harmony_mode: HarmonyMode,
}

impl<'a> RefinementContext<'a> {
    /// Seconds per beat (0.5 s for a non-positive tempo)
    pub fn seconds_per_beat(&self) -> f32 {
        if self.bpm > 0.0 && self.bpm.is_finite() {
            60.0 / self.bpm
        } else {
            0.5
        }
    }

    /// Frames covered by event `index`: up to the next event's frame, or the end
    pub fn event_frames(&self, events: &[ChordEvent], index: usize) -> Range<usize> {
        let n = self.features.len();
        let start = events[index].frame_index.min(n);
        let end = events
            .get(index + 1)
            .map_or(n, |next| next.frame_index.min(n))
            .max(start);
        start..end
    }

    /// Mean chroma over the frames of event `index` (falls back to its first frame)
    pub fn event_chroma(&self, events: &[ChordEvent], index: usize) -> [f32; 12] {
        let range = self.event_frames(events, index);
        if range.is_empty() {
            let start = range.start;
            average_chroma(&self.features.chroma, start..start + 1)
        } else {
            average_chroma(&self.features.chroma, range)
        }
    }
}

/// Collapse consecutive events sharing a label (the earliest one is kept)
pub fn merge_duplicates(events: Vec<ChordEvent>) -> Vec<ChordEvent> {
    merge_duplicates_indexed(events).0
}

/// [`merge_duplicates`], also returning for every input event the index it merged into
pub fn merge_duplicates_indexed(events: Vec<ChordEvent>) -> (Vec<ChordEvent>, Vec<usize>) {
    let mut merged: Vec<ChordEvent> = Vec::with_capacity(events.len());
    let mut index_map = Vec::with_capacity(events.len());
    for event in events {
        if merged.last().map_or(true, |last| last.label != event.label) {
            merged.push(event);
        }
        index_map.push(merged.len() - 1);
    }
    (merged, index_map)
}

/// Runs the refinement passes over a timeline
#[derive(Debug, Clone, Copy)]
pub struct TimelineRefiner<'a> {
    context: RefinementContext<'a>,
}

impl<'a> TimelineRefiner<'a> {
    /// Refiner over the given context
    pub fn new(context: RefinementContext<'a>) -> Self {
        Self { context }
    }

    /// One application of every pass in order
    pub fn refine_once(&self, events: Vec<ChordEvent>) -> Vec<ChordEvent> {
        let ctx = &self.context;
        let events = diatonic::correct_early_chords(events, ctx);
        let events = duration::filter_short_events(events, ctx);
        let events = grid::snap_to_beats(events, ctx);
        let events = merge_duplicates(events);
        let events = extensions::decorate_extensions(events, ctx);
        let events = inversions::decorate_inversions(events, ctx);
        let events = diatonic::validate_diatonic(events, ctx);
        merge_duplicates(events)
    }

    /// Repeat the passes until the timeline is stable
    pub fn refine(&self, events: Vec<ChordEvent>) -> Vec<ChordEvent> {
        let input_len = events.len();
        // Every unstable round either drops an event or settles labels/times
        let max_rounds = input_len + 2;
        let mut current = events;
        for round in 0..max_rounds {
            let next = self.refine_once(current.clone());
            if next == current {
                log::debug!(
                    "Refinement: {} -> {} events ({} rounds)",
                    input_len,
                    next.len(),
                    round + 1
                );
                return next;
            }
            current = next;
        }
        log::warn!("Refinement did not settle after {} rounds", max_rounds);
        current
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::features::beat_tracking::generate_beat_grid;

    #[test]
    fn test_merge_duplicates() {
        let events = vec![
            ChordEvent::new(0.0, "C", 0),
            ChordEvent::new(1.0, "C", 10),
            ChordEvent::new(2.0, "G", 20),
            ChordEvent::new(3.0, "C", 30),
        ];
        let merged = merge_duplicates(events);
        let labels: Vec<&str> = merged.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["C", "G", "C"]);
        assert_eq!(merged[1].frame_index, 20);
    }

    #[test]
    fn test_merge_duplicates_index_map() {
        let events = vec![
            ChordEvent::new(0.0, "C", 0),
            ChordEvent::new(1.0, "C", 10),
            ChordEvent::new(2.0, "G", 20),
            ChordEvent::new(3.0, "G", 30),
            ChordEvent::new(4.0, "C", 40),
        ];
        let (merged, index_map) = merge_duplicates_indexed(events);
        assert_eq!(merged.len(), 3);
        assert_eq!(index_map, vec![0, 0, 1, 1, 2]);
        assert!(merge_duplicates_indexed(Vec::new()).1.is_empty());
    }

    #[test]
    fn test_event_frames() {
        let features = segments(&[(chord_chroma(&[0, 4, 7]), None, 30)]);
        let beats = BeatGrid::default();
        let ctx = RefinementContext {
            features: &features,
            key: Key::Major(0),
            beats: &beats,
            bpm: 120.0,
            duration: 3.0,
            harmony_mode: HarmonyMode::Jazz,
        };
        let events = vec![ChordEvent::new(0.0, "C", 0), ChordEvent::new(1.0, "G", 10)];
        assert_eq!(ctx.event_frames(&events, 0), 0..10);
        assert_eq!(ctx.event_frames(&events, 1), 10..30);
    }

    #[test]
    fn test_refine_is_idempotent() {
        let c = chord_chroma(&[0, 4, 7]);
        let g7 = chord_chroma(&[7, 11, 2, 5]);
        let f = chord_chroma(&[5, 9, 0]);
        let features = segments(&[(c, Some(0), 20), (g7, Some(11), 20), (f, Some(5), 2), (c, Some(0), 20)]);
        let duration = features.len() as f32 * features.hop_seconds();
        let beats = generate_beat_grid(100.0, 0.05, duration);
        let ctx = RefinementContext {
            features: &features,
            key: Key::Major(0),
            beats: &beats,
            bpm: 100.0,
            duration,
            harmony_mode: HarmonyMode::Jazz,
        };
        let raw = vec![
            ChordEvent::new(0.0, "C", 0),
            ChordEvent::new(2.0, "G", 20),
            ChordEvent::new(4.0, "F", 40),
            ChordEvent::new(4.2, "C", 42),
        ];
        let refiner = TimelineRefiner::new(ctx);
        let once = refiner.refine(raw);
        let twice = refiner.refine(once.clone());
        assert_eq!(once, twice);
        assert!(once.windows(2).all(|w| w[0].time <= w[1].time && w[0].label != w[1].label));
        assert!(once.iter().all(|e| (0.0..=duration).contains(&e.time)));
    }
}
