//! Fixed-tempo beat grid generation
//!
//! Beats are laid out every `60 / bpm` seconds, phase-aligned to an anchor time (the
//! first frame whose energy rises above the 30th percentile). The grid extends
//! backwards from the anchor to cover the start of the track, and every fourth beat
//! counting from the anchor is a downbeat.

use crate::analysis::result::BeatGrid;
use crate::features::spectrum::EPSILON;

/// Beats per bar (4/4 assumption)
pub const BEATS_PER_BAR: usize = 4;

/// Generate a beat grid covering `[0, duration]`
///
/// # Arguments
///
/// * `bpm` - Tempo in beats per minute
/// * `anchor` - Time in seconds that falls on a beat (the first frame above the 30th energy percentile)
/// * `duration` - Track duration in seconds
///
/// # Returns
///
/// Beat grid with ascending beat times in `[0, duration]`. Empty for a
/// non-positive tempo or duration.
pub fn generate_beat_grid(bpm: f32, anchor: f32, duration: f32) -> BeatGrid {
    if !(bpm.is_finite() && bpm > 0.0) || !(duration.is_finite() && duration > 0.0) {
        return BeatGrid::default();
    }

    let spb = 60.0 / bpm;
    let anchor = if anchor.is_finite() {
        anchor.clamp(0.0, duration)
    } else {
        0.0
    };

    // Beats before the anchor: anchor - k * spb >= 0
    let lead_in = (anchor / spb + EPSILON).floor() as usize;
    let first = anchor - lead_in as f32 * spb;

    let mut beats = Vec::new();
    let mut downbeats = Vec::new();
    let mut n = 0usize;
    loop {
        let t = first + n as f32 * spb;
        if t > duration + EPSILON {
            break;
        }
        let t = t.clamp(0.0, duration);
        beats.push(t);
        // Beat `lead_in` is the anchor; bars start there
        if (n as isize - lead_in as isize).rem_euclid(BEATS_PER_BAR as isize) == 0 {
            downbeats.push(t);
        }
        n += 1;
    }

    log::debug!(
        "Beat grid: {:.1} BPM, anchor {:.3}s, {} beats, {} downbeats",
        bpm,
        anchor,
        beats.len(),
        downbeats.len()
    );

    BeatGrid { downbeats, beats }
}

/// Beat time closest to `time`, if the grid is non-empty
pub fn nearest_beat(grid: &BeatGrid, time: f32) -> Option<f32> {
    let idx = grid.beats.partition_point(|&b| b < time);
    let after = grid.beats.get(idx).copied();
    let before = idx.checked_sub(1).and_then(|i| grid.beats.get(i)).copied();
    match (before, after) {
        (Some(b), Some(a)) => Some(if time - b <= a - time { b } else { a }),
        (Some(b), None) => Some(b),
        (None, a) => a,
    }
}
