//! Beat-grid snap

use super::RefinementContext;
use crate::analysis::result::ChordEvent;
use crate::features::beat_tracking::nearest_beat;

/// Snap tolerance as a fraction of a beat
const SNAP_TOLERANCE_BEATS: f32 = 0.35;

/// Move event times onto the nearest beat when within 35% of a beat
///
/// An event starting at the first frame stays at its time. Times are kept
/// non-decreasing and inside `[0, duration]`.
pub fn snap_to_beats(mut events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    let tolerance = SNAP_TOLERANCE_BEATS * ctx.seconds_per_beat();
    let mut previous = 0.0f32;
    let mut snapped = 0usize;
    for event in events.iter_mut() {
        let mut time = event.time;
        if event.frame_index > 0 {
            if let Some(beat) = nearest_beat(ctx.beats, time) {
                if (beat - time).abs() <= tolerance && beat != time {
                    time = beat;
                    snapped += 1;
                }
            }
        }
        time = time.max(previous).clamp(0.0, ctx.duration.max(0.0));
        event.time = time;
        previous = time;
    }
    log::trace!("Beat snap moved {} events", snapped);
    events
}
