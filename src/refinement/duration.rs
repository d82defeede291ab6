//! Minimum-duration filter

use super::RefinementContext;
use crate::analysis::result::ChordEvent;
use crate::chords::symbol::ChordSymbol;

/// Events shorter than this many beats are candidates for removal
const MIN_DURATION_BEATS: f32 = 0.5;

/// A short event is harmonically weak when its mean energy is below this share of the median
const WEAK_ENERGY_RATIO: f32 = 0.85;

/// Drop short events that are weak or off-key
///
/// Duration is measured in frames up to the next event, so earlier snapping does not
/// change the decision. Decisions are taken against the input timeline (no cascade),
/// and the first event is always retained.
pub fn filter_short_events(events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    let min_duration = MIN_DURATION_BEATS * ctx.seconds_per_beat();
    let weak_energy = WEAK_ENERGY_RATIO * ctx.features.percentiles.p50;
    let hop = ctx.features.hop_seconds();

    let keep: Vec<bool> = (0..events.len())
        .map(|i| {
            if i == 0 {
                return true;
            }
            let range = ctx.event_frames(&events, i);
            let duration = range.len() as f32 * hop;
            if duration >= min_duration {
                return true;
            }
            let weak = ctx.features.mean_energy(range) < weak_energy;
            let off_key = ChordSymbol::root_of(&events[i].label).map_or(true, |r| !ctx.key.is_diatonic(r));
            !(weak || off_key)
        })
        .collect();

    let before = events.len();
    let kept: Vec<ChordEvent> = events
        .into_iter()
        .zip(keep)
        .filter_map(|(e, k)| k.then_some(e))
        .collect();
    if kept.len() < before {
        log::debug!(
            "Minimum-duration filter ({:.3}s) dropped {} events",
            min_duration,
            before - kept.len()
        );
    }
    kept
}
