//! Inversion decoration (slash bass)

use super::RefinementContext;
use crate::analysis::result::ChordEvent;
use crate::chords::symbol::ChordSymbol;

/// Bass-note chroma must exceed this share of the root's chroma
const INVERSION_STRENGTH_RATIO: f32 = 0.7;

/// Slash bass for `symbol` given the event's majority bass and mean chroma
///
/// Returns `Some(bass)` only for a chord tone other than the root that is
/// strong enough in the chroma.
pub fn inversion_bass(symbol: &ChordSymbol, bass: Option<u8>, chroma: &[f32; 12]) -> Option<u8> {
    let bass = bass? % 12;
    if bass == symbol.root || !symbol.contains(bass) {
        return None;
    }
    if chroma[bass as usize] > INVERSION_STRENGTH_RATIO * chroma[symbol.root as usize] {
        Some(bass)
    } else {
        None
    }
}

/// Set (or clear) the slash bass of every event from its majority bass note
pub fn decorate_inversions(mut events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    let spelling = ctx.key.spelling();
    let mut inverted = 0usize;
    for i in 0..events.len() {
        let mut symbol = match ChordSymbol::parse(&events[i].label) {
            Some(s) => s,
            None => continue,
        };
        let range = ctx.event_frames(&events, i);
        let bass = ctx.features.dominant_bass(range);
        let chroma = ctx.event_chroma(&events, i);
        symbol.bass = inversion_bass(&symbol, bass, &chroma);
        if symbol.bass.is_some() {
            inverted += 1;
        }
        events[i].label = symbol.format(spelling);
    }
    log::trace!("Inversion decoration: {} slash chords", inverted);
    events
}
