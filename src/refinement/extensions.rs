//! Extension decoration
//!
//! Each event's label is rebuilt from its plain triad plus whatever the chroma in a
//! 5-frame (±2) window at the event start supports. The window is kept inside the
//! event's own frames, so the previous chord never dilutes it:
//! - "7" when the minor seventh clears the mode's threshold and beats the major
//!   seventh by at least 20%
//! - "maj7" in the symmetric case, major triads only
//! - sus2/sus4 (Pro mode) when the third is weak and the second or fourth dominates
//!
//! Suspended chords are left as they are.

use super::RefinementContext;
use crate::analysis::result::ChordEvent;
use crate::chords::symbol::{ChordQuality, ChordSymbol, Extension};
use crate::config::HarmonyMode;
use crate::features::chroma::smoothing::average_chroma;
use std::ops::Range;

/// Frames on each side of the window centre
const EXTENSION_WINDOW_RADIUS: usize = 2;

/// A seventh must exceed the competing seventh by this factor
const SEVENTH_DOMINANCE: f32 = 1.2;

/// The third counts as weak below this chroma share
const WEAK_THIRD: f32 = 0.10;

/// Decide the decoration of one chord from window chroma
pub fn decorate_symbol(symbol: ChordSymbol, chroma: &[f32; 12], mode: HarmonyMode) -> ChordSymbol {
    if symbol.quality.is_suspended() {
        return symbol;
    }
    let mut out = symbol.base_triad();
    let at = |interval: u8| chroma[((symbol.root + interval) % 12) as usize];

    if mode.allows_suspensions() {
        let third = at(symbol.quality.third_interval());
        let (second, fourth) = (at(2), at(5));
        if third < WEAK_THIRD && second.max(fourth) > third {
            out.quality = if second > fourth {
                ChordQuality::Sus2
            } else {
                ChordQuality::Sus4
            };
            return out;
        }
    }

    if let Some(threshold) = mode.seventh_threshold() {
        let (minor7, major7) = (at(10), at(11));
        if minor7 > threshold && minor7 >= SEVENTH_DOMINANCE * major7 {
            out.extension = Some(Extension::Seventh);
        } else if symbol.quality == ChordQuality::Major && major7 > threshold && major7 >= SEVENTH_DOMINANCE * minor7 {
            out.extension = Some(Extension::MajorSeventh);
        }
    }
    out
}

/// Decoration window of an event: `2 * radius + 1` frames from its start, clipped to its frames
///
/// An event without frames of its own (e.g. at the very end) uses its start frame.
pub fn extension_window(own_frames: Range<usize>) -> Range<usize> {
    let start = own_frames.start;
    let end = (start + 2 * EXTENSION_WINDOW_RADIUS + 1).min(own_frames.end);
    if end > start {
        start..end
    } else {
        start..start + 1
    }
}

/// Rebuild every label from its triad and the chroma at the event start
pub fn decorate_extensions(mut events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    let spelling = ctx.key.spelling();
    let windows: Vec<Range<usize>> = (0..events.len())
        .map(|i| extension_window(ctx.event_frames(&events, i)))
        .collect();
    let mut decorated = 0usize;
    for (event, window) in events.iter_mut().zip(windows) {
        let symbol = match ChordSymbol::parse(&event.label) {
            Some(s) => s,
            None => continue,
        };
        let chroma = average_chroma(&ctx.features.chroma, window);
        let result = decorate_symbol(symbol, &chroma, ctx.harmony_mode);
        if result.extension.is_some() || result.quality.is_suspended() {
            decorated += 1;
        }
        event.label = result.format(spelling);
    }
    log::trace!("Extension decoration: {} decorated events", decorated);
    events
}
