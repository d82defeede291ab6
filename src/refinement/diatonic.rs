//! Diatonic correction and validation passes

use super::RefinementContext;
use crate::analysis::result::ChordEvent;
use crate::chords::symbol::ChordSymbol;
use crate::chords::tracker::MIN_TEMPLATE_SIMILARITY;
use crate::chords::vocabulary::candidates_for_key;
use crate::features::chroma::normalization::cosine_similarity;

/// Early window lower bound in seconds
const EARLY_WINDOW_SECONDS: f32 = 15.0;

/// Early window lower bound in beats
const EARLY_WINDOW_BEATS: f32 = 6.0;

/// Minimum root + fifth chroma share that keeps a non-diatonic chord alive
pub const MIN_ROOT_FIFTH_SUPPORT: f32 = 0.08;

/// Replace off-key chords in the opening window with the closest diatonic triad
///
/// The window is the larger of 15 s and 6 beats. Each off-key event is compared
/// against the key's diatonic triads; the best match replaces it if its cosine
/// similarity reaches the tracker's acceptance level, otherwise the tonic triad does.
pub fn correct_early_chords(mut events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    let window = EARLY_WINDOW_SECONDS.max(EARLY_WINDOW_BEATS * ctx.seconds_per_beat());
    let diatonic: Vec<_> = candidates_for_key(&ctx.key)
        .into_iter()
        .filter(|c| !c.borrowed && ctx.key.is_diatonic(c.root))
        .collect();

    let mut corrected = 0usize;
    for i in 0..events.len() {
        if ctx.features.frame_time(events[i].frame_index) >= window {
            break;
        }
        let root = match ChordSymbol::root_of(&events[i].label) {
            Some(r) => r,
            None => continue,
        };
        if ctx.key.is_diatonic(root) {
            continue;
        }

        let chroma = ctx.event_chroma(&events, i);
        let mut best: Option<(f32, &str)> = None;
        for candidate in &diatonic {
            let sim = cosine_similarity(&chroma, &candidate.template());
            if best.map_or(true, |(b, _)| sim > b) {
                best = Some((sim, candidate.label.as_str()));
            }
        }
        let replacement = match best {
            Some((sim, label)) if sim >= MIN_TEMPLATE_SIMILARITY => label.to_string(),
            _ => ctx.key.tonic_label(),
        };
        log::trace!("Early correction: {} -> {} at {:.2}s", events[i].label, replacement, events[i].time);
        events[i].label = replacement;
        corrected += 1;
    }

    if corrected > 0 {
        log::debug!("Early-diatonic correction rewrote {} events", corrected);
    }
    events
}

/// Drop off-key chords without root + fifth support
///
/// The first event and a lone remaining event are never dropped.
pub fn validate_diatonic(events: Vec<ChordEvent>, ctx: &RefinementContext) -> Vec<ChordEvent> {
    if events.len() <= 1 {
        return events;
    }
    let keep: Vec<bool> = (0..events.len())
        .map(|i| {
            if i == 0 {
                return true;
            }
            let root = match ChordSymbol::root_of(&events[i].label) {
                Some(r) => r,
                None => return false,
            };
            if ctx.key.is_diatonic(root) {
                return true;
            }
            let chroma = ctx.event_chroma(&events, i);
            chroma[root as usize] + chroma[(root as usize + 7) % 12] >= MIN_ROOT_FIFTH_SUPPORT
        })
        .collect();

    let before = events.len();
    let kept: Vec<ChordEvent> = events
        .into_iter()
        .zip(keep)
        .filter_map(|(e, k)| k.then_some(e))
        .collect();
    if kept.len() < before {
        log::debug!("Diatonic validation dropped {} events", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::analysis::result::{BeatGrid, Key};
    use crate::config::HarmonyMode;
    use crate::features::chroma::FrameFeatures;

    fn ctx<'a>(features: &'a FrameFeatures, beats: &'a BeatGrid) -> RefinementContext<'a> {
        RefinementContext {
            features,
            key: Key::Major(0),
            beats,
            bpm: 120.0,
            duration: features.len() as f32 * features.hop_seconds(),
            harmony_mode: HarmonyMode::Jazz,
        }
    }

    #[test]
    fn test_early_off_key_chord_corrected() {
        // Tracker said Bb, but the chroma is really G-ish (G B D)
        let features = segments(&[(chord_chroma(&[7, 11, 2]), None, 20), (chord_chroma(&[0, 4, 7]), None, 20)]);
        let beats = BeatGrid::default();
        let events = vec![ChordEvent::new(0.0, "Bb", 0), ChordEvent::new(2.0, "C", 20)];
        let out = correct_early_chords(events, &ctx(&features, &beats));
        assert_eq!(out[0].label, "G");
        assert_eq!(out[1].label, "C");
    }

    #[test]
    fn test_early_correction_falls_back_to_tonic() {
        let features = segments(&[([0.0; 12], None, 10)]);
        let beats = BeatGrid::default();
        let out = correct_early_chords(vec![ChordEvent::new(0.0, "C#", 0)], &ctx(&features, &beats));
        assert_eq!(out[0].label, "C");
    }

    #[test]
    fn test_late_chords_untouched() {
        let features = segments(&[(chord_chroma(&[0, 4, 7]), None, 200)]);
        let beats = BeatGrid::default();
        let events = vec![ChordEvent::new(0.0, "C", 0), ChordEvent::new(16.0, "Bb", 160)];
        let out = correct_early_chords(events, &ctx(&features, &beats));
        assert_eq!(out[1].label, "Bb");
    }

    #[test]
    fn test_unsupported_off_key_chord_dropped() {
        let features = segments(&[(chord_chroma(&[0, 4, 7]), None, 20), (chord_chroma(&[0, 4, 7]), None, 20)]);
        let beats = BeatGrid::default();
        let events = vec![ChordEvent::new(0.0, "C", 0), ChordEvent::new(2.0, "F#", 20)];
        let out = validate_diatonic(events, &ctx(&features, &beats));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_supported_off_key_chord_kept() {
        let features = segments(&[(chord_chroma(&[0, 4, 7]), None, 20), (chord_chroma(&[10, 2, 5]), None, 20)]);
        let beats = BeatGrid::default();
        let events = vec![ChordEvent::new(0.0, "C", 0), ChordEvent::new(2.0, "Bb", 20)];
        assert_eq!(validate_diatonic(events, &ctx(&features, &beats)).len(), 2);
    }

    #[test]
    fn test_first_and_only_event_kept() {
        let features = segments(&[(chord_chroma(&[0, 4, 7]), None, 20)]);
        let beats = BeatGrid::default();
        let only = vec![ChordEvent::new(0.0, "F#", 0)];
        assert_eq!(validate_diatonic(only, &ctx(&features, &beats)).len(), 1);
    }
}
