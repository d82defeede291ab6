//! Key re-estimation from the tracked chord timeline
//!
//! When too few tracked chord roots are diatonic to the detected key, all 24 keys are
//! scored by how many roots they explain. A replacement is only accepted when it
//! improves the match ratio by more than 0.15.

use crate::analysis::result::{ChordEvent, Key};
use crate::chords::symbol::{ChordQuality, ChordSymbol};

/// Re-estimation runs when the diatonic match ratio falls below this value
pub const REESTIMATION_TRIGGER_RATIO: f32 = 0.6;

/// Minimum ratio improvement for a replacement key
pub const REESTIMATION_MIN_IMPROVEMENT: f32 = 0.15;

/// Outcome of a successful re-estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyReestimation {
    /// Replacement key
    pub key: Key,
    /// Diatonic match ratio of the replacement key
    pub ratio: f32,
    /// Diatonic match ratio of the key it replaces
    pub previous_ratio: f32,
}

/// Fraction of events whose root is diatonic to `key` (1.0 when there are no events)
pub fn diatonic_match_ratio(events: &[ChordEvent], key: &Key) -> f32 {
    let roots: Vec<u8> = events.iter().filter_map(|e| ChordSymbol::root_of(&e.label)).collect();
    if roots.is_empty() {
        return 1.0;
    }
    let matching = roots.iter().filter(|&&r| key.is_diatonic(r)).count();
    matching as f32 / roots.len() as f32
}

/// Number of events whose triad is the tonic triad of `key`
fn tonic_support(events: &[ChordEvent], key: &Key) -> usize {
    events
        .iter()
        .filter_map(|e| ChordSymbol::parse(&e.label))
        .filter(|s| s.root == key.tonic() && (s.quality == ChordQuality::Minor) == key.is_minor())
        .count()
}

/// Search for a key that fits the timeline better than `current`
///
/// # Returns
///
/// `None` if the current key already fits (ratio >= 0.6) or no key improves on it by
/// more than 0.15. Among equally fitting keys, the one whose tonic triad occurs most
/// often wins, then the first in major-before-minor, ascending-tonic order.
pub fn reestimate_key(events: &[ChordEvent], current: &Key) -> Option<KeyReestimation> {
    let current_ratio = diatonic_match_ratio(events, current);
    if current_ratio >= REESTIMATION_TRIGGER_RATIO {
        return None;
    }

    let mut best: Option<(Key, f32, usize)> = None;
    for key in Key::all() {
        let ratio = diatonic_match_ratio(events, &key);
        let support = tonic_support(events, &key);
        let better = match best {
            None => true,
            Some((_, r, s)) => ratio > r || (ratio == r && support > s),
        };
        if better {
            best = Some((key, ratio, support));
        }
    }

    let (key, ratio, _) = best?;
    log::debug!(
        "Key re-estimation: {} fits {:.2} vs {} at {:.2}",
        key.name(),
        ratio,
        current.name(),
        current_ratio
    );
    if ratio - current_ratio > REESTIMATION_MIN_IMPROVEMENT {
        Some(KeyReestimation {
            key,
            ratio,
            previous_ratio: current_ratio,
        })
    } else {
        None
    }
}
