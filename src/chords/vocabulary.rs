//! Key-constrained chord vocabulary
//!
//! Every scale degree contributes both a major and a minor triad (14 states), followed
//! by a small set of borrowed chords:
//! - major keys: bVII, bVI and bIII major, iv minor
//! - minor keys: V, IV and VII major
//!
//! Borrowed chords that coincide with a diatonic state are not added twice. The
//! tonic triad of the key is always part of the vocabulary.

use super::symbol::{ChordQuality, ChordSymbol};
use crate::analysis::result::Key;

/// Borrowed chords for major keys as (interval above tonic, quality)
const MAJOR_KEY_BORROWED: [(u8, ChordQuality); 4] = [
    (10, ChordQuality::Major), // bVII
    (8, ChordQuality::Major),  // bVI
    (3, ChordQuality::Major),  // bIII
    (5, ChordQuality::Minor),  // iv
];

/// Borrowed chords for minor keys
const MINOR_KEY_BORROWED: [(u8, ChordQuality); 3] = [
    (7, ChordQuality::Major),  // V
    (5, ChordQuality::Major),  // IV
    (10, ChordQuality::Major), // VII
];

/// One tracker state
#[derive(Debug, Clone, PartialEq)]
pub struct ChordCandidate {
    /// Root pitch class
    pub root: u8,
    /// Major or minor
    pub quality: ChordQuality,
    /// Label under the key's spelling
    pub label: String,
    /// Modal-interchange chord (root or quality outside the diatonic set)
    pub borrowed: bool,
}

impl ChordCandidate {
    fn new(root: u8, quality: ChordQuality, key: &Key, borrowed: bool) -> Self {
        let root = root % 12;
        Self {
            root,
            quality,
            label: ChordSymbol::triad(root, quality).format(key.spelling()),
            borrowed,
        }
    }

    /// Binary triad template: 1.0 on root, third and fifth
    pub fn template(&self) -> [f32; 12] {
        let mut t = [0.0f32; 12];
        for pc in ChordSymbol::triad(self.root, self.quality).chord_tones() {
            t[pc as usize] = 1.0;
        }
        t
    }
}

/// Generate the chord vocabulary for `key`
///
/// # Returns
///
/// Diatonic states in scale-degree order (major then minor triad per degree),
/// followed by the non-duplicate borrowed chords. Index 0 is the major triad on the
/// tonic.
pub fn candidates_for_key(key: &Key) -> Vec<ChordCandidate> {
    let mut candidates: Vec<ChordCandidate> = Vec::with_capacity(18);
    for root in key.scale() {
        candidates.push(ChordCandidate::new(root, ChordQuality::Major, key, false));
        candidates.push(ChordCandidate::new(root, ChordQuality::Minor, key, false));
    }

    let borrowed: &[(u8, ChordQuality)] = if key.is_minor() {
        &MINOR_KEY_BORROWED
    } else {
        &MAJOR_KEY_BORROWED
    };
    for &(interval, quality) in borrowed {
        let root = (key.tonic() + interval) % 12;
        if candidates.iter().any(|c| c.root == root && c.quality == quality) {
            continue;
        }
        candidates.push(ChordCandidate::new(root, quality, key, true));
    }

    log::trace!(
        "Vocabulary for {}: {}",
        key.name(),
        candidates.iter().map(|c| c.label.as_str()).collect::<Vec<_>>().join(" ")
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_vocabulary() {
        let cands = candidates_for_key(&Key::Major(0));
        assert_eq!(cands.len(), 17, "14 diatonic + bVII bVI bIII (iv is diatonic-root Fm)");
        assert_eq!(cands[0].label, "C");
        assert_eq!(cands[1].label, "Cm");
        let borrowed: Vec<&str> = cands.iter().filter(|c| c.borrowed).map(|c| c.label.as_str()).collect();
        assert_eq!(borrowed, vec!["Bb", "Ab", "Eb"]);
    }

    #[test]
    fn test_minor_key_vocabulary() {
        let cands = candidates_for_key(&Key::Minor(9));
        assert_eq!(cands.len(), 14);
        assert!(cands.iter().all(|c| !c.borrowed));
        assert!(cands.iter().any(|c| c.label == "Am"));
        assert!(cands.iter().any(|c| c.label == "E"));
    }

    #[test]
    fn test_tonic_always_present() {
        for key in Key::all() {
            let tonic = key.tonic_label();
            assert!(
                candidates_for_key(&key).iter().any(|c| c.label == tonic),
                "{} missing tonic {}",
                key.name(),
                tonic
            );
        }
    }

    #[test]
    fn test_flat_key_labels() {
        let cands = candidates_for_key(&Key::Major(5));
        assert!(cands.iter().any(|c| c.label == "Bb"), "F major uses flats");
    }

    #[test]
    fn test_template() {
        let cands = candidates_for_key(&Key::Major(0));
        let am = cands.iter().find(|c| c.label == "Am").unwrap();
        let t = am.template();
        assert_eq!(t.iter().sum::<f32>(), 3.0);
        assert_eq!((t[9], t[0], t[4]), (1.0, 1.0, 1.0));
    }
}
