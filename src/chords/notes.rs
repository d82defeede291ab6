//! Note naming and parsing
//!
//! Pitch classes are spelled with sharps or flats depending on the key, so that a
//! song in F major reads "Bb" rather than "A#". Sharp-side major keys still write
//! their borrowed flat degrees (bIII, bVI, bVII) as flats: "Bb" in C major.

use serde::{Deserialize, Serialize};

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Major-key tonics conventionally written with flats (F, Bb, Eb, Ab, Db)
const FLAT_MAJOR_TONICS: [u8; 5] = [5, 10, 3, 8, 1];

/// Intervals above a major tonic borrowed from the parallel minor
const BORROWED_FLAT_DEGREES: [u8; 3] = [3, 8, 10];

/// Accidental style used when naming pitch classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSpelling {
    /// C, C#, D, D#, ...
    Sharps,
    /// C, Db, D, Eb, ...
    Flats,
    /// Sharps, except the b3, b6 and b7 of the major key on `tonic`
    MajorSharps {
        /// Tonic pitch class of the key
        tonic: u8,
    },
}

impl NoteSpelling {
    /// Spelling for a key given its tonic and mode
    ///
    /// Minor keys follow their relative major (A minor ~ C major, D minor ~ F major).
    pub fn for_key(tonic: u8, minor: bool) -> Self {
        let relative_major = if minor { (tonic + 3) % 12 } else { tonic % 12 };
        if FLAT_MAJOR_TONICS.contains(&relative_major) {
            NoteSpelling::Flats
        } else if minor {
            NoteSpelling::Sharps
        } else {
            NoteSpelling::MajorSharps { tonic: tonic % 12 }
        }
    }
}

/// Name of a pitch class under the given spelling
pub fn note_name(pitch_class: u8, spelling: NoteSpelling) -> &'static str {
    let idx = (pitch_class % 12) as usize;
    match spelling {
        NoteSpelling::Sharps => NOTE_NAMES_SHARP[idx],
        NoteSpelling::Flats => NOTE_NAMES_FLAT[idx],
        NoteSpelling::MajorSharps { tonic } => {
            let interval = (pitch_class % 12 + 12 - tonic % 12) % 12;
            if BORROWED_FLAT_DEGREES.contains(&interval) {
                NOTE_NAMES_FLAT[idx]
            } else {
                NOTE_NAMES_SHARP[idx]
            }
        }
    }
}

/// Parse a leading note name ("C", "F#", "Bb") from `text`
///
/// # Returns
///
/// `(pitch_class, bytes_consumed)`, or `None` if `text` does not start with a note letter
pub fn parse_note(text: &str) -> Option<(u8, usize)> {
    let mut chars = text.chars();
    let base: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let (offset, consumed) = match chars.next() {
        Some('#') => (1, 2),
        Some('b') => (-1, 2),
        _ => (0, 1),
    };
    Some(((base + offset).rem_euclid(12) as u8, consumed))
}

/// Distance between two pitch classes on the circle of fifths (0-6)
pub fn circle_of_fifths_distance(a: u8, b: u8) -> u8 {
    let pos_a = (a as u32 * 7) % 12;
    let pos_b = (b as u32 * 7) % 12;
    let diff = pos_a.abs_diff(pos_b);
    diff.min(12 - diff) as u8
}
