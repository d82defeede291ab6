//! Chord vocabulary, symbols and the Viterbi tracker
//!
//! - Note naming with key-aware sharps/flats
//! - Chord label parsing and formatting
//! - Key-derived candidate set (diatonic + borrowed)
//! - Transition costs (circle of fifths, cadences)
//! - Beam-searched Viterbi decoding

pub mod notes;
pub mod symbol;
pub mod tracker;
pub mod transitions;
pub mod vocabulary;

pub use notes::{note_name, parse_note, NoteSpelling};
pub use symbol::{ChordQuality, ChordSymbol, Extension};
pub use tracker::ChordTracker;
pub use vocabulary::{candidates_for_key, ChordCandidate};
