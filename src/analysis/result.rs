//! Analysis result types

use crate::chords::notes::{note_name, NoteSpelling};
use crate::error::AnalysisError;
use crate::validation::ValidationRecord;
use serde::{Deserialize, Serialize};

use super::metadata::AnalysisMetadata;

const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const NATURAL_MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u8),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u8),
}

impl Key {
    /// Build a key from a tonic pitch class and mode
    pub fn new(tonic: u8, minor: bool) -> Self {
        if minor {
            Key::Minor(tonic % 12)
        } else {
            Key::Major(tonic % 12)
        }
    }

    /// All 24 keys: the 12 major keys followed by the 12 minor keys
    pub fn all() -> impl Iterator<Item = Key> {
        (0..12u8).map(Key::Major).chain((0..12u8).map(Key::Minor))
    }

    /// Tonic pitch class
    pub fn tonic(&self) -> u8 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// `true` for minor keys
    pub fn is_minor(&self) -> bool {
        matches!(self, Key::Minor(_))
    }

    /// Pitch classes of the seven scale degrees (natural minor for minor keys)
    pub fn scale(&self) -> [u8; 7] {
        let intervals = if self.is_minor() {
            NATURAL_MINOR_SCALE
        } else {
            MAJOR_SCALE
        };
        intervals.map(|i| (self.tonic() + i) % 12)
    }

    /// `true` if `pitch_class` is one of the key's scale degrees
    pub fn is_diatonic(&self, pitch_class: u8) -> bool {
        self.scale().contains(&(pitch_class % 12))
    }

    /// Scale degree (0-6) of `pitch_class`, if diatonic
    pub fn degree_of(&self, pitch_class: u8) -> Option<usize> {
        self.scale().iter().position(|&pc| pc == pitch_class % 12)
    }

    /// Accidental spelling used for note names in this key
    pub fn spelling(&self) -> NoteSpelling {
        NoteSpelling::for_key(self.tonic(), self.is_minor())
    }

    /// Label of the tonic triad, e.g. "C", "Am", "Bb"
    pub fn tonic_label(&self) -> String {
        let root = note_name(self.tonic(), self.spelling());
        if self.is_minor() {
            format!("{}m", root)
        } else {
            root.to_string()
        }
    }

    /// Key name in musical notation (e.g., "C", "Am", "Bb", "F#m")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_chords::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(10).name(), "Bb");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// assert_eq!(Key::Minor(6).name(), "F#m");
    /// ```
    pub fn name(&self) -> String {
        self.tonic_label()
    }
}

/// Key as reported to callers: `{root, minor, confidence}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Tonic pitch class (0-11)
    pub root: u8,
    /// Minor mode flag
    pub minor: bool,
    /// Confidence (0.0-1.0)
    pub confidence: f32,
}

impl KeyEstimate {
    /// Wrap a key with its confidence (clamped to [0, 1])
    pub fn new(key: Key, confidence: f32) -> Self {
        Self {
            root: key.tonic(),
            minor: key.is_minor(),
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// The estimated key
    pub fn key(&self) -> Key {
        Key::new(self.root, self.minor)
    }
}

/// One entry of the chord timeline
///
/// Serialized as `{"t": seconds, "label": "..."}`; the frame index is internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Start time in seconds
    #[serde(rename = "t")]
    pub time: f32,

    /// Chord label, e.g. "Am7", "G/B"
    pub label: String,

    /// Analysis frame at which the event starts
    #[serde(skip)]
    pub frame_index: usize,
}

impl ChordEvent {
    /// Create an event
    pub fn new(time: f32, label: impl Into<String>, frame_index: usize) -> Self {
        Self {
            time,
            label: label.into(),
            frame_index,
        }
    }
}

/// Beat grid structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Downbeat times (beat 1 of each 4/4 bar) in seconds
    pub downbeats: Vec<f32>,

    /// All beat times in seconds
    pub beats: Vec<f32>,
}

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// Input was empty or silent; the result is the degraded default
    SilentInput,
    /// Key confidence is low (atonal/ambiguous material)
    WeakTonality,
    /// Chords disagreed with the first key estimate and the key was replaced
    KeyReestimated,
    /// Tracking produced no events; a single tonic chord was substituted
    EmptyTimelineFallback,
}

/// Complete chord analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordAnalysis {
    /// Chord timeline ordered by time
    pub chords: Vec<ChordEvent>,

    /// Detected key
    pub key: KeyEstimate,

    /// Tempo estimate in BPM
    pub bpm: f32,

    /// Audio duration in seconds
    pub duration: f32,

    /// Beat grid derived from the tempo estimate
    pub beats: BeatGrid,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,

    /// Decisions taken by the second-opinion validators
    pub validations: Vec<ValidationRecord>,
}

impl ChordAnalysis {
    /// Serialize to a JSON string
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::SerializationError` if serialization fails
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to an indented JSON string
    pub fn to_json_pretty(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Chord labels in timeline order
    pub fn labels(&self) -> Vec<&str> {
        self.chords.iter().map(|c| c.label.as_str()).collect()
    }
}
