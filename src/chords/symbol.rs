//! Chord symbol model
//!
//! Labels are parsed into a [`ChordSymbol`] whenever a stage needs to rewrite them
//! (extensions, slash bass, quality flips) and formatted back with key-aware spelling.
//!
//! Grammar: `<root>[m][7|maj7][sus2|sus4][/<bass>]`, e.g. `C`, `Am7`, `Gsus4`, `G/B`,
//! `Fmaj7/A`, `C7sus4`.

use super::notes::{note_name, parse_note, NoteSpelling};

/// Triad quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    /// Major third
    Major,
    /// Minor third
    Minor,
    /// Second replaces the third
    Sus2,
    /// Fourth replaces the third
    Sus4,
}

impl ChordQuality {
    /// Interval of the third-position tone above the root
    pub fn third_interval(self) -> u8 {
        match self {
            ChordQuality::Major => 4,
            ChordQuality::Minor => 3,
            ChordQuality::Sus2 => 2,
            ChordQuality::Sus4 => 5,
        }
    }

    /// `true` for sus2/sus4
    pub fn is_suspended(self) -> bool {
        matches!(self, ChordQuality::Sus2 | ChordQuality::Sus4)
    }
}

/// Added seventh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Minor seventh ("7")
    Seventh,
    /// Major seventh ("maj7")
    MajorSeventh,
}

impl Extension {
    /// Interval of the seventh above the root
    pub fn interval(self) -> u8 {
        match self {
            Extension::Seventh => 10,
            Extension::MajorSeventh => 11,
        }
    }
}

/// A parsed chord label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChordSymbol {
    /// Root pitch class
    pub root: u8,
    /// Triad quality
    pub quality: ChordQuality,
    /// Optional seventh
    pub extension: Option<Extension>,
    /// Slash bass pitch class
    pub bass: Option<u8>,
}

impl ChordSymbol {
    /// Plain triad
    pub fn triad(root: u8, quality: ChordQuality) -> Self {
        Self {
            root: root % 12,
            quality,
            extension: None,
            bass: None,
        }
    }

    /// Parse a label; `None` if it does not follow the chord grammar
    pub fn parse(label: &str) -> Option<Self> {
        let (root, consumed) = parse_note(label)?;
        let mut rest = &label[consumed..];

        let mut quality = ChordQuality::Major;
        if rest.starts_with('m') && !rest.starts_with("maj") {
            quality = ChordQuality::Minor;
            rest = &rest[1..];
        }

        let mut extension = None;
        if let Some(r) = rest.strip_prefix("maj7") {
            extension = Some(Extension::MajorSeventh);
            rest = r;
        } else if let Some(r) = rest.strip_prefix('7') {
            extension = Some(Extension::Seventh);
            rest = r;
        }

        if quality == ChordQuality::Major {
            if let Some(r) = rest.strip_prefix("sus2") {
                quality = ChordQuality::Sus2;
                rest = r;
            } else if let Some(r) = rest.strip_prefix("sus4") {
                quality = ChordQuality::Sus4;
                rest = r;
            }
        }

        let bass = match rest.strip_prefix('/') {
            Some(b) => {
                let (pc, used) = parse_note(b)?;
                if used != b.len() {
                    return None;
                }
                Some(pc)
            }
            None if rest.is_empty() => None,
            None => return None,
        };

        Some(Self {
            root,
            quality,
            extension,
            bass,
        })
    }

    /// Root pitch class of a label (the leading note name)
    pub fn root_of(label: &str) -> Option<u8> {
        parse_note(label).map(|(pc, _)| pc)
    }

    /// Format under the given spelling
    pub fn format(&self, spelling: NoteSpelling) -> String {
        let mut out = String::from(note_name(self.root, spelling));
        if self.quality == ChordQuality::Minor {
            out.push('m');
        }
        match self.extension {
            Some(Extension::Seventh) => out.push('7'),
            Some(Extension::MajorSeventh) => out.push_str("maj7"),
            None => {}
        }
        match self.quality {
            ChordQuality::Sus2 => out.push_str("sus2"),
            ChordQuality::Sus4 => out.push_str("sus4"),
            _ => {}
        }
        if let Some(bass) = self.bass {
            out.push('/');
            out.push_str(note_name(bass, spelling));
        }
        out
    }

    /// Same chord without seventh or slash bass
    pub fn base_triad(&self) -> Self {
        Self::triad(self.root, self.quality)
    }

    /// Pitch classes of the chord: root, third (or suspension), fifth, optional seventh
    pub fn chord_tones(&self) -> Vec<u8> {
        let mut tones = vec![
            self.root,
            (self.root + self.quality.third_interval()) % 12,
            (self.root + 7) % 12,
        ];
        if let Some(ext) = self.extension {
            tones.push((self.root + ext.interval()) % 12);
        }
        tones
    }

    /// `true` if `pitch_class` is one of the chord tones
    pub fn contains(&self, pitch_class: u8) -> bool {
        self.chord_tones().contains(&(pitch_class % 12))
    }
}
