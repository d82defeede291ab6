//! Bass validator
//!
//! Splits a chord segment into 4096-sample sub-windows (hop 2048) and runs three
//! independent pitch estimators on each: normalized autocorrelation, YIN and the
//! lowest strong spectral peak. Estimates below confidence 0.3 do not vote. Each
//! window elects a pitch class; the segment's bass is the most frequent window
//! winner, accepted only if it wins at least 40% of the windows.

use super::{segment_ranges, ValidationRecord, ValidatorKind, NO_BASS};
use crate::analysis::result::ChordEvent;
use crate::chords::notes::{note_name, NoteSpelling};
use crate::chords::symbol::{ChordQuality, ChordSymbol, Extension};
use crate::config::{AnalysisConfig, ValidatorProfile};
use crate::features::bass::{autocorrelation_pitch, spectral_peak_pitch, yin_pitch, PitchEstimate, BASS_MAX_HZ};
use crate::features::spectrum::{SpectrumAnalyzer, EPSILON};
use rayon::prelude::*;

/// Sub-window length in samples
pub const BASS_WINDOW: usize = 4096;

/// Sub-window hop in samples
pub const BASS_WINDOW_HOP: usize = 2048;

/// Estimates below this confidence are discarded
pub const MIN_ESTIMATOR_CONFIDENCE: f32 = 0.3;

/// Share of sub-windows the winning pitch class must take
pub const MIN_BASS_STABILITY: f32 = 0.4;

/// Confidence required to re-root a chord on a non-chord-tone bass
pub const ROOT_OVERRIDE_CONFIDENCE: f32 = 0.75;

/// Bass reading for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BassDetection {
    /// Stable bass pitch class with its confidence
    Note {
        /// Pitch class (0-11)
        pitch_class: u8,
        /// Confidence (0.0-1.0)
        confidence: f32,
    },
    /// No estimator agreed often enough
    NoBass,
}

/// Independent bass pitch validator
#[derive(Debug)]
pub struct BassValidator {
    analyzer: SpectrumAnalyzer,
    profile: ValidatorProfile,
    allow_root_override: bool,
}

impl BassValidator {
    /// Validator for audio at `sample_rate`
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(BASS_WINDOW, sample_rate),
            profile: config.validator_profile,
            allow_root_override: config.allow_root_override,
        }
    }

    /// Pitch class voted by the estimators on one sub-window, with mean agreeing confidence
    fn window_vote(&self, window: &[f32]) -> Option<(u8, f32)> {
        let spectrum = self.analyzer.analyze(window);
        if spectrum.energy <= EPSILON {
            return None;
        }
        let low = self.analyzer.low_band_signal(&spectrum, BASS_MAX_HZ);
        let estimates: Vec<PitchEstimate> = [
            autocorrelation_pitch(&self.analyzer, &low),
            yin_pitch(&low, self.analyzer.sample_rate()),
            spectral_peak_pitch(&self.analyzer, &spectrum),
        ]
        .into_iter()
        .flatten()
        .filter(|e| e.confidence >= MIN_ESTIMATOR_CONFIDENCE)
        .collect();

        let mut weight = [0.0f32; 12];
        let mut count = [0usize; 12];
        for e in &estimates {
            weight[e.pitch_class as usize] += e.confidence;
            count[e.pitch_class as usize] += 1;
        }
        let mut best = None;
        for pc in 0..12 {
            if count[pc] > 0 && best.map_or(true, |b: usize| weight[pc] > weight[b]) {
                best = Some(pc);
            }
        }
        best.map(|pc| (pc as u8, weight[pc] / count[pc] as f32))
    }

    /// Detect the bass of one segment
    pub fn detect(&self, segment: &[f32]) -> BassDetection {
        if segment.is_empty() {
            return BassDetection::NoBass;
        }
        let starts: Vec<usize> = if segment.len() <= BASS_WINDOW {
            vec![0]
        } else {
            (0..=segment.len() - BASS_WINDOW).step_by(BASS_WINDOW_HOP).collect()
        };

        let votes: Vec<Option<(u8, f32)>> = starts
            .iter()
            .map(|&s| self.window_vote(&segment[s..(s + BASS_WINDOW).min(segment.len())]))
            .collect();

        let mut wins = [0usize; 12];
        let mut confidence_sum = [0.0f32; 12];
        for (pc, conf) in votes.iter().flatten() {
            wins[*pc as usize] += 1;
            confidence_sum[*pc as usize] += conf;
        }
        let mut winner = 0usize;
        for pc in 1..12 {
            if wins[pc] > wins[winner] || (wins[pc] == wins[winner] && confidence_sum[pc] > confidence_sum[winner]) {
                winner = pc;
            }
        }
        if wins[winner] == 0 {
            return BassDetection::NoBass;
        }

        let stability = wins[winner] as f32 / votes.len() as f32;
        if stability < MIN_BASS_STABILITY {
            return BassDetection::NoBass;
        }
        let mean_confidence = confidence_sum[winner] / wins[winner] as f32;
        BassDetection::Note {
            pitch_class: winner as u8,
            confidence: (0.5 * stability + 0.5 * mean_confidence).clamp(0.0, 1.0),
        }
    }

    /// Label suggested for `symbol` given a detected bass, and whether the confidence allows applying it
    fn suggest(&self, symbol: &ChordSymbol, bass: u8, confidence: f32) -> (ChordSymbol, bool) {
        let threshold = self.profile.slash_threshold();
        if bass == symbol.root {
            let mut s = *symbol;
            s.bass = None;
            (s, confidence >= threshold)
        } else if symbol.contains(bass) {
            let mut s = *symbol;
            s.bass = Some(bass);
            (s, confidence >= threshold)
        } else {
            (
                reroot(symbol, bass),
                self.allow_root_override && confidence > ROOT_OVERRIDE_CONFIDENCE,
            )
        }
    }

    /// Validate every event against the audio and apply confident rewrites
    ///
    /// # Arguments
    ///
    /// * `events` - Timeline to validate (labels are rewritten in place)
    /// * `samples` - Mono audio the timeline was tracked from
    /// * `hop_size` - Feature hop size in samples (maps frame indices to samples)
    /// * `spelling` - Note spelling for rewritten labels
    pub fn validate(
        &self,
        events: &mut [ChordEvent],
        samples: &[f32],
        hop_size: usize,
        spelling: NoteSpelling,
    ) -> Vec<ValidationRecord> {
        let ranges = segment_ranges(events, hop_size, samples.len());
        let detections: Vec<BassDetection> = ranges
            .par_iter()
            .map(|r| self.detect(&samples[r.clone()]))
            .collect();

        let mut records = Vec::with_capacity(events.len());
        for (i, detection) in detections.into_iter().enumerate() {
            let original = events[i].label.clone();
            let symbol = match ChordSymbol::parse(&original) {
                Some(s) => s,
                None => continue,
            };
            let (detected, suggested, confidence, apply) = match detection {
                BassDetection::NoBass => (NO_BASS.to_string(), original.clone(), 0.0, false),
                BassDetection::Note {
                    pitch_class,
                    confidence,
                } => {
                    let (s, ok) = self.suggest(&symbol, pitch_class, confidence);
                    (
                        note_name(pitch_class, spelling).to_string(),
                        s.format(spelling),
                        confidence,
                        ok,
                    )
                }
            };
            let applied = apply && suggested != original;
            if applied {
                log::trace!("Bass validator: {} -> {} ({:.2})", original, suggested, confidence);
                events[i].label = suggested.clone();
            }
            records.push(ValidationRecord {
                validator: ValidatorKind::Bass,
                event_index: i,
                time: events[i].time,
                original_label: original,
                detected,
                suggested_label: suggested,
                confidence,
                applied,
            });
        }

        log::debug!(
            "Bass validator: {} segments, {} overrides",
            records.len(),
            records.iter().filter(|r| r.applied).count()
        );
        records
    }
}

/// Reinterpret a chord over a foreign bass note as a chord rooted on that note
///
/// The new quality follows whichever third above the bass is present in the old
/// chord; a minor seventh above the bass is kept as "7".
fn reroot(symbol: &ChordSymbol, bass: u8) -> ChordSymbol {
    let quality = if symbol.contains((bass + 3) % 12) {
        ChordQuality::Minor
    } else if symbol.contains((bass + 4) % 12) {
        ChordQuality::Major
    } else {
        symbol.quality
    };
    let mut out = ChordSymbol::triad(bass, quality);
    if symbol.contains((bass + 10) % 12) {
        out.extension = Some(Extension::Seventh);
    }
    out
}
