//! Major/minor quality validator
//!
//! Re-measures the minor third (root + 3) against the major third (root + 4) from
//! the segment's averaged magnitude spectrum. With harmonic weighting, each third
//! is scored over its first four harmonics with weights favoring harmonics 2-4,
//! which reduces smearing from low-frequency content.
//!
//! A rolling memory of the last five decided (root, quality) observations adjusts
//! confidence: agreement with earlier observations of the same root adds 0.10,
//! while a recurring root consistently switching quality scales confidence by 1.15.

use super::{segment_ranges, ValidationRecord, ValidatorKind};
use crate::analysis::result::ChordEvent;
use crate::chords::notes::NoteSpelling;
use crate::chords::symbol::{ChordQuality, ChordSymbol, Extension};
use crate::config::AnalysisConfig;
use crate::features::spectrum::{midi_to_frequency, SpectrumAnalyzer, EPSILON};
use rayon::prelude::*;
use std::collections::VecDeque;

/// Analysis window and hop inside a segment
const QUALITY_WINDOW: usize = 4096;
const QUALITY_WINDOW_HOP: usize = 2048;

/// Weights of harmonics 1-4 when harmonic weighting is on
pub const HARMONIC_WEIGHTS: [f32; 4] = [0.5, 1.0, 1.0, 0.8];

/// MIDI range of third fundamentals considered (C2..C6)
const THIRD_MIDI_RANGE: std::ops::RangeInclusive<u8> = 36..=84;

/// Length of the rolling quality memory
pub const QUALITY_HISTORY_LEN: usize = 5;

/// Confidence bonus for agreement with the remembered quality of the same root
const CONSISTENCY_BONUS: f32 = 0.10;

/// Confidence factor for a remembered root that switched quality
const QUALITY_CHANGE_BOOST: f32 = 1.15;

/// Measured third strengths of one segment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThirdEvidence {
    /// Strength at root + 3
    pub minor: f32,
    /// Strength at root + 4
    pub major: f32,
}

impl ThirdEvidence {
    /// Winning quality and its share of the combined third strength
    pub fn winner(&self) -> Option<(ChordQuality, f32)> {
        let total = self.minor + self.major;
        if total <= EPSILON {
            return None;
        }
        if self.minor > self.major {
            Some((ChordQuality::Minor, self.minor / total))
        } else {
            Some((ChordQuality::Major, self.major / total))
        }
    }
}

/// Independent major/minor validator
#[derive(Debug)]
pub struct QualityValidator {
    analyzer: SpectrumAnalyzer,
    decision_threshold: f32,
    min_confidence_to_override: f32,
    harmonic_weighting: bool,
}

impl QualityValidator {
    /// Validator for audio at `sample_rate`
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(QUALITY_WINDOW, sample_rate),
            decision_threshold: config.decision_threshold,
            min_confidence_to_override: config.min_confidence_to_override,
            harmonic_weighting: config.harmonic_weighting,
        }
    }

    /// Mean magnitude spectrum (bins `0..=N/2`) over the segment's windows
    fn mean_magnitudes(&self, segment: &[f32]) -> Vec<f32> {
        let starts: Vec<usize> = if segment.len() <= QUALITY_WINDOW {
            vec![0]
        } else {
            (0..=segment.len() - QUALITY_WINDOW).step_by(QUALITY_WINDOW_HOP).collect()
        };
        let mut acc = vec![0.0f32; QUALITY_WINDOW / 2 + 1];
        for &s in &starts {
            let spectrum = self.analyzer.analyze(&segment[s..(s + QUALITY_WINDOW).min(segment.len())]);
            for (a, m) in acc.iter_mut().zip(spectrum.magnitudes()) {
                *a += m;
            }
        }
        let n = starts.len() as f32;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }

    /// Strength of pitch class `pc` summed over octaves, harmonic-weighted
    fn harmonic_strength(&self, magnitudes: &[f32], pc: u8) -> f32 {
        THIRD_MIDI_RANGE
            .filter(|m| m % 12 == pc % 12)
            .map(|m| {
                let f0 = midi_to_frequency(m as f32);
                HARMONIC_WEIGHTS
                    .iter()
                    .enumerate()
                    .map(|(h, w)| w * self.analyzer.magnitude_at(magnitudes, f0 * (h + 1) as f32))
                    .sum::<f32>()
            })
            .sum()
    }

    /// Minor vs. major third strength of `segment` for a chord on `root`
    pub fn third_evidence(&self, segment: &[f32], root: u8) -> ThirdEvidence {
        if segment.is_empty() {
            return ThirdEvidence::default();
        }
        let magnitudes = self.mean_magnitudes(segment);
        let minor_pc = (root + 3) % 12;
        let major_pc = (root + 4) % 12;
        if self.harmonic_weighting {
            ThirdEvidence {
                minor: self.harmonic_strength(&magnitudes, minor_pc),
                major: self.harmonic_strength(&magnitudes, major_pc),
            }
        } else {
            let chroma = self.analyzer.chroma_from_magnitudes(&magnitudes);
            ThirdEvidence {
                minor: chroma[minor_pc as usize],
                major: chroma[major_pc as usize],
            }
        }
    }

    /// Validate every event against the audio and flip confident quality mismatches
    ///
    /// Suspended chords are measured and recorded but never flipped.
    pub fn validate(
        &self,
        events: &mut [ChordEvent],
        samples: &[f32],
        hop_size: usize,
        spelling: NoteSpelling,
    ) -> Vec<ValidationRecord> {
        let ranges = segment_ranges(events, hop_size, samples.len());
        let symbols: Vec<Option<ChordSymbol>> = events.iter().map(|e| ChordSymbol::parse(&e.label)).collect();
        let evidence: Vec<Option<ThirdEvidence>> = ranges
            .par_iter()
            .zip(symbols.par_iter())
            .map(|(range, symbol)| symbol.map(|s| self.third_evidence(&samples[range.clone()], s.root)))
            .collect();

        let mut history: VecDeque<(u8, ChordQuality)> = VecDeque::with_capacity(QUALITY_HISTORY_LEN);
        let mut records = Vec::with_capacity(events.len());

        for (i, (symbol, evidence)) in symbols.into_iter().zip(evidence).enumerate() {
            let (symbol, evidence) = match (symbol, evidence) {
                (Some(s), Some(e)) => (s, e),
                _ => continue,
            };
            let original = events[i].label.clone();

            let decided = evidence.winner().filter(|&(_, share)| share > self.decision_threshold);
            let (detected, suggested, confidence, apply) = match decided {
                None => ("ambiguous".to_string(), original.clone(), 0.0, false),
                Some((quality, share)) => {
                    let mut confidence = 2.0 * (share - 0.5);
                    let remembered: Vec<ChordQuality> = history
                        .iter()
                        .filter(|(root, _)| *root == symbol.root)
                        .map(|(_, q)| *q)
                        .collect();
                    if !remembered.is_empty() {
                        if remembered.iter().all(|q| *q == quality) {
                            confidence += CONSISTENCY_BONUS;
                        } else if remembered.iter().all(|q| *q != quality) {
                            confidence *= QUALITY_CHANGE_BOOST;
                        }
                    }
                    let confidence = confidence.clamp(0.0, 1.0);

                    if history.len() == QUALITY_HISTORY_LEN {
                        history.pop_front();
                    }
                    history.push_back((symbol.root, quality));

                    let flip = !symbol.quality.is_suspended()
                        && symbol.quality != quality
                        && confidence >= self.min_confidence_to_override;
                    let suggested = if symbol.quality.is_suspended() {
                        original.clone()
                    } else {
                        with_quality(&symbol, quality).format(spelling)
                    };
                    let name = match quality {
                        ChordQuality::Minor => "minor",
                        _ => "major",
                    };
                    (name.to_string(), suggested, confidence, flip)
                }
            };

            let applied = apply && suggested != original;
            if applied {
                log::trace!("Quality validator: {} -> {} ({:.2})", original, suggested, confidence);
                events[i].label = suggested.clone();
            }
            records.push(ValidationRecord {
                validator: ValidatorKind::Quality,
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
            "Quality validator: {} segments, {} flips",
            records.len(),
            records.iter().filter(|r| r.applied).count()
        );
        records
    }
}

/// `symbol` with its third replaced; drops a maj7 on minor and a slash bass that is no longer a chord tone
fn with_quality(symbol: &ChordSymbol, quality: ChordQuality) -> ChordSymbol {
    let mut out = *symbol;
    out.quality = quality;
    if quality == ChordQuality::Minor && out.extension == Some(Extension::MajorSeventh) {
        out.extension = None;
    }
    if let Some(bass) = out.bass {
        if !out.contains(bass) {
            out.bass = None;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 22050;

    fn tone(freqs: &[f32], seconds: f32) -> Vec<f32> {
        let len = (seconds * SR as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * 0.2
            })
            .collect()
    }

    // A3 C4 E4 (A minor) and A3 C#4 E4 (A major)
    const A_MINOR: [f32; 3] = [220.0, 261.63, 329.63];
    const A_MAJOR: [f32; 3] = [220.0, 277.18, 329.63];

    #[test]
    fn test_third_evidence() {
        for weighting in [true, false] {
            let v = QualityValidator::new(
                SR,
                &AnalysisConfig {
                    harmonic_weighting: weighting,
                    ..AnalysisConfig::default()
                },
            );
            let minor = v.third_evidence(&tone(&A_MINOR, 1.0), 9);
            assert!(minor.minor > minor.major, "weighting={} {:?}", weighting, minor);
            let major = v.third_evidence(&tone(&A_MAJOR, 1.0), 9);
            assert!(major.major > major.minor, "weighting={} {:?}", weighting, major);
        }
    }

    #[test]
    fn test_flips_wrong_quality() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let audio = tone(&A_MINOR, 1.0);
        let mut events = vec![ChordEvent::new(0.0, "A", 0)];
        let records = v.validate(&mut events, &audio, 2205, NoteSpelling::Sharps);
        assert_eq!(events[0].label, "Am");
        assert!(records[0].applied);
        assert_eq!(records[0].detected, "minor");
    }

    #[test]
    fn test_correct_quality_untouched() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let audio = tone(&A_MAJOR, 1.0);
        let mut events = vec![ChordEvent::new(0.0, "A", 0)];
        let records = v.validate(&mut events, &audio, 2205, NoteSpelling::Sharps);
        assert_eq!(events[0].label, "A");
        assert!(!records[0].applied);
    }

    #[test]
    fn test_sus_never_flipped() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let audio = tone(&A_MINOR, 1.0);
        let mut events = vec![ChordEvent::new(0.0, "Asus4", 0)];
        v.validate(&mut events, &audio, 2205, NoteSpelling::Sharps);
        assert_eq!(events[0].label, "Asus4");
    }

    #[test]
    fn test_silence_is_ambiguous() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let mut events = vec![ChordEvent::new(0.0, "C", 0)];
        let records = v.validate(&mut events, &vec![0.0; 22050], 2205, NoteSpelling::Sharps);
        assert_eq!(records[0].detected, "ambiguous");
        assert_eq!(events[0].label, "C");
    }

    /// Weighted sine mix of (frequency, amplitude) pairs
    fn mix(partials: &[(f32, f32)], seconds: f32) -> Vec<f32> {
        let len = (seconds * SR as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                partials.iter().map(|(f, a)| a * (2.0 * PI * f * t).sin()).sum::<f32>() * 0.2
            })
            .collect()
    }

    // A minor / A major with a quieter competing third, so confidence stays well below 1.0
    fn leaning_minor() -> Vec<f32> {
        mix(&[(220.0, 1.0), (261.63, 1.0), (277.18, 0.4), (329.63, 1.0)], 1.0)
    }

    fn leaning_major() -> Vec<f32> {
        mix(&[(220.0, 1.0), (261.63, 0.4), (277.18, 1.0), (329.63, 1.0)], 1.0)
    }

    /// One-second segments, one event per segment (10 frames of 2205 samples)
    fn run(validator: &QualityValidator, parts: &[(&str, Vec<f32>)]) -> Vec<ValidationRecord> {
        let mut events: Vec<ChordEvent> = parts
            .iter()
            .enumerate()
            .map(|(i, (label, _))| ChordEvent::new(i as f32, *label, i * 10))
            .collect();
        let audio: Vec<f32> = parts.iter().flat_map(|(_, a)| a.iter().copied()).collect();
        validator.validate(&mut events, &audio, 2205, NoteSpelling::Sharps)
    }

    fn major_triad(root_midi: f32) -> Vec<f32> {
        let freqs = [root_midi, root_midi + 4.0, root_midi + 7.0].map(midi_to_frequency);
        tone(&freqs, 1.0)
    }

    #[test]
    fn test_consistent_root_gets_bonus() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let isolated = run(&v, &[("Am", leaning_minor())]);
        assert_eq!(isolated[0].detected, "minor");
        let base = isolated[0].confidence;
        assert!(base > 0.0 && base < 0.9, "base confidence {} leaves no room for the bonus", base);

        let records = run(&v, &[("Am", leaning_minor()), ("C", major_triad(60.0)), ("Am", leaning_minor())]);
        assert_eq!(records.len(), 3);
        assert!((records[0].confidence - base).abs() < 1e-6);
        assert!(
            (records[2].confidence - (base + CONSISTENCY_BONUS)).abs() < 1e-6,
            "expected {} + 0.10, got {}",
            base,
            records[2].confidence
        );
    }

    #[test]
    fn test_quality_change_gets_boost() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let isolated = run(&v, &[("A", leaning_major())]);
        assert_eq!(isolated[0].detected, "major");
        let base = isolated[0].confidence;
        assert!(base > 0.0 && base * QUALITY_CHANGE_BOOST < 1.0);

        let records = run(&v, &[("Am", leaning_minor()), ("A", leaning_major())]);
        assert_eq!(records[1].detected, "major");
        assert!(
            (records[1].confidence - base * QUALITY_CHANGE_BOOST).abs() < 1e-6,
            "expected {} x 1.15, got {}",
            base,
            records[1].confidence
        );
        assert!(!records[1].applied);
    }

    #[test]
    fn test_history_forgets_old_roots() {
        let v = QualityValidator::new(SR, &AnalysisConfig::default());
        let base = run(&v, &[("Am", leaning_minor())])[0].confidence;

        // Five other decided roots push the first A minor out of the memory
        let records = run(
            &v,
            &[
                ("Am", leaning_minor()),
                ("C", major_triad(60.0)),
                ("D", major_triad(62.0)),
                ("E", major_triad(64.0)),
                ("F", major_triad(65.0)),
                ("G", major_triad(67.0)),
                ("Am", leaning_minor()),
            ],
        );
        assert_eq!(records.len(), 7);
        for r in &records[1..6] {
            assert_eq!(r.detected, "major", "{} should be decided: {:?}", r.original_label, r);
        }
        assert!((records[6].confidence - base).abs() < 1e-6, "A minor should no longer be remembered");
    }

    #[test]
    fn test_with_quality() {
        let s = ChordSymbol::parse("Cmaj7/E").unwrap();
        assert_eq!(with_quality(&s, ChordQuality::Minor).format(NoteSpelling::Sharps), "Cm");
        let s = ChordSymbol::parse("Am7/G").unwrap();
        assert_eq!(with_quality(&s, ChordQuality::Major).format(NoteSpelling::Sharps), "A7/G");
    }
}
