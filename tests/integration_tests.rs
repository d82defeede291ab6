//! Integration tests for the chord analysis engine

use stratum_chords::chords::ChordSymbol;
use stratum_chords::features::chroma::FeatureExtractor;
use stratum_chords::features::key::{detect_key, KeyTemplates};
use stratum_chords::features::beat_tracking::generate_beat_grid;
use stratum_chords::chords::ChordTracker;
use stratum_chords::refinement::{RefinementContext, TimelineRefiner};
use stratum_chords::{
    analyze_chords, analyze_samples, AnalysisConfig, AnalysisError, AnalysisFlag, AudioInput,
    ChordAnalysis, HarmonyMode,
};
use std::f32::consts::PI;

const SR: u32 = 44100;

// Octave-4 triads over an octave-3 bass
const C_MAJOR: [f32; 3] = [261.63, 329.63, 392.00];
const G_MAJOR: [f32; 3] = [392.00, 493.88, 587.33];
const G_SEVENTH: [f32; 4] = [392.00, 493.88, 587.33, 698.46];
const C3: f32 = 130.81;
const E3: f32 = 164.81;
const G3: f32 = 196.00;

/// Sine-sum chord with a bass note and a decaying pulse every half second
fn chord_segment(triad: &[f32], bass: f32, bass_gain: f32, seconds: f32) -> Vec<f32> {
    let len = (seconds * SR as f32) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / SR as f32;
            let envelope = 0.4 + 0.6 * (-4.0 * (t % 0.5)).exp();
            let upper: f32 = triad.iter().map(|f| (2.0 * PI * f * t).sin()).sum();
            let low = bass_gain * (2.0 * PI * bass * t).sin();
            0.15 * envelope * (upper + low)
        })
        .collect()
}

/// C and G major triads alternating every 2 seconds for 8 seconds
fn c_g_alternation() -> Vec<f32> {
    let mut samples = Vec::new();
    for i in 0..4 {
        if i % 2 == 0 {
            samples.extend(chord_segment(&C_MAJOR, C3, 1.0, 2.0));
        } else {
            samples.extend(chord_segment(&G_MAJOR, G3, 1.0, 2.0));
        }
    }
    samples
}

/// A minor triad over an A2 bass, shifted by `semitones`
fn minor_triad(semitones: i32, seconds: f32) -> Vec<f32> {
    let shift = 2f32.powf(semitones as f32 / 12.0);
    let triad = [440.0 * shift, 523.25 * shift, 659.26 * shift];
    chord_segment(&triad, 110.0 * shift, 1.0, seconds)
}

fn assert_well_formed(result: &ChordAnalysis) {
    assert!(!result.chords.is_empty(), "Timeline must never be empty");
    for pair in result.chords.windows(2) {
        assert!(
            pair[0].time <= pair[1].time,
            "Times must be non-decreasing: {:?}",
            result.labels()
        );
        assert_ne!(
            pair[0].label, pair[1].label,
            "Adjacent events must differ: {:?}",
            result.labels()
        );
    }
    for chord in &result.chords {
        assert!(
            chord.time >= 0.0 && chord.time <= result.duration,
            "Event time {:.3} outside [0, {:.3}]",
            chord.time,
            result.duration
        );
        assert!(
            ChordSymbol::parse(&chord.label).is_some(),
            "Label {:?} does not parse",
            chord.label
        );
    }
    assert!(
        (0.0..=1.0).contains(&result.key.confidence),
        "Key confidence out of range: {}",
        result.key.confidence
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_input_degraded_result() {
        let samples = vec![0.0f32; SR as usize * 5];
        let result = analyze_samples(&samples, SR, AnalysisConfig::default())
            .expect("Silent input should not be an error");

        assert_eq!(result.labels(), vec!["C"], "Silent input yields the tonic chord");
        assert_eq!(result.chords[0].time, 0.0);
        assert_eq!(result.bpm, 120.0);
        assert!((result.duration - 5.0).abs() < 1e-3, "duration={}", result.duration);
        assert!((result.key.confidence - 0.5).abs() < 1e-6);
        assert!(result.metadata.flags.contains(&AnalysisFlag::SilentInput));
        assert!(result.validations.is_empty());
    }

    #[test]
    fn test_empty_input_degraded_result() {
        let result = analyze_samples(&[], SR, AnalysisConfig::default())
            .expect("Empty input should not be an error");
        assert_eq!(result.chords.len(), 1);
        assert_eq!(result.duration, 0.0);
        assert!(result.metadata.flags.contains(&AnalysisFlag::SilentInput));
    }

    #[test]
    fn test_c_g_alternation() {
        let result = analyze_samples(&c_g_alternation(), SR, AnalysisConfig::default())
            .expect("Analysis should succeed");
        assert_well_formed(&result);

        assert_eq!(
            result.labels(),
            vec!["C", "G", "C", "G"],
            "Expected alternating C/G, key {:?}, validations {:?}",
            result.key,
            result.validations
        );
        for (chord, expected) in result.chords.iter().zip([0.0f32, 2.0, 4.0, 6.0]) {
            assert!(
                (chord.time - expected).abs() <= 0.5,
                "{} at {:.2}s, expected ~{:.1}s",
                chord.label,
                chord.time,
                expected
            );
        }
        assert!((result.duration - 8.0).abs() < 1e-3);
        assert!(
            (60.0..=200.0).contains(&result.bpm),
            "BPM must stay in range, got {}",
            result.bpm
        );
        assert!(!result.key.minor, "C/G material should be major, got {:?}", result.key);
    }

    #[test]
    fn test_dominant_seventh_after_chord_change() {
        let mut samples = Vec::new();
        for i in 0..4 {
            if i % 2 == 0 {
                samples.extend(chord_segment(&C_MAJOR, C3, 1.0, 2.0));
            } else {
                samples.extend(chord_segment(&G_SEVENTH, G3, 1.0, 2.0));
            }
        }
        let config = AnalysisConfig {
            harmony_mode: HarmonyMode::Jazz,
            ..AnalysisConfig::default()
        };
        let result = analyze_samples(&samples, SR, config).expect("Analysis should succeed");
        assert_well_formed(&result);
        assert_eq!(
            result.labels(),
            vec!["C", "G7", "C", "G7"],
            "G7 must keep its seventh right after the change, key {:?}",
            result.key
        );
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let samples = c_g_alternation();
        let a = analyze_samples(&samples, SR, AnalysisConfig::default()).expect("first run");
        let b = analyze_samples(&samples, SR, AnalysisConfig::default()).expect("second run");
        assert_eq!(a.chords, b.chords);
        assert_eq!(a.key, b.key);
        assert_eq!(a.validations, b.validations);
    }

    #[test]
    fn test_refinement_idempotent_on_tracked_audio() {
        let samples: Vec<f32> = c_g_alternation()
            .iter()
            .step_by(2)
            .copied()
            .collect();
        let features = FeatureExtractor::new(22050)
            .extract(&samples)
            .expect("feature extraction");
        let key = detect_key(&features, &KeyTemplates::new()).key;
        let config = AnalysisConfig::default();
        let raw = ChordTracker::new(key, &config).track(&features).expect("tracking");
        let beats = generate_beat_grid(120.0, 0.0, 8.0);
        let refiner = TimelineRefiner::new(RefinementContext {
            features: &features,
            key,
            beats: &beats,
            bpm: 120.0,
            duration: 8.0,
            harmony_mode: config.harmony_mode,
        });

        let once = refiner.refine(raw);
        let twice = refiner.refine(once.clone());
        assert_eq!(once, twice, "Refining a refined timeline must not change it");
    }

    #[test]
    fn test_key_follows_transposition() {
        let base = analyze_samples(&minor_triad(0, 6.0), SR, AnalysisConfig::default())
            .expect("base analysis");
        let shifted = analyze_samples(&minor_triad(3, 6.0), SR, AnalysisConfig::default())
            .expect("shifted analysis");

        assert_eq!(base.key.root, 9, "A minor triad should give tonic A, got {:?}", base.key);
        assert!(base.key.minor, "A minor triad should give a minor key");
        assert_eq!(
            shifted.key.root,
            (base.key.root + 3) % 12,
            "Key should move with the audio: {:?} -> {:?}",
            base.key,
            shifted.key
        );
        assert_eq!(shifted.key.minor, base.key.minor);
        assert!(
            (shifted.key.confidence - base.key.confidence).abs() < 0.1,
            "Confidence should be stable: {:.3} vs {:.3}",
            base.key.confidence,
            shifted.key.confidence
        );
        assert_eq!(base.labels(), vec!["Am"]);
        assert_eq!(shifted.labels(), vec!["Cm"]);
    }

    #[test]
    fn test_first_inversion_gets_slash_bass() {
        let samples = chord_segment(&C_MAJOR, E3, 0.5, 6.0);
        let result = analyze_samples(&samples, SR, AnalysisConfig::default())
            .expect("Analysis should succeed");
        assert_well_formed(&result);
        assert_eq!(
            result.labels(),
            vec!["C/E"],
            "C triad over E should be labelled as an inversion, key {:?}",
            result.key
        );
    }

    #[test]
    fn test_interleaved_stereo_matches_mono() {
        let mono = c_g_alternation();
        let interleaved: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();
        let input = AudioInput::from_interleaved(&interleaved, 2, SR).expect("valid stereo");
        assert_eq!(input.frames(), mono.len());

        let stereo = analyze_chords(&input, AnalysisConfig::default()).expect("stereo analysis");
        let single = analyze_samples(&mono, SR, AnalysisConfig::default()).expect("mono analysis");
        assert_eq!(stereo.labels(), single.labels());
        assert_eq!(stereo.key, single.key);
        assert_eq!(stereo.metadata.sample_rate, SR);
        assert_eq!(stereo.metadata.analysis_sample_rate, 22050);
    }

    #[test]
    fn test_wav_round_trip() {
        let samples = c_g_alternation();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for &s in &samples {
                writer
                    .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.set_position(0);

        let mut reader = hound::WavReader::new(cursor).expect("wav reader");
        let decoded: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()
            .expect("decode samples");
        assert_eq!(decoded.len(), samples.len());

        let from_wav = analyze_samples(&decoded, reader.spec().sample_rate, AnalysisConfig::default())
            .expect("analysis of decoded wav");
        let direct = analyze_samples(&samples, SR, AnalysisConfig::default()).expect("direct analysis");
        assert_eq!(from_wav.labels(), direct.labels());
    }

    #[test]
    fn test_json_output_contract() {
        let result = analyze_samples(&c_g_alternation(), SR, AnalysisConfig::default())
            .expect("Analysis should succeed");
        let json = result.to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        let chords = value["chords"].as_array().expect("chords array");
        assert_eq!(chords.len(), result.chords.len());
        assert!(chords[0]["t"].is_number());
        assert!(chords[0]["label"].is_string());
        assert!(chords[0].get("frame_index").is_none(), "frame index is internal");
        assert!(value["key"]["root"].is_number());
        assert!(value["key"]["minor"].is_boolean());
        assert!(value["bpm"].is_number());
        assert!(value["duration"].is_number());
    }

    #[test]
    fn test_validators_can_be_disabled() {
        let config = AnalysisConfig {
            enable_bass_validator: false,
            enable_quality_validator: false,
            ..AnalysisConfig::default()
        };
        let result = analyze_samples(&c_g_alternation(), SR, config).expect("analysis");
        assert!(result.validations.is_empty());
        assert_well_formed(&result);
    }

    #[test]
    fn test_validators_record_every_segment() {
        let result = analyze_samples(&c_g_alternation(), SR, AnalysisConfig::default())
            .expect("analysis");
        // One bass and one quality record per pre-merge event
        assert!(
            result.validations.len() >= 2 * result.chords.len(),
            "{} records for {} chords",
            result.validations.len(),
            result.chords.len()
        );
    }

    #[test]
    fn test_invalid_input_errors() {
        let err = analyze_samples(&[0.1; 1000], 0, AnalysisConfig::default())
            .expect_err("zero sample rate must fail");
        assert!(err.is_input_error(), "unexpected error: {}", err);

        let mut samples = vec![0.1f32; 44100];
        samples[100] = f32::NAN;
        let err = analyze_samples(&samples, SR, AnalysisConfig::default())
            .expect_err("NaN sample must fail");
        assert!(err.is_input_error(), "unexpected error: {}", err);

        let ragged = AudioInput::new(vec![vec![0.0; 100], vec![0.0; 99]], SR);
        let err = analyze_chords(&ragged, AnalysisConfig::default()).expect_err("ragged must fail");
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let config = AnalysisConfig {
            beam_width: 0,
            ..AnalysisConfig::default()
        };
        let err = analyze_samples(&[0.0; 100], SR, config).expect_err("beam width 0 must fail");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_zero_budget_deadline() {
        let config = AnalysisConfig {
            processing_budget_ms: Some(0),
            ..AnalysisConfig::default()
        };
        let err = analyze_samples(&c_g_alternation(), SR, config).expect_err("budget of 0 ms");
        assert!(
            matches!(err, AnalysisError::DeadlineExceeded { budget_ms: 0, .. }),
            "unexpected error: {}",
            err
        );
        assert!(!err.is_input_error());
    }
}
