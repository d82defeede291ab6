//! # Stratum Chords
//!
//! A chord detection and harmonic analysis engine: turns a buffer of PCM audio into a
//! time-stamped chord timeline together with the song's key and tempo.
//!
//! ## Features
//!
//! - **Chroma + Bass Features**: 100 ms frames of 12-bin chroma, bass pitch class and energy
//! - **Key Detection**: Bass-weighted tonic histogram with a Krumhansl-Kessler fallback
//! - **Chord Tracking**: Beam-searched Viterbi decoding over a key-conditioned vocabulary
//! - **Timeline Refinement**: Beat snapping, duration filtering, sevenths, sus chords and inversions
//! - **Second Opinions**: Bass and major/minor validators with a per-chord audit trail
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_chords::{analyze_samples, AnalysisConfig};
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let result = analyze_samples(&samples, sample_rate, AnalysisConfig::default())?;
//!
//! println!("Key: {} (confidence: {:.2})", result.key.key().name(), result.key.confidence);
//! for chord in &result.chords {
//!     println!("{:>7.2}s  {}", chord.time, chord.label);
//! }
//! # Ok::<(), stratum_chords::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The analysis pipeline follows this flow:
//!
//! ```text
//! Audio Input → Front End → Features → Key → Chord Tracker → Refiner → Validators → Output
//! ```
//!
//! The key is re-estimated at most once from the tracked chords when they fit it poorly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod chords;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod refinement;
pub mod validation;

// Re-export main types
pub use analysis::metadata::{AnalysisMetadata, KeyMethod};
pub use analysis::result::{AnalysisFlag, BeatGrid, ChordAnalysis, ChordEvent, Key, KeyEstimate};
pub use chords::ChordSymbol;
pub use config::{AnalysisConfig, HarmonyMode, ValidatorProfile};
pub use error::AnalysisError;
pub use io::AudioInput;
pub use validation::{ValidationRecord, ValidatorKind};

use chords::ChordTracker;
use features::beat_tracking::generate_beat_grid;
use features::chroma::{FeatureExtractor, FrameFeatures};
use features::key::{default_key, detect_key, reestimate_key, KeyTemplates};
use features::period::{estimate_tempo, DEFAULT_BPM};
use preprocessing::channel_mixer::downmix_to_mono;
use preprocessing::resample::{resample_linear, ANALYSIS_SAMPLE_RATE};
use preprocessing::silence::SilenceDetector;
use refinement::{merge_duplicates_indexed, RefinementContext, TimelineRefiner};
use std::time::Instant;
use validation::{remap_records, BassValidator, QualityValidator};

/// Key confidence below which the result is flagged as weakly tonal
pub const WEAK_TONALITY_CONFIDENCE: f32 = 0.3;

/// Optional wall-clock budget checked between pipeline stages
struct Deadline {
    start: Instant,
    budget_ms: Option<u64>,
}

impl Deadline {
    fn new(budget_ms: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            budget_ms,
        }
    }

    fn elapsed_ms(&self) -> f32 {
        self.start.elapsed().as_secs_f32() * 1000.0
    }

    fn check(&self, stage: &str) -> Result<(), AnalysisError> {
        let Some(budget_ms) = self.budget_ms else {
            return Ok(());
        };
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        if elapsed_ms > budget_ms {
            log::warn!(
                "Processing budget exceeded after {}: {} ms > {} ms",
                stage,
                elapsed_ms,
                budget_ms
            );
            return Err(AnalysisError::DeadlineExceeded {
                elapsed_ms,
                budget_ms,
            });
        }
        Ok(())
    }
}

/// Analyze mono samples
///
/// Convenience wrapper around [`analyze_chords`] for a single channel.
///
/// # Example
///
/// ```no_run
/// use stratum_chords::{analyze_samples, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 5]; // 5 seconds of silence
/// let result = analyze_samples(&samples, 44100, AnalysisConfig::default())?;
/// assert_eq!(result.chords.len(), 1);
/// # Ok::<(), stratum_chords::AnalysisError>(())
/// ```
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<ChordAnalysis, AnalysisError> {
    analyze_chords(&AudioInput::mono(samples.to_vec(), sample_rate), config)
}

/// Main analysis function
///
/// Produces the chord timeline, key, tempo and beat grid of one audio buffer.
///
/// # Arguments
///
/// * `input` - Planar PCM with its sample rate (any channel count)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `ChordAnalysis` whose chords are time-ordered within `[0, duration]`, with no two
/// adjacent events sharing a label. Empty or silent input yields a degraded result
/// (default key and tempo, one tonic chord at t=0) flagged `SilentInput`.
///
/// # Errors
///
/// - `AnalysisError::InvalidInput` for a zero sample rate, no channels, ragged channels,
///   non-finite samples or an invalid configuration
/// - `AnalysisError::DeadlineExceeded` when `config.processing_budget_ms` elapses
/// - `AnalysisError::ProcessingError` / `NumericalError` for internal faults
pub fn analyze_chords(input: &AudioInput, config: AnalysisConfig) -> Result<ChordAnalysis, AnalysisError> {
    let deadline = Deadline::new(config.processing_budget_ms);

    config.validate()?;
    input.validate()?;

    log::debug!(
        "Starting chord analysis: {} frames x {} channels at {} Hz",
        input.frames(),
        input.channels.len(),
        input.sample_rate
    );

    let duration = input.duration_seconds();
    let mut metadata = AnalysisMetadata {
        sample_rate: input.sample_rate,
        analysis_sample_rate: ANALYSIS_SAMPLE_RATE,
        ..AnalysisMetadata::default()
    };

    // Front end: mono at the analysis rate
    let mono = downmix_to_mono(input);
    let samples = resample_linear(&mono, input.sample_rate, ANALYSIS_SAMPLE_RATE);
    log::debug!(
        "Front end: {} -> {} samples at {} Hz",
        mono.len(),
        samples.len(),
        ANALYSIS_SAMPLE_RATE
    );

    if SilenceDetector::default().is_silent(&samples) {
        log::warn!("Input is empty or silent; returning the default analysis");
        metadata.flag(AnalysisFlag::SilentInput);
        metadata
            .warnings
            .push("Audio is empty or silent; key, tempo and chords are defaults".to_string());
        metadata.processing_time_ms = deadline.elapsed_ms();
        return Ok(degraded_result(duration, metadata));
    }
    deadline.check("front end")?;

    let tempo = estimate_tempo(&samples, ANALYSIS_SAMPLE_RATE);
    log::debug!("Tempo: {:.1} BPM (confidence {:.2})", tempo.bpm, tempo.confidence);

    let features = FeatureExtractor::new(ANALYSIS_SAMPLE_RATE).extract(&samples)?;
    deadline.check("feature extraction")?;

    analyze_features(
        &features,
        &samples,
        tempo.bpm,
        duration,
        &config,
        metadata,
        &deadline,
    )
}

/// Key, chord, refinement and validation stages over extracted features
///
/// `samples` is the analysis-rate mono audio the features came from; the validators
/// re-read it.
fn analyze_features(
    features: &FrameFeatures,
    samples: &[f32],
    bpm: f32,
    duration: f32,
    config: &AnalysisConfig,
    mut metadata: AnalysisMetadata,
    deadline: &Deadline,
) -> Result<ChordAnalysis, AnalysisError> {
    let detection = detect_key(features, &KeyTemplates::new());
    let mut key = detection.key;
    let mut key_confidence = detection.confidence;
    metadata.key_method = detection.method;
    log::debug!(
        "Key: {} (confidence {:.2}, {:?})",
        key.name(),
        key_confidence,
        detection.method
    );

    let beats = generate_beat_grid(bpm, beat_anchor(features), duration);
    deadline.check("key detection")?;

    let mut events = track_and_refine(key, features, &beats, bpm, duration, config)?;
    deadline.check("chord tracking")?;

    // At most one re-estimation round
    if let Some(reestimation) = reestimate_key(&events, &key) {
        log::debug!(
            "Key re-estimated: {} -> {} (diatonic fit {:.2} -> {:.2})",
            key.name(),
            reestimation.key.name(),
            reestimation.previous_ratio,
            reestimation.ratio
        );
        key = reestimation.key;
        key_confidence = reestimation.ratio;
        metadata.key_method = KeyMethod::ChordFit;
        metadata.key_reestimated = true;
        metadata.flag(AnalysisFlag::KeyReestimated);
        events = track_and_refine(key, features, &beats, bpm, duration, config)?;
        deadline.check("chord re-tracking")?;
    }

    if events.is_empty() {
        log::warn!("Chord tracking produced no events; substituting the tonic chord");
        metadata.flag(AnalysisFlag::EmptyTimelineFallback);
        events.push(ChordEvent::new(0.0, key.tonic_label(), 0));
    }

    let mut validations = Vec::new();
    if config.enable_bass_validator {
        let validator = BassValidator::new(ANALYSIS_SAMPLE_RATE, config);
        validations.extend(validator.validate(&mut events, samples, features.hop_size, key.spelling()));
        deadline.check("bass validation")?;
    }
    if config.enable_quality_validator {
        let validator = QualityValidator::new(ANALYSIS_SAMPLE_RATE, config);
        validations.extend(validator.validate(&mut events, samples, features.hop_size, key.spelling()));
        deadline.check("quality validation")?;
    }

    // Overrides can make neighbours equal
    let (chords, index_map) = merge_duplicates_indexed(events);
    remap_records(&mut validations, &index_map, &chords);

    if key_confidence < WEAK_TONALITY_CONFIDENCE {
        metadata.flag(AnalysisFlag::WeakTonality);
        metadata
            .warnings
            .push(format!("Weak tonality: key confidence {:.2}", key_confidence));
    }

    metadata.processing_time_ms = deadline.elapsed_ms();
    log::debug!(
        "Chord analysis finished: {} chords in {:.1} ms",
        chords.len(),
        metadata.processing_time_ms
    );

    Ok(ChordAnalysis {
        chords,
        key: KeyEstimate::new(key, key_confidence),
        bpm,
        duration,
        beats,
        metadata,
        validations,
    })
}

/// Decode the chord path for `key` and run the refiner over it
fn track_and_refine(
    key: Key,
    features: &FrameFeatures,
    beats: &BeatGrid,
    bpm: f32,
    duration: f32,
    config: &AnalysisConfig,
) -> Result<Vec<ChordEvent>, AnalysisError> {
    let raw = ChordTracker::new(key, config).track(features)?;
    log::debug!("Tracked {} raw chord events in {}", raw.len(), key.name());

    let refiner = TimelineRefiner::new(RefinementContext {
        features,
        key,
        beats,
        bpm,
        duration,
        harmony_mode: config.harmony_mode,
    });
    Ok(refiner.refine(raw))
}

/// Time of the first frame louder than the 30th energy percentile (0.0 if none)
fn beat_anchor(features: &FrameFeatures) -> f32 {
    let threshold = features.percentiles.p30;
    features
        .energy
        .iter()
        .position(|&e| e > threshold)
        .map(|i| features.frame_time(i))
        .unwrap_or(0.0)
}

/// Result for input with nothing to analyze
fn degraded_result(duration: f32, mut metadata: AnalysisMetadata) -> ChordAnalysis {
    let detection = default_key();
    metadata.key_method = detection.method;
    ChordAnalysis {
        chords: vec![ChordEvent::new(0.0, detection.key.tonic_label(), 0)],
        key: KeyEstimate::new(detection.key, detection.confidence),
        bpm: DEFAULT_BPM,
        duration,
        beats: generate_beat_grid(DEFAULT_BPM, 0.0, duration),
        metadata,
        validations: Vec::new(),
    }
}
