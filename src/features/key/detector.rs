//! Key detection algorithm
//!
//! Two methods, tried in order:
//!
//! 1. **Bass-weighted tonic histogram**: loud frames (energy above the 80th
//!    percentile) vote for their bass pitch class with weight `energy / p80`. The
//!    winning pitch class is the tonic; its vote share is the tonic confidence.
//!    The mode is decided from the energy-weighted chroma by comparing the minor vs.
//!    major third, sixth and seventh above the tonic.
//! 2. **Krumhansl-Schmuckler**: the energy-weighted average chroma is correlated
//!    against the 24 rotated Krumhansl-Kessler profiles. Used when the histogram
//!    is empty or its tonic confidence is at most 0.25.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::{templates::KeyTemplates, KeyDetectionResult};
use crate::analysis::metadata::KeyMethod;
use crate::analysis::result::Key;
use crate::error::AnalysisError;
use crate::features::chroma::normalization::l1_normalize;
use crate::features::chroma::FrameFeatures;
use crate::features::spectrum::EPSILON;

/// Tonic confidence the bass histogram must exceed to be trusted
pub const BASS_TONIC_MIN_CONFIDENCE: f32 = 0.25;

/// Confidence reported for the default key (C major) on empty/silent input
pub const DEFAULT_KEY_CONFIDENCE: f32 = 0.5;

/// Opening/closing window (frames) weighted up in the mode decision
const EDGE_WINDOW_FRAMES: usize = 5;
const EDGE_WINDOW_WEIGHT: f32 = 3.0;

/// Weights of the third, sixth and seventh comparisons in the mode decision
const THIRD_WEIGHT: f32 = 2.0;
const SIXTH_WEIGHT: f32 = 1.0;
const SEVENTH_WEIGHT: f32 = 0.5;

/// Profile-correlation edge weighting: first and last tenth of frames
const PROFILE_EDGE_DIVISOR: usize = 10;
const PROFILE_OPENING_WEIGHT: f32 = 5.0;
const PROFILE_CLOSING_WEIGHT: f32 = 3.0;

/// Profile score that maps to confidence 1.0
const PROFILE_SCORE_SCALE: f32 = 10.0;

/// C major with moderate confidence, used when there is nothing to analyze
pub fn default_key() -> KeyDetectionResult {
    KeyDetectionResult {
        key: Key::Major(0),
        confidence: DEFAULT_KEY_CONFIDENCE,
        method: KeyMethod::Default,
    }
}

/// Detect the key of a feature sequence
///
/// Never fails: silent input yields [`default_key`].
pub fn detect_key(features: &FrameFeatures, templates: &KeyTemplates) -> KeyDetectionResult {
    if features.is_empty() || features.energy.iter().all(|&e| e <= EPSILON) {
        log::debug!("Key detection: no energy, using default key");
        return default_key();
    }

    if let Some(result) = detect_key_bass_histogram(features) {
        return result;
    }

    let weights = profile_weights(&features.energy);
    match detect_key_weighted(&features.chroma, &weights, templates) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Profile key detection failed ({}), using default key", e);
            default_key()
        }
    }
}

/// Bass-histogram key detection
///
/// # Returns
///
/// `None` when no loud frame carries a bass note or the tonic confidence is at
/// most [`BASS_TONIC_MIN_CONFIDENCE`]
pub fn detect_key_bass_histogram(features: &FrameFeatures) -> Option<KeyDetectionResult> {
    let threshold = features.percentiles.p80;
    let mut histogram = [0.0f32; 12];
    for (bass, &energy) in features.bass.iter().zip(&features.energy) {
        if let Some(pc) = bass {
            if energy > threshold {
                let weight = if threshold > EPSILON { energy / threshold } else { 1.0 };
                histogram[*pc as usize % 12] += weight;
            }
        }
    }

    let total: f32 = histogram.iter().sum();
    if total <= EPSILON {
        log::debug!("Bass histogram empty");
        return None;
    }

    let tonic = argmax(&histogram);
    let tonic_confidence = histogram[tonic] / total;
    if tonic_confidence <= BASS_TONIC_MIN_CONFIDENCE {
        log::debug!(
            "Bass histogram tonic {} too weak ({:.3}), falling back to profiles",
            tonic,
            tonic_confidence
        );
        return None;
    }

    let chroma = mode_chroma(features);
    let (major_score, minor_score) = mode_scores(&chroma, tonic as u8);
    let key = Key::new(tonic as u8, minor_score > major_score);

    let separation = (major_score - minor_score).abs() / (THIRD_WEIGHT + SIXTH_WEIGHT + SEVENTH_WEIGHT);
    let spread = diatonic_share(&chroma, &key);
    let confidence = (0.5 * tonic_confidence + 0.3 * separation + 0.2 * spread).min(1.0);

    log::debug!(
        "Bass histogram key: {} (tonic conf {:.3}, major {:.3} vs minor {:.3}, confidence {:.3})",
        key.name(),
        tonic_confidence,
        major_score,
        minor_score,
        confidence
    );

    Some(KeyDetectionResult {
        key,
        confidence,
        method: KeyMethod::BassHistogram,
    })
}

/// Krumhansl-Schmuckler key detection from weighted chroma
///
/// Averages chroma vectors with the given per-frame weights, normalizes the average,
/// then computes its dot product with each of the 24 key templates. The key with the
/// highest score is selected (ties: major before minor, lower tonic first).
///
/// # Arguments
///
/// * `chroma_vectors` - One 12-element chroma vector per frame
/// * `frame_weights` - Weight per frame
/// * `templates` - Key templates (Krumhansl-Kessler profiles)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if:
/// - Chroma vectors are empty
/// - Weights do not match the number of frames
/// - The weighted average carries no energy
pub fn detect_key_weighted(
    chroma_vectors: &[[f32; 12]],
    frame_weights: &[f32],
    templates: &KeyTemplates,
) -> Result<KeyDetectionResult, AnalysisError> {
    log::debug!("Detecting key from {} chroma vectors", chroma_vectors.len());

    if chroma_vectors.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty chroma vectors".to_string()));
    }
    if frame_weights.len() != chroma_vectors.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "frame_weights length mismatch: got {}, expected {}",
            frame_weights.len(),
            chroma_vectors.len()
        )));
    }

    let mut average = [0.0f32; 12];
    for (chroma, &w) in chroma_vectors.iter().zip(frame_weights) {
        if w > 0.0 {
            for (acc, &c) in average.iter_mut().zip(chroma) {
                *acc += w * c;
            }
        }
    }
    if average.iter().sum::<f32>() <= EPSILON {
        return Err(AnalysisError::InvalidInput("Chroma carries no energy".to_string()));
    }
    l1_normalize(&mut average);

    let mut best = (Key::Major(0), f32::NEG_INFINITY);
    for key in Key::all() {
        let template = if key.is_minor() {
            templates.get_minor_template(key.tonic())
        } else {
            templates.get_major_template(key.tonic())
        };
        let score = dot_product(&average, template);
        if score > best.1 {
            best = (key, score);
        }
    }

    let (key, score) = best;
    let confidence = (score / PROFILE_SCORE_SCALE).clamp(0.0, 1.0);
    log::debug!("Profile key: {}, score: {:.4}, confidence: {:.4}", key.name(), score, confidence);

    Ok(KeyDetectionResult {
        key,
        confidence,
        method: KeyMethod::ProfileCorrelation,
    })
}

/// Energy weights with the first 10% of frames x5 and the last 10% x3
pub fn profile_weights(energy: &[f32]) -> Vec<f32> {
    let n = energy.len();
    let edge = n.div_ceil(PROFILE_EDGE_DIVISOR);
    energy
        .iter()
        .enumerate()
        .map(|(i, &e)| {
            if i < edge {
                e * PROFILE_OPENING_WEIGHT
            } else if i + edge >= n {
                e * PROFILE_CLOSING_WEIGHT
            } else {
                e
            }
        })
        .collect()
}

/// Energy-weighted mean chroma with opening/closing windows weighted x3
fn mode_chroma(features: &FrameFeatures) -> [f32; 12] {
    let n = features.len();
    let mut acc = [0.0f32; 12];
    for (i, (chroma, &energy)) in features.chroma.iter().zip(&features.energy).enumerate() {
        let edge = i < EDGE_WINDOW_FRAMES || i + EDGE_WINDOW_FRAMES >= n;
        let w = if edge { energy * EDGE_WINDOW_WEIGHT } else { energy };
        for (a, &c) in acc.iter_mut().zip(chroma) {
            *a += w * c;
        }
    }
    l1_normalize(&mut acc);
    acc
}

/// (major score, minor score) from third, sixth and seventh comparisons above `tonic`
fn mode_scores(chroma: &[f32; 12], tonic: u8) -> (f32, f32) {
    let at = |interval: u8| chroma[((tonic + interval) % 12) as usize];
    let share = |a: f32, b: f32| if a + b > EPSILON { a / (a + b) } else { 0.5 };

    let pairs = [
        (at(4), at(3), THIRD_WEIGHT),
        (at(9), at(8), SIXTH_WEIGHT),
        (at(11), at(10), SEVENTH_WEIGHT),
    ];
    pairs.iter().fold((0.0, 0.0), |(major, minor), &(maj, min, w)| {
        (major + w * share(maj, min), minor + w * share(min, maj))
    })
}

/// Fraction of chroma energy on the key's scale degrees
fn diatonic_share(chroma: &[f32; 12], key: &Key) -> f32 {
    let total: f32 = chroma.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    key.scale().iter().map(|&pc| chroma[pc as usize]).sum::<f32>() / total
}

/// Index of the largest value (ties: lower index)
fn argmax(values: &[f32; 12]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
