//! Key detection modules
//!
//! Detect musical key using:
//! - Energy-weighted bass histogram (tonic) with third/sixth/seventh mode scoring
//! - Krumhansl-Schmuckler template correlation (fallback)
//! - Chord-fit re-estimation over the tracked timeline

pub mod detector;
pub mod reestimation;
pub mod templates;

pub use detector::{default_key, detect_key, detect_key_bass_histogram, detect_key_weighted};
pub use reestimation::{diatonic_match_ratio, reestimate_key, KeyReestimation};
pub use templates::KeyTemplates;

use crate::analysis::metadata::KeyMethod;
use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDetectionResult {
    /// Detected key
    pub key: Key,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Method that produced the key
    pub method: KeyMethod,
}
