//! Configuration parameters for chord analysis
//!
//! The configuration doubles as the caller's options bag: it deserializes with
//! `#[serde(default)]`, so a partial JSON object only overrides the fields it names.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Which chord extensions the refiner decorates labels with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarmonyMode {
    /// Plain major/minor triads (plus slash basses)
    Basic,
    /// Adds "7" / "maj7" when the seventh is clearly present
    Jazz,
    /// Like `Jazz` with a more sensitive seventh threshold, plus sus2/sus4 rewriting
    Pro,
}

impl HarmonyMode {
    /// Seventh-bin chroma threshold, or `None` when sevenths are not decorated
    pub fn seventh_threshold(&self) -> Option<f32> {
        match self {
            HarmonyMode::Basic => None,
            HarmonyMode::Jazz => Some(0.16),
            HarmonyMode::Pro => Some(0.15),
        }
    }

    /// Whether weak-third triads may be rewritten as sus2/sus4
    pub fn allows_suspensions(&self) -> bool {
        matches!(self, HarmonyMode::Pro)
    }
}

/// How eagerly the bass validator rewrites slash basses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorProfile {
    /// Slash bass needs confidence >= 0.65
    Conservative,
    /// Slash bass needs confidence >= 0.5
    Balanced,
    /// Slash bass needs confidence >= 0.35
    Aggressive,
}

impl ValidatorProfile {
    /// Minimum bass confidence for adding or replacing a slash bass
    pub fn slash_threshold(&self) -> f32 {
        match self {
            ValidatorProfile::Conservative => 0.65,
            ValidatorProfile::Balanced => 0.5,
            ValidatorProfile::Aggressive => 0.35,
        }
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Chord tracking
    /// Weight of the bass bonus in the emission score (default: 1.2)
    /// The bonus added when the frame's bass matches a candidate root is `0.15 * bass_multiplier`
    pub bass_multiplier: f32,

    /// Viterbi beam width: predecessor states kept per frame (default: 8)
    pub beam_width: usize,

    // Refinement
    /// Extension decoration mode (default: Jazz)
    pub harmony_mode: HarmonyMode,

    // Second-opinion validators
    /// Run the independent bass validator (default: true)
    pub enable_bass_validator: bool,

    /// Bass validator threshold profile (default: Balanced)
    pub validator_profile: ValidatorProfile,

    /// Let the bass validator re-root a chord on a confident non-chord-tone bass (default: false)
    pub allow_root_override: bool,

    /// Run the independent major/minor validator (default: true)
    pub enable_quality_validator: bool,

    /// Minimum share of the winning third among (minor third + major third) (default: 0.6)
    pub decision_threshold: f32,

    /// Minimum quality-validator confidence for flipping major/minor (default: 0.3)
    pub min_confidence_to_override: f32,

    /// Weight 2nd-4th harmonics over the fundamental when measuring thirds (default: true)
    pub harmonic_weighting: bool,

    // Service integration
    /// Optional processing budget in milliseconds, checked between pipeline stages (default: None)
    pub processing_budget_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bass_multiplier: 1.2,
            beam_width: 8,
            harmony_mode: HarmonyMode::Jazz,
            enable_bass_validator: true,
            validator_profile: ValidatorProfile::Balanced,
            allow_root_override: false,
            enable_quality_validator: true,
            decision_threshold: 0.6,
            min_confidence_to_override: 0.3,
            harmonic_weighting: true,
            processing_budget_ms: None,
        }
    }
}

impl AnalysisConfig {
    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.bass_multiplier.is_finite() || self.bass_multiplier < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "bass_multiplier must be finite and >= 0, got {}",
                self.bass_multiplier
            )));
        }
        if self.beam_width == 0 {
            return Err(AnalysisError::InvalidInput(
                "beam_width must be >= 1".to_string(),
            ));
        }
        for (name, value) in [
            ("decision_threshold", self.decision_threshold),
            ("min_confidence_to_override", self.min_confidence_to_override),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
