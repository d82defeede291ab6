//! Analysis metadata structures

use super::result::AnalysisFlag;
use serde::{Deserialize, Serialize};

/// How the key was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMethod {
    /// Energy-weighted bass histogram with third/sixth/seventh mode scoring
    BassHistogram,
    /// Krumhansl-Schmuckler profile correlation
    ProfileCorrelation,
    /// Diatonic-fit search over the tracked chords
    ChordFit,
    /// Nothing to analyze; default key
    Default,
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Input sample rate in Hz
    pub sample_rate: u32,

    /// Internal analysis sample rate in Hz
    pub analysis_sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Method that produced the reported key
    pub key_method: KeyMethod,

    /// The key was replaced after the first tracking pass
    pub key_reestimated: bool,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,

    /// Confidence warnings (low confidence, degraded paths)
    pub warnings: Vec<String>,
}

impl AnalysisMetadata {
    /// Record a flag once
    pub fn flag(&mut self, flag: AnalysisFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            analysis_sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            key_method: KeyMethod::Default,
            key_reestimated: false,
            flags: vec![],
            warnings: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_deduplicates() {
        let mut meta = AnalysisMetadata::default();
        meta.flag(AnalysisFlag::WeakTonality);
        meta.flag(AnalysisFlag::WeakTonality);
        assert_eq!(meta.flags, vec![AnalysisFlag::WeakTonality]);
        assert!(!meta.algorithm_version.is_empty());
    }
}
