//! Silence detection

/// Silence detection configuration
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// RMS threshold in dBFS below which audio counts as silent (default: -60.0)
    pub threshold_db: f32,

    /// Minimum number of samples required for analysis (default: 4096, one analysis frame)
    pub min_samples: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            min_samples: 4096,
        }
    }
}

impl SilenceDetector {
    /// RMS level of the buffer in dBFS (`-inf` for empty or all-zero input)
    pub fn rms_db(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return f32::NEG_INFINITY;
        }
        let mean_sq = samples.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>()
            / samples.len() as f64;
        if mean_sq <= 0.0 {
            return f32::NEG_INFINITY;
        }
        (10.0 * mean_sq.log10()) as f32
    }

    /// `true` when the buffer is too short or too quiet to analyze
    pub fn is_silent(&self, samples: &[f32]) -> bool {
        if samples.len() < self.min_samples {
            log::debug!(
                "Audio too short for analysis: {} < {} samples",
                samples.len(),
                self.min_samples
            );
            return true;
        }
        let level = Self::rms_db(samples);
        log::debug!("Audio RMS level: {:.1} dBFS", level);
        level < self.threshold_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_buffer() {
        let detector = SilenceDetector::default();
        assert!(detector.is_silent(&vec![0.0; 22050]));
        assert!(detector.is_silent(&[]));
    }

    #[test]
    fn test_short_buffer_counts_as_silent() {
        let detector = SilenceDetector::default();
        assert!(detector.is_silent(&vec![0.5; 100]));
    }

    #[test]
    fn test_tone_is_not_silent() {
        let detector = SilenceDetector::default();
        let tone: Vec<f32> = (0..22050)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 22050.0).sin() * 0.3)
            .collect();
        assert!(!detector.is_silent(&tone));
        assert!((SilenceDetector::rms_db(&tone) - 20.0 * (0.3f32 / 2f32.sqrt()).log10()).abs() < 0.1);
    }
}
