//! Per-frame feature extraction
//!
//! Splits mono audio into 4096-sample Hann-windowed frames with a 100 ms hop and
//! computes, for every frame:
//! - a 12-bin chroma vector (FFT magnitudes in [80, 5000] Hz folded to pitch classes)
//! - the bass pitch class (normalized autocorrelation of the <= 250 Hz band)
//! - the energy of the windowed frame
//!
//! Frames are independent, so extraction runs in parallel across rayon workers.
//! After extraction, bass values on frames below the 40th energy percentile are
//! discarded and isolated single-frame bass outliers are removed.

use crate::error::AnalysisError;
use crate::features::bass::{autocorrelation_pitch, gate_by_energy, remove_isolated_outliers, BASS_MAX_HZ};
use crate::features::spectrum::SpectrumAnalyzer;
use rayon::prelude::*;
use std::ops::Range;

/// Analysis frame size in samples
pub const FRAME_SIZE: usize = 4096;

/// One analyzed frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame index (frame starts at `index * hop_size`)
    pub index: usize,
    /// L1-normalized pitch-class energy
    pub chroma: [f32; 12],
    /// Detected bass pitch class, if any
    pub bass: Option<u8>,
    /// Sum of squared windowed samples
    pub energy: f32,
}

/// Energy percentiles used as adaptive thresholds downstream
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyPercentiles {
    /// 30th percentile (silence/noise suppression in emission scores)
    pub p30: f32,
    /// 40th percentile (bass gate: quieter frames carry no bass)
    pub p40: f32,
    /// 50th percentile (median; harmonic-weakness test in refinement)
    pub p50: f32,
    /// 70th percentile
    pub p70: f32,
    /// 80th percentile (bass-weighted key histogram)
    pub p80: f32,
}

impl EnergyPercentiles {
    /// Compute all thresholds from frame energies
    pub fn from_energies(energy: &[f32]) -> Self {
        let mut sorted = energy.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            p30: percentile_sorted(&sorted, 30.0),
            p40: percentile_sorted(&sorted, 40.0),
            p50: percentile_sorted(&sorted, 50.0),
            p70: percentile_sorted(&sorted, 70.0),
            p80: percentile_sorted(&sorted, 80.0),
        }
    }
}

/// Nearest-rank percentile of an ascending slice (0.0 when empty)
pub fn percentile_sorted(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f32).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Parallel per-frame feature arrays
///
/// All arrays have one entry per hop. Immutable once produced.
#[derive(Debug, Clone)]
pub struct FrameFeatures {
    /// Chroma vector per frame
    pub chroma: Vec<[f32; 12]>,
    /// Bass pitch class per frame
    pub bass: Vec<Option<u8>>,
    /// Energy per frame
    pub energy: Vec<f32>,
    /// Hop size in samples
    pub hop_size: usize,
    /// Sample rate of the analyzed audio in Hz
    pub sample_rate: u32,
    /// Energy percentiles over all frames
    pub percentiles: EnergyPercentiles,
}

impl FrameFeatures {
    /// Assemble features from per-frame results (ordered by index)
    pub fn from_frames(frames: Vec<Frame>, hop_size: usize, sample_rate: u32) -> Self {
        let mut chroma = Vec::with_capacity(frames.len());
        let mut bass = Vec::with_capacity(frames.len());
        let mut energy = Vec::with_capacity(frames.len());
        for frame in frames {
            chroma.push(frame.chroma);
            bass.push(frame.bass);
            energy.push(frame.energy);
        }
        let percentiles = EnergyPercentiles::from_energies(&energy);
        Self {
            chroma,
            bass,
            energy,
            hop_size,
            sample_rate,
            percentiles,
        }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.chroma.len()
    }

    /// `true` when no frames were produced
    pub fn is_empty(&self) -> bool {
        self.chroma.is_empty()
    }

    /// Hop duration in seconds
    pub fn hop_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.hop_size as f32 / self.sample_rate as f32
    }

    /// Start time of frame `index` in seconds
    pub fn frame_time(&self, index: usize) -> f32 {
        index as f32 * self.hop_seconds()
    }

    /// Frame `index` as a standalone value
    pub fn frame(&self, index: usize) -> Option<Frame> {
        Some(Frame {
            index,
            chroma: *self.chroma.get(index)?,
            bass: *self.bass.get(index)?,
            energy: *self.energy.get(index)?,
        })
    }

    /// Mean energy over `range` (clamped; 0.0 when empty)
    pub fn mean_energy(&self, range: Range<usize>) -> f32 {
        let end = range.end.min(self.energy.len());
        let start = range.start.min(end);
        if start == end {
            return 0.0;
        }
        self.energy[start..end].iter().sum::<f32>() / (end - start) as f32
    }

    /// Majority-vote bass pitch class over `range` (ties go to the lower pitch class)
    pub fn dominant_bass(&self, range: Range<usize>) -> Option<u8> {
        let end = range.end.min(self.bass.len());
        let start = range.start.min(end);
        let mut counts = [0usize; 12];
        for pc in self.bass[start..end].iter().flatten() {
            counts[*pc as usize % 12] += 1;
        }
        let (pc, &count) = counts
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, &c)| c)?;
        if count == 0 {
            None
        } else {
            Some(pc as u8)
        }
    }
}

/// Frame-level feature extractor
///
/// Owns the FFT plans and window for its frame size, so the expensive setup happens
/// once per extractor rather than once per frame.
#[derive(Debug)]
pub struct FeatureExtractor {
    analyzer: SpectrumAnalyzer,
    hop_size: usize,
}

impl FeatureExtractor {
    /// Extractor with the default 4096-sample frame and 100 ms hop
    pub fn new(sample_rate: u32) -> Self {
        Self::with_sizes(FRAME_SIZE, (sample_rate as usize / 10).max(1), sample_rate)
    }

    /// Extractor with explicit frame and hop sizes
    pub fn with_sizes(frame_size: usize, hop_size: usize, sample_rate: u32) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(frame_size, sample_rate),
            hop_size: hop_size.max(1),
        }
    }

    /// Underlying spectrum analyzer
    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of frames for `len` samples: one per hop, trailing frames zero-padded
    pub fn frame_count(&self, len: usize) -> usize {
        len.div_ceil(self.hop_size)
    }

    /// Analyze frame `index` of `samples` (raw bass, before sequence cleanup)
    pub fn analyze_frame(&self, samples: &[f32], index: usize) -> Frame {
        let start = (index * self.hop_size).min(samples.len());
        let end = (start + self.analyzer.frame_size()).min(samples.len());
        let spectrum = self.analyzer.analyze(&samples[start..end]);
        let chroma = self.analyzer.chroma(&spectrum);
        let bass = if spectrum.energy > 0.0 {
            let low = self.analyzer.low_band_signal(&spectrum, BASS_MAX_HZ);
            autocorrelation_pitch(&self.analyzer, &low).map(|p| p.pitch_class)
        } else {
            None
        };
        Frame {
            index,
            chroma,
            bass,
            energy: spectrum.energy,
        }
    }

    /// Extract chroma, bass and energy sequences from mono audio
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::NumericalError` if a frame produced non-finite values
    /// (only possible for non-finite input, which callers reject beforehand).
    pub fn extract(&self, samples: &[f32]) -> Result<FrameFeatures, AnalysisError> {
        let n_frames = self.frame_count(samples.len());
        log::debug!(
            "Extracting features: {} samples, frame={}, hop={}, {} frames",
            samples.len(),
            self.analyzer.frame_size(),
            self.hop_size,
            n_frames
        );

        let frames: Vec<Frame> = (0..n_frames)
            .into_par_iter()
            .map(|i| self.analyze_frame(samples, i))
            .collect();

        if let Some(bad) = frames
            .iter()
            .find(|f| !f.energy.is_finite() || f.chroma.iter().any(|c| !c.is_finite()))
        {
            return Err(AnalysisError::NumericalError(format!(
                "Non-finite features at frame {}",
                bad.index
            )));
        }

        let mut features = FrameFeatures::from_frames(frames, self.hop_size, self.analyzer.sample_rate());

        let threshold = features.percentiles.p40;
        gate_by_energy(&mut features.bass, &features.energy, threshold);
        features.bass = remove_isolated_outliers(&features.bass);

        log::debug!(
            "Features: {} frames, {} with bass, energy p30={:.4} p50={:.4} p80={:.4}",
            features.len(),
            features.bass.iter().filter(|b| b.is_some()).count(),
            features.percentiles.p30,
            features.percentiles.p50,
            features.percentiles.p80
        );

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 22050;

    fn chord(freqs: &[f32], seconds: f32) -> Vec<f32> {
        let len = (seconds * SR as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * 0.2
            })
            .collect()
    }

    #[test]
    fn test_percentile_sorted() {
        let v: Vec<f32> = (0..11).map(|i| i as f32).collect();
        assert_eq!(percentile_sorted(&v, 0.0), 0.0);
        assert_eq!(percentile_sorted(&v, 50.0), 5.0);
        assert_eq!(percentile_sorted(&v, 80.0), 8.0);
        assert_eq!(percentile_sorted(&v, 100.0), 10.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    #[test]
    fn test_frame_count_and_hop() {
        let extractor = FeatureExtractor::new(SR);
        assert_eq!(extractor.hop_size(), 2205);
        assert_eq!(extractor.frame_count(0), 0);
        assert_eq!(extractor.frame_count(2205), 1);
        assert_eq!(extractor.frame_count(2206), 2);
    }

    #[test]
    fn test_extract_c_major_chord() {
        // C2 bass + C4 E4 G4
        let samples = chord(&[65.41, 261.63, 329.63, 392.0], 3.0);
        let features = FeatureExtractor::new(SR).extract(&samples).unwrap();
        assert_eq!(features.len(), 30);
        assert_eq!(features.chroma.len(), features.bass.len());
        assert_eq!(features.energy.len(), features.len());

        let mid = features.chroma[10];
        let triad = mid[0] + mid[4] + mid[7];
        assert!(triad > 0.6, "C, E, G should dominate chroma: {:?}", mid);

        assert!(
            features.bass.iter().flatten().all(|&pc| pc == 0),
            "only C should be detected as bass: {:?}",
            features.bass
        );
        assert!(features.bass.iter().any(|b| b.is_some()));
    }

    #[test]
    fn test_silence_has_no_bass() {
        let features = FeatureExtractor::new(SR).extract(&vec![0.0; SR as usize]).unwrap();
        assert_eq!(features.len(), 10);
        assert!(features.bass.iter().all(|b| b.is_none()));
        assert!(features.chroma.iter().all(|c| c.iter().all(|v| *v == 0.0)));
        assert_eq!(features.percentiles.p80, 0.0);
    }

    #[test]
    fn test_empty_input() {
        let features = FeatureExtractor::new(SR).extract(&[]).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_dominant_bass_and_mean_energy() {
        let features = FrameFeatures::from_frames(
            (0..5)
                .map(|i| Frame {
                    index: i,
                    chroma: [0.0; 12],
                    bass: [Some(4), Some(0), Some(4), None, Some(0)][i],
                    energy: i as f32,
                })
                .collect(),
            2205,
            SR,
        );
        assert_eq!(features.dominant_bass(0..3), Some(4));
        // 2 vs 2: lower pitch class wins
        assert_eq!(features.dominant_bass(0..5), Some(0));
        assert_eq!(features.dominant_bass(3..4), None);
        assert!((features.mean_energy(1..3) - 1.5).abs() < 1e-6);
        assert!((features.frame_time(10) - 1.0).abs() < 1e-6);
    }
}
