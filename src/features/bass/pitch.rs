//! Low-frequency pitch estimators
//!
//! All estimators search the bass range [40, 250] Hz and report a frequency, the
//! corresponding pitch class and a confidence in [0, 1]. They return `None` rather
//! than guessing when the evidence is weak.

use crate::features::spectrum::{frequency_to_pitch_class, FrameSpectrum, SpectrumAnalyzer, EPSILON};

/// Lowest bass frequency searched (Hz)
pub const BASS_MIN_HZ: f32 = 40.0;

/// Highest bass frequency searched; also the low-pass cutoff (Hz)
pub const BASS_MAX_HZ: f32 = 250.0;

/// Minimum normalized autocorrelation peak accepted as a pitch
pub const BASS_MIN_CORRELATION: f32 = 0.3;

/// YIN absolute threshold on the cumulative-mean-normalized difference
const YIN_THRESHOLD: f32 = 0.15;

/// YIN fallback: accept the global minimum only below this value
const YIN_FALLBACK_THRESHOLD: f32 = 0.35;

/// A spectral peak must reach this fraction of the band maximum to count as "strong"
const SPECTRAL_PEAK_RELATIVE: f32 = 0.5;

/// Which estimator produced a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BassEstimator {
    /// Normalized autocorrelation peak
    Autocorrelation,
    /// YIN difference function
    Yin,
    /// Lowest strong FFT peak
    SpectralPeak,
}

/// A single pitch estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental in Hz
    pub frequency: f32,
    /// Pitch class (0 = C, ..., 11 = B)
    pub pitch_class: u8,
    /// Confidence (0.0-1.0)
    pub confidence: f32,
    /// Producing estimator
    pub estimator: BassEstimator,
}

impl PitchEstimate {
    fn new(frequency: f32, confidence: f32, estimator: BassEstimator) -> Option<Self> {
        if !(BASS_MIN_HZ * 0.95..=BASS_MAX_HZ * 1.05).contains(&frequency) {
            return None;
        }
        let pitch_class = frequency_to_pitch_class(frequency)?;
        Some(Self {
            frequency,
            pitch_class,
            confidence: confidence.clamp(0.0, 1.0),
            estimator,
        })
    }
}

/// Sub-sample offset of a peak/valley from three neighbouring values
fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() <= EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}

/// Strongest normalized autocorrelation peak of a low-passed signal
///
/// # Arguments
///
/// * `analyzer` - Supplies the zero-padded FFT autocorrelation
/// * `low_band` - Low-passed time signal at the analyzer's sample rate
///
/// # Returns
///
/// `None` for silent input or when the best peak is below [`BASS_MIN_CORRELATION`]
pub fn autocorrelation_pitch(analyzer: &SpectrumAnalyzer, low_band: &[f32]) -> Option<PitchEstimate> {
    let sample_rate = analyzer.sample_rate() as f32;
    let acf = analyzer.autocorrelation(low_band);
    if acf.len() < 3 || acf[0] <= EPSILON {
        return None;
    }

    let lag_min = ((sample_rate / BASS_MAX_HZ).floor() as usize).max(1);
    let lag_max = ((sample_rate / BASS_MIN_HZ).ceil() as usize).min(acf.len() - 2);
    if lag_min >= lag_max {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in lag_min..=lag_max {
        let value = acf[lag];
        if value > acf[lag - 1] && value >= acf[lag + 1] {
            let normalized = value / acf[0];
            if best.map_or(true, |(_, b)| normalized > b) {
                best = Some((lag, normalized));
            }
        }
    }

    let (lag, strength) = best?;
    if strength < BASS_MIN_CORRELATION {
        return None;
    }

    let offset = parabolic_offset(acf[lag - 1], acf[lag], acf[lag + 1]);
    let period = lag as f32 + offset;
    PitchEstimate::new(sample_rate / period, strength, BassEstimator::Autocorrelation)
}

/// YIN pitch estimate of a low-passed signal
///
/// The signal is decimated by 2 first; it carries nothing above the bass cutoff.
pub fn yin_pitch(low_band: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
    let x: Vec<f32> = low_band.iter().step_by(2).copied().collect();
    let rate = sample_rate as f32 / 2.0;

    let tau_min = ((rate / BASS_MAX_HZ).floor() as usize).max(2);
    let tau_max = (rate / BASS_MIN_HZ).ceil() as usize;
    if x.len() < 2 * tau_max + 2 {
        return None;
    }
    let window = x.len() - tau_max - 1;

    let energy: f32 = x[..window].iter().map(|v| v * v).sum();
    if energy <= EPSILON {
        return None;
    }

    // Difference function and its cumulative-mean normalization
    let mut cmnd = vec![1.0f32; tau_max + 2];
    let mut running = 0.0f32;
    for tau in 1..=tau_max + 1 {
        let d: f32 = (0..window)
            .map(|j| {
                let diff = x[j] - x[j + tau];
                diff * diff
            })
            .sum();
        running += d;
        cmnd[tau] = if running > EPSILON {
            d * tau as f32 / running
        } else {
            1.0
        };
    }

    let mut chosen = None;
    let mut tau = tau_min;
    while tau <= tau_max {
        if cmnd[tau] < YIN_THRESHOLD {
            while tau < tau_max && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            chosen = Some(tau);
            break;
        }
        tau += 1;
    }

    let tau = match chosen {
        Some(t) => t,
        None => {
            let (t, v) = (tau_min..=tau_max)
                .map(|t| (t, cmnd[t]))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
            if v >= YIN_FALLBACK_THRESHOLD {
                return None;
            }
            t
        }
    };

    let offset = parabolic_offset(cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let confidence = 1.0 - cmnd[tau];
    PitchEstimate::new(rate / (tau as f32 + offset), confidence, BassEstimator::Yin)
}

/// Lowest spectral peak in the bass band reaching half the band maximum
///
/// Confidence is the share of band power concentrated around the chosen peak.
pub fn spectral_peak_pitch(analyzer: &SpectrumAnalyzer, spectrum: &FrameSpectrum) -> Option<PitchEstimate> {
    let mags = spectrum.magnitudes();
    let bin_hz = analyzer.bin_hz();
    let lo = ((BASS_MIN_HZ / bin_hz).ceil() as usize).max(1);
    let hi = ((BASS_MAX_HZ / bin_hz).floor() as usize).min(mags.len().saturating_sub(2));
    if lo >= hi {
        return None;
    }

    let band = &mags[lo..=hi];
    let max_mag = band.iter().copied().fold(0.0f32, f32::max);
    let band_power: f32 = band.iter().map(|m| m * m).sum();
    if max_mag <= EPSILON || band_power <= EPSILON {
        return None;
    }

    let peak = (lo..=hi).find(|&k| {
        mags[k] >= SPECTRAL_PEAK_RELATIVE * max_mag && mags[k] >= mags[k - 1] && mags[k] >= mags[k + 1]
    })?;

    let peak_power: f32 = mags[peak - 1..=peak + 1].iter().map(|m| m * m).sum();
    let offset = parabolic_offset(mags[peak - 1], mags[peak], mags[peak + 1]);
    let frequency = (peak as f32 + offset) * bin_hz;
    PitchEstimate::new(
        frequency,
        (peak_power / band_power).min(1.0),
        BassEstimator::SpectralPeak,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 22050;

    fn tone(freqs: &[(f32, f32)], len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                freqs.iter().map(|(f, a)| a * (2.0 * PI * f * t).sin()).sum()
            })
            .collect()
    }

    fn low_band(analyzer: &SpectrumAnalyzer, samples: &[f32]) -> (FrameSpectrum, Vec<f32>) {
        let spectrum = analyzer.analyze(samples);
        let low = analyzer.low_band_signal(&spectrum, BASS_MAX_HZ);
        (spectrum, low)
    }

    #[test]
    fn test_autocorrelation_finds_a2() {
        let analyzer = SpectrumAnalyzer::new(4096, SR);
        let (_, low) = low_band(&analyzer, &tone(&[(110.0, 0.8), (440.0, 0.3)], 4096));
        let est = autocorrelation_pitch(&analyzer, &low).expect("should detect bass");
        assert_eq!(est.pitch_class, 9, "110 Hz is A, got {:?}", est);
        assert!((est.frequency - 110.0).abs() < 3.0);
    }

    #[test]
    fn test_autocorrelation_silence() {
        let analyzer = SpectrumAnalyzer::new(4096, SR);
        let (_, low) = low_band(&analyzer, &vec![0.0; 4096]);
        assert!(autocorrelation_pitch(&analyzer, &low).is_none());
    }

    #[test]
    fn test_yin_finds_c2() {
        let analyzer = SpectrumAnalyzer::new(4096, SR);
        let (_, low) = low_band(&analyzer, &tone(&[(65.41, 0.8)], 4096));
        let est = yin_pitch(&low, SR).expect("should detect bass");
        assert_eq!(est.pitch_class, 0, "65.41 Hz is C, got {:?}", est);
        assert_eq!(est.estimator, BassEstimator::Yin);
    }

    #[test]
    fn test_spectral_peak_finds_g2() {
        let analyzer = SpectrumAnalyzer::new(4096, SR);
        let spectrum = analyzer.analyze(&tone(&[(98.0, 0.8), (196.0, 0.3)], 4096));
        let est = spectral_peak_pitch(&analyzer, &spectrum).expect("should detect bass");
        assert_eq!(est.pitch_class, 7, "98 Hz is G, got {:?}", est);
        assert!(est.confidence > 0.3);
    }

    #[test]
    fn test_parabolic_offset_symmetric() {
        assert_eq!(parabolic_offset(1.0, 2.0, 1.0), 0.0);
        assert!(parabolic_offset(1.5, 2.0, 1.0) < 0.0);
    }
}
