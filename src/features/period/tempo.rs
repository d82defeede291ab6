//! Energy-autocorrelation tempo estimation
//!
//! # Algorithm
//!
//! 1. Short-time energy in 4096-sample windows with a 100 ms hop
//! 2. Remove the mean and autocorrelate the energy sequence (FFT accelerated:
//!    `ACF = IFFT(|FFT(signal)|²)`)
//! 3. Search lags corresponding to 30-200 BPM for the autocorrelation maximum
//! 4. Convert the winning lag to BPM and clamp to [60, 200]
//!
//! Silent, constant or too-short input yields the 120 BPM default instead of an error.

use crate::features::spectrum::autocorrelation;

/// Tempo reported when no periodicity can be measured
pub const DEFAULT_BPM: f32 = 120.0;

/// Energy window in samples
const TEMPO_WINDOW: usize = 4096;

/// Lag search range in BPM
const SEARCH_MIN_BPM: f32 = 30.0;
const SEARCH_MAX_BPM: f32 = 200.0;

/// Reported tempo range in BPM
const CLAMP_MIN_BPM: f32 = 60.0;
const CLAMP_MAX_BPM: f32 = 200.0;

const EPSILON: f32 = 1e-10;

/// Final BPM estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmEstimate {
    /// BPM estimate (60-200)
    pub bpm: f32,

    /// Normalized autocorrelation at the winning lag (0.0-1.0); 0.0 for the default
    pub confidence: f32,
}

impl BpmEstimate {
    fn fallback() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            confidence: 0.0,
        }
    }

    /// Beat period in seconds
    pub fn seconds_per_beat(&self) -> f32 {
        60.0 / self.bpm
    }
}

/// Estimate tempo from mono audio
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
///
/// BPM in [60, 200]; [`DEFAULT_BPM`] with zero confidence when the energy envelope
/// has no measurable periodicity
pub fn estimate_tempo(samples: &[f32], sample_rate: u32) -> BpmEstimate {
    let hop = (sample_rate as usize / 10).max(1);
    if sample_rate == 0 || samples.len() < TEMPO_WINDOW {
        log::debug!("Too little audio for tempo estimation, using {} BPM", DEFAULT_BPM);
        return BpmEstimate::fallback();
    }

    let hop_seconds = hop as f32 / sample_rate as f32;
    let n_windows = (samples.len() - TEMPO_WINDOW) / hop + 1;
    let mut envelope: Vec<f32> = (0..n_windows)
        .map(|i| {
            let start = i * hop;
            samples[start..start + TEMPO_WINDOW].iter().map(|&x| x * x).sum()
        })
        .collect();

    let lag_min = (60.0 / (SEARCH_MAX_BPM * hop_seconds)).ceil().max(1.0) as usize;
    let lag_max = (60.0 / (SEARCH_MIN_BPM * hop_seconds)).floor() as usize;
    if envelope.len() <= lag_max + 1 || lag_min >= lag_max {
        log::debug!(
            "Energy envelope too short ({} windows) for lags {}..={}, using {} BPM",
            envelope.len(),
            lag_min,
            lag_max,
            DEFAULT_BPM
        );
        return BpmEstimate::fallback();
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    for e in envelope.iter_mut() {
        *e -= mean;
    }

    let acf = autocorrelation(&envelope);
    if acf[0] <= EPSILON {
        log::debug!("Flat energy envelope, using {} BPM", DEFAULT_BPM);
        return BpmEstimate::fallback();
    }

    // First maximum wins ties, i.e. the shorter lag / faster tempo
    let mut best_lag = lag_min;
    for lag in lag_min..=lag_max {
        if acf[lag] > acf[best_lag] {
            best_lag = lag;
        }
    }

    let raw_bpm = 60.0 / (best_lag as f32 * hop_seconds);
    let bpm = raw_bpm.clamp(CLAMP_MIN_BPM, CLAMP_MAX_BPM);
    let confidence = (acf[best_lag] / acf[0]).clamp(0.0, 1.0);

    log::debug!(
        "Tempo: lag={} ({:.1} BPM raw) -> {:.1} BPM, confidence={:.3}",
        best_lag,
        raw_bpm,
        bpm,
        confidence
    );

    BpmEstimate { bpm, confidence }
}
