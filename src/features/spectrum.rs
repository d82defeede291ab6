//! Windowed spectral analysis shared by chroma, bass and validator code
//!
//! A [`SpectrumAnalyzer`] owns everything that is expensive to rebuild for a given
//! frame size: the Hann window and the planned forward/inverse FFTs (including the
//! zero-padded transforms used for FFT-accelerated autocorrelation). Instances are
//! immutable after construction and can be shared across rayon workers.

use crate::features::chroma::normalization::l1_normalize;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Numerical stability epsilon
pub const EPSILON: f32 = 1e-10;

/// Lowest frequency mapped into chroma (Hz)
pub const CHROMA_MIN_HZ: f32 = 80.0;

/// Highest frequency mapped into chroma (Hz)
pub const CHROMA_MAX_HZ: f32 = 5000.0;

/// Pitch class of a frequency: `round(69 + 12 * log2(f / 440)) mod 12`
pub fn frequency_to_pitch_class(freq: f32) -> Option<u8> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let midi = (69.0 + 12.0 * (freq / 440.0).log2()).round() as i32;
    Some(midi.rem_euclid(12) as u8)
}

/// Frequency of a MIDI note number
pub fn midi_to_frequency(midi: f32) -> f32 {
    440.0 * 2f32.powf((midi - 69.0) / 12.0)
}

/// Hann window of the given length
pub fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / denom).cos())
        .collect()
}

/// One analyzed frame: its FFT and the energy of the windowed samples
#[derive(Debug, Clone)]
pub struct FrameSpectrum {
    /// Full complex spectrum (length = frame size)
    pub bins: Vec<Complex<f32>>,

    /// Sum of squared windowed samples
    pub energy: f32,
}

impl FrameSpectrum {
    /// Magnitudes of the non-negative frequency bins (`0..=N/2`)
    pub fn magnitudes(&self) -> Vec<f32> {
        let half = self.bins.len() / 2;
        self.bins[..=half].iter().map(|c| c.norm()).collect()
    }
}

/// Planned FFTs plus window for a fixed frame size and sample rate
pub struct SpectrumAnalyzer {
    frame_size: usize,
    sample_rate: u32,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    acf_size: usize,
    acf_forward: Arc<dyn Fft<f32>>,
    acf_inverse: Arc<dyn Fft<f32>>,
    /// Pitch class per FFT bin (None outside the chroma band)
    chroma_bins: Vec<Option<u8>>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("frame_size", &self.frame_size)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// Plan transforms for `frame_size` samples at `sample_rate`
    ///
    /// `frame_size` should be a power of two; other sizes work but plan slower transforms.
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let frame_size = frame_size.max(2);
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(frame_size);
        let inverse = planner.plan_fft_inverse(frame_size);

        // Zero-padded to >= 2N so the circular autocorrelation equals the linear one
        let acf_size = (2 * frame_size).next_power_of_two();
        let acf_forward = planner.plan_fft_forward(acf_size);
        let acf_inverse = planner.plan_fft_inverse(acf_size);

        let bin_hz = sample_rate as f32 / frame_size as f32;
        let chroma_bins = (0..=frame_size / 2)
            .map(|k| {
                let freq = k as f32 * bin_hz;
                if (CHROMA_MIN_HZ..=CHROMA_MAX_HZ).contains(&freq) {
                    frequency_to_pitch_class(freq)
                } else {
                    None
                }
            })
            .collect();

        Self {
            frame_size,
            sample_rate,
            window: hann_window(frame_size),
            forward,
            inverse,
            acf_size,
            acf_forward,
            acf_inverse,
            chroma_bins,
        }
    }

    /// Frame size in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency resolution in Hz per bin
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate as f32 / self.frame_size as f32
    }

    /// Window and transform one frame
    ///
    /// `frame` shorter than the frame size is zero-padded; longer input is truncated.
    pub fn analyze(&self, frame: &[f32]) -> FrameSpectrum {
        let mut bins = vec![Complex::new(0.0f32, 0.0); self.frame_size];
        let mut energy = 0.0f32;
        for ((bin, &sample), &w) in bins.iter_mut().zip(frame).zip(&self.window) {
            let x = sample * w;
            energy += x * x;
            *bin = Complex::new(x, 0.0);
        }
        self.forward.process(&mut bins);
        FrameSpectrum { bins, energy }
    }

    /// 12-bin pitch-class magnitude accumulation over [80, 5000] Hz, L1-normalized
    ///
    /// Returns all zeros for a spectrum without energy in the chroma band.
    pub fn chroma(&self, spectrum: &FrameSpectrum) -> [f32; 12] {
        self.chroma_from_magnitudes(&spectrum.magnitudes())
    }

    /// Chroma of a magnitude spectrum over bins `0..=N/2` (e.g. one averaged over frames)
    pub fn chroma_from_magnitudes(&self, magnitudes: &[f32]) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        for (mag, pc) in magnitudes.iter().zip(&self.chroma_bins) {
            if let Some(pc) = pc {
                chroma[*pc as usize] += mag;
            }
        }
        l1_normalize(&mut chroma);
        chroma
    }

    /// Magnitude at `freq` (nearest bin), 0.0 above Nyquist
    pub fn magnitude_at(&self, magnitudes: &[f32], freq: f32) -> f32 {
        let bin = (freq / self.bin_hz()).round() as usize;
        magnitudes.get(bin).copied().unwrap_or(0.0)
    }

    /// Time signal containing only the bins at or below `cutoff_hz`
    pub fn low_band_signal(&self, spectrum: &FrameSpectrum, cutoff_hz: f32) -> Vec<f32> {
        let n = self.frame_size;
        let max_bin = ((cutoff_hz / self.bin_hz()).floor() as usize).min(n / 2);
        let mut bins = vec![Complex::new(0.0f32, 0.0); n];
        for k in 0..=max_bin {
            bins[k] = spectrum.bins[k];
            if k > 0 && k < n - k {
                bins[n - k] = spectrum.bins[n - k];
            }
        }
        self.inverse.process(&mut bins);
        let scale = 1.0 / n as f32;
        bins.iter().map(|c| c.re * scale).collect()
    }

    /// Linear autocorrelation via `IFFT(|FFT(x)|^2)` with zero padding
    ///
    /// Signals longer than half the padded transform are truncated.
    pub fn autocorrelation(&self, signal: &[f32]) -> Vec<f32> {
        let n = signal.len().min(self.acf_size / 2);
        autocorrelate(
            &signal[..n],
            self.acf_size,
            self.acf_forward.as_ref(),
            self.acf_inverse.as_ref(),
        )
    }
}

/// Linear autocorrelation of a signal of any length
///
/// Plans transforms for this call; prefer [`SpectrumAnalyzer::autocorrelation`] when
/// many equally sized signals are processed.
pub fn autocorrelation(signal: &[f32]) -> Vec<f32> {
    let size = (2 * signal.len()).next_power_of_two().max(2);
    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);
    autocorrelate(signal, size, forward.as_ref(), inverse.as_ref())
}

/// `IFFT(|FFT(x)|^2)` over transforms of `size >= 2 * signal.len()`
fn autocorrelate(signal: &[f32], size: usize, forward: &dyn Fft<f32>, inverse: &dyn Fft<f32>) -> Vec<f32> {
    let mut buf: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buf.resize(size, Complex::new(0.0, 0.0));

    forward.process(&mut buf);
    for x in &mut buf {
        *x = *x * x.conj();
    }
    inverse.process(&mut buf);

    let scale = 1.0 / size as f32;
    buf[..signal.len()].iter().map(|x| x.re * scale).collect()
}
