//! Bass pitch-class estimation
//!
//! Low-frequency pitch estimators shared by the per-frame feature extractor and
//! the segment-level bass validator:
//! - Normalized autocorrelation of the low-passed frame (primary)
//! - YIN cumulative-mean-normalized difference
//! - Lowest strong spectral peak
//!
//! plus the energy gate and isolated-outlier cleanup applied to frame sequences.

pub mod cleanup;
pub mod pitch;

pub use cleanup::{gate_by_energy, remove_isolated_outliers};
pub use pitch::{
    autocorrelation_pitch, spectral_peak_pitch, yin_pitch, BassEstimator, PitchEstimate,
    BASS_MAX_HZ, BASS_MIN_HZ,
};
