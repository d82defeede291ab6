//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Per-frame feature extraction (chroma, bass pitch class, energy)
//! - Normalization and similarity
//! - Averaging over frame ranges

pub mod extractor;
pub mod normalization;
pub mod smoothing;

pub use extractor::{EnergyPercentiles, FeatureExtractor, Frame, FrameFeatures};
