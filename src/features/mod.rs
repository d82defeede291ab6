//! Feature extraction modules
//!
//! This module contains the per-frame analysis feeding the chord tracker:
//! - Shared windowed spectrum analysis
//! - Chroma extraction and frame energy
//! - Bass pitch estimation
//! - Period estimation (BPM detection)
//! - Beat grid generation
//! - Key detection

pub mod bass;
pub mod beat_tracking;
pub mod chroma;
pub mod key;
pub mod period;
pub mod spectrum;
