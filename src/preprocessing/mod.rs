//! Audio front end
//!
//! Utilities for preparing decoded audio for analysis:
//! - Channel mixing (multi-channel to mono)
//! - Linear resampling to the analysis rate
//! - Silence detection

pub mod channel_mixer;
pub mod resample;
pub mod silence;
