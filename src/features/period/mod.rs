//! Period estimation modules
//!
//! Tempo from the autocorrelation of the short-time energy envelope.

pub mod tempo;

pub use tempo::{estimate_tempo, BpmEstimate, DEFAULT_BPM};
