//! Audio input types
//!
//! The engine consumes already-decoded PCM; decoding lives with the caller.

pub mod audio_input;

pub use audio_input::AudioInput;
