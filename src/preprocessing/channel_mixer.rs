//! Channel mixing utilities (multi-channel to mono conversion)

use crate::io::AudioInput;

/// Downmix planar audio to mono by averaging channels
///
/// A single channel is passed through unchanged.
///
/// # Arguments
///
/// * `input` - Planar audio (channels are assumed validated to equal length)
///
/// # Returns
///
/// Mono samples at the input sample rate
pub fn downmix_to_mono(input: &AudioInput) -> Vec<f32> {
    log::debug!(
        "Downmixing {} channel(s), {} frames",
        input.channels.len(),
        input.frames()
    );

    match input.channels.len() {
        0 => Vec::new(),
        1 => input.channels[0].clone(),
        n => {
            let scale = 1.0 / n as f32;
            (0..input.frames())
                .map(|i| input.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                .collect()
        }
    }
}
