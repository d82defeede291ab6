//! Sample rate conversion
//!
//! Linear interpolation to the fixed analysis rate. 22050 Hz keeps content up to
//! ~10 kHz, far above the harmonics that matter for chord recognition, while
//! bounding FFT cost.

/// Analysis sample rate in Hz
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Resample mono audio by linear interpolation
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `from_rate` - Input sample rate in Hz (must be > 0)
/// * `to_rate` - Output sample rate in Hz (must be > 0)
///
/// # Returns
///
/// Resampled audio with `round(len * to_rate / from_rate)` samples
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let last = samples.len() - 1;

    log::debug!(
        "Resampling {} samples {} Hz -> {} Hz ({} samples)",
        samples.len(),
        from_rate,
        to_rate,
        out_len
    );

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            if idx >= last {
                return samples[last];
            }
            let frac = (pos - idx as f64) as f32;
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        })
        .collect()
}
