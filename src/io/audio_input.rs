//! Decoded PCM buffers handed to the engine

use crate::error::AnalysisError;

/// Decoded multi-channel audio
///
/// Channels are stored planar: `channels[c][n]` is sample `n` of channel `c`.
#[derive(Debug, Clone)]
pub struct AudioInput {
    /// Per-channel samples, nominally in [-1.0, 1.0]
    pub channels: Vec<Vec<f32>>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioInput {
    /// Wrap planar channel buffers
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Wrap a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// De-interleave `[L0, R0, L1, R1, ...]` style buffers
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if channel_count == 0 {
            return Err(AnalysisError::InvalidInput(
                "Channel count must be > 0".to_string(),
            ));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Ok(Self::new(channels, sample_rate))
    }

    /// Number of sample frames per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Reject buffers the pipeline cannot interpret
    ///
    /// Empty buffers are valid (they produce a degraded result), but a zero sample
    /// rate, missing channels, ragged channel lengths or non-finite samples are not.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        if self.channels.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Audio has no channels".to_string(),
            ));
        }

        let frames = self.frames();
        for (i, channel) in self.channels.iter().enumerate() {
            if channel.len() != frames {
                return Err(AnalysisError::InvalidInput(format!(
                    "Channel {} has {} samples, expected {}",
                    i,
                    channel.len(),
                    frames
                )));
            }
            if let Some(pos) = channel.iter().position(|s| !s.is_finite()) {
                return Err(AnalysisError::InvalidInput(format!(
                    "Non-finite sample at channel {}, index {}",
                    i, pos
                )));
            }
        }

        Ok(())
    }
}
