//! Core audio frame type
//!
//! One fixed-duration block of interleaved f32 PCM, mutated in place by
//! every pipeline stage. A frame is exclusively owned by the worker
//! executing one pipeline step at a time and handed off by move.
//!
//! **Invariant:** `samples.len()` is always an exact multiple of `channels`.

/// Interleaved floating-point PCM with format metadata.
///
/// Samples are laid out `[L, R, L, R, ...]` for stereo.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// PCM samples, interleaved, `num_samples * channels` long
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count
    pub channels: u16,
}

impl AudioFrame {
    /// Create a zeroed frame of `num_samples` per channel
    pub fn new(num_samples: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: vec![0.0; num_samples * channels as usize],
            sample_rate,
            channels,
        }
    }

    /// Resize to `num_samples` per channel, zero-filling new space
    pub fn resize(&mut self, num_samples: usize) {
        self.samples.resize(num_samples * self.channels as usize, 0.0);
    }

    /// Overwrite all samples with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }

    /// Number of samples per channel
    pub fn num_samples(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Scale every sample by `volume`
    pub fn apply_volume(&mut self, volume: f32) {
        for s in &mut self.samples {
            *s *= volume;
        }
    }
}
