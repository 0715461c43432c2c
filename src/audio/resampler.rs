//! Sample rate conversion using rubato
//!
//! Converts decoder-native PCM to the pipeline's fixed 48kHz output rate.
//! One [`StreamResampler`] lives per player, with the conversion ratio
//! fixed at construction and internal filter state surviving across frames
//! until `reset()`.

use crate::audio::frame::AudioFrame;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Streaming resampler with a fixed input/output rate pair.
///
/// Expects fixed-duration input frames (20ms of audio at the input rate)
/// and produces 20ms frames at the output rate.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: u16,
}

impl StreamResampler {
    /// Create a resampler for 20ms frames from `input_rate` to `output_rate`.
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Result<Self> {
        // 20ms of input audio per call
        let chunk_size = (input_rate / 50) as usize;

        let inner = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // fixed ratio, no runtime changes
            PolynomialDegree::Septic,
            chunk_size,
            channels as usize,
        )
        .map_err(|e| Error::Resample(format!("Failed to create resampler: {}", e)))?;

        debug!(
            "Created resampler: {}Hz -> {}Hz, {} channels, chunk {} frames",
            input_rate, output_rate, channels, chunk_size
        );

        Ok(Self {
            inner,
            input_rate,
            output_rate,
            channels,
        })
    }

    /// Convert one frame to the output rate.
    ///
    /// The input must carry exactly one chunk of audio at the input rate;
    /// short frames are an error and the caller falls back to the
    /// unconverted frame.
    pub fn resample(&mut self, input: &AudioFrame) -> Result<AudioFrame> {
        if input.channels != self.channels {
            return Err(Error::Resample(format!(
                "Channel mismatch: frame has {}, resampler expects {}",
                input.channels, self.channels
            )));
        }

        let planar_input = deinterleave(&input.samples, self.channels);

        let planar_output = self
            .inner
            .process(&planar_input, None)
            .map_err(|e| Error::Resample(format!("Resampling failed: {}", e)))?;

        let samples = interleave(planar_output);

        Ok(AudioFrame {
            samples,
            sample_rate: self.output_rate,
            channels: self.channels,
        })
    }

    /// Clear internal filter state without changing the ratio.
    ///
    /// Called on seek so stale history does not bleed into the new position.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Convert interleaved samples to planar format.
///
/// Input:  [L, R, L, R, ...]
/// Output: [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let num_channels = channels as usize;
    let num_frames = samples.len() / num_channels;

    let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            planar[ch_idx].push(samples[frame_idx * num_channels + ch_idx]);
        }
    }

    planar
}

/// Convert planar samples back to interleaved format.
fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
    if planar.is_empty() {
        return Vec::new();
    }

    let num_channels = planar.len();
    let num_frames = planar[0].len();
    let mut interleaved = Vec::with_capacity(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for channel in planar.iter().take(num_channels) {
            interleaved.push(channel[frame_idx]);
        }
    }

    interleaved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 3 stereo frames
        let planar = deinterleave(&interleaved, 2);

        assert_eq!(planar.len(), 2);
        assert_eq!(planar[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(planar[1], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_interleave() {
        let planar = vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]];
        assert_eq!(interleave(planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_interleave_empty() {
        let planar: Vec<Vec<f32>> = vec![];
        assert_eq!(interleave(planar), Vec::<f32>::new());
    }

    #[test]
    fn test_resample_44100_to_48000() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();

        // One 20ms frame at 44.1kHz: 882 samples per channel
        let mut input = AudioFrame::new(882, 44100, 2);
        for (i, s) in input.samples.iter_mut().enumerate() {
            let t = (i / 2) as f32 / 44100.0;
            *s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
        }

        let output = resampler.resample(&input).unwrap();
        assert_eq!(output.sample_rate, 48000);
        assert_eq!(output.channels, 2);

        // Expect roughly 960 samples per channel (20ms at 48kHz)
        let out_frames = output.num_samples();
        assert!(
            (950..=970).contains(&out_frames),
            "Expected ~960 output frames, got {}",
            out_frames
        );
    }

    #[test]
    fn test_resample_channel_mismatch() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();
        let input = AudioFrame::new(882, 44100, 1);
        assert!(resampler.resample(&input).is_err());
    }

    #[test]
    fn test_reset_keeps_ratio() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();
        resampler.reset();
        assert_eq!(resampler.input_rate(), 44100);
        assert_eq!(resampler.output_rate(), 48000);

        let input = AudioFrame::new(882, 44100, 2);
        assert!(resampler.resample(&input).is_ok());
    }
}
