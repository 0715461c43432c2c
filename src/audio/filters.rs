//! DSP filter chain
//!
//! An ordered list of in-place filters applied to every produced frame:
//! Volume -> Equalizer -> Timescale -> Tremolo -> Vibrato. The chain is
//! rebuilt wholesale on every `set_config`; a filter is only included
//! when its configuration differs from the no-op default.
//!
//! `reset()` clears delay registers and LFO phase without touching
//! configuration, for use after a seek.

use crate::audio::frame::AudioFrame;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// One peaking-EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    /// Center frequency in Hz
    pub frequency: f32,

    /// Gain in dB (positive boosts, negative cuts)
    pub gain: f32,

    /// Bandwidth in octaves
    pub bandwidth: f32,
}

/// Complete filter configuration for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub volume: f32,

    pub equalizer: Vec<EqualizerBand>,

    pub speed: f32,
    pub pitch: f32,
    /// Accepted for API compatibility; not yet applied independently
    /// of pitch (see TimescaleFilter).
    pub rate: f32,

    pub tremolo_enabled: bool,
    pub tremolo_frequency: f32,
    pub tremolo_depth: f32,

    pub vibrato_enabled: bool,
    pub vibrato_frequency: f32,
    pub vibrato_depth: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            equalizer: Vec::new(),
            speed: 1.0,
            pitch: 1.0,
            rate: 1.0,
            tremolo_enabled: false,
            tremolo_frequency: 2.0,
            tremolo_depth: 0.5,
            vibrato_enabled: false,
            vibrato_frequency: 2.0,
            vibrato_depth: 0.5,
        }
    }
}

/// In-place audio filter
pub trait Filter: Send {
    fn process(&mut self, frame: &mut AudioFrame);

    /// Clear internal state (delay registers, LFO phase) without
    /// changing configuration
    fn reset(&mut self);
}

/// Scales every sample by a scalar clamped to [0, 2]
pub struct VolumeFilter {
    volume: f32,
}

impl VolumeFilter {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 2.0),
        }
    }
}

impl Filter for VolumeFilter {
    fn process(&mut self, frame: &mut AudioFrame) {
        frame.apply_volume(self.volume);
    }

    fn reset(&mut self) {}
}

/// Second-order peaking filter section with two delay registers
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Standard peaking-EQ design: digital angular frequency from the
    /// sample rate, Q from bandwidth, gain linearized as 10^(dB/40),
    /// all coefficients normalized by a0.
    fn peaking(frequency: f32, gain_db: f32, bandwidth: f32, sample_rate: u32) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate as f32;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn * (2.0_f32.ln() / 2.0 * bandwidth * omega / sn).sinh();
        let a = 10.0_f32.powf(gain_db / 40.0);

        let a0 = 1.0 + alpha / a;

        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cs) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cs) / a0,
            a2: (1.0 - alpha / a) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Transposed direct form II
    fn process_sample(&mut self, sample: f32) -> f32 {
        let out = self.b0 * sample + self.z1;
        self.z1 = self.b1 * sample - self.a1 * out + self.z2;
        self.z2 = self.b2 * sample - self.a2 * out;
        out
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Multi-band peaking equalizer; bands are applied in series per sample
pub struct EqualizerFilter {
    bands: Vec<Biquad>,
}

impl EqualizerFilter {
    pub fn new(bands: &[EqualizerBand], sample_rate: u32) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|b| Biquad::peaking(b.frequency, b.gain, b.bandwidth, sample_rate))
                .collect(),
        }
    }
}

impl Filter for EqualizerFilter {
    fn process(&mut self, frame: &mut AudioFrame) {
        for sample in &mut frame.samples {
            let mut s = *sample;
            for band in &mut self.bands {
                s = band.process_sample(s);
            }
            *sample = s;
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }
}

/// Pitch shift via fractional-index linear interpolation resampling.
///
/// Known limitation: only `pitch` is applied; `speed` and `rate` are
/// stored but have no independent effect yet.
pub struct TimescaleFilter {
    #[allow(dead_code)]
    speed: f32,
    pitch: f32,
    #[allow(dead_code)]
    rate: f32,
}

impl TimescaleFilter {
    pub fn new(speed: f32, pitch: f32, rate: f32) -> Self {
        Self { speed, pitch, rate }
    }
}

impl Filter for TimescaleFilter {
    fn process(&mut self, frame: &mut AudioFrame) {
        if self.pitch == 1.0 {
            return;
        }

        let input = &frame.samples;
        let new_len = (input.len() as f32 / self.pitch) as usize;
        let mut resampled = vec![0.0f32; new_len];

        for (i, out) in resampled.iter_mut().enumerate() {
            let pos = i as f32 * self.pitch;
            let idx = pos as usize;

            if idx + 1 < input.len() {
                let frac = pos - idx as f32;
                *out = input[idx] * (1.0 - frac) + input[idx + 1] * frac;
            }
        }

        frame.samples = resampled;
    }

    fn reset(&mut self) {}
}

/// Amplitude modulation by a cosine LFO.
///
/// Each sample is scaled by `1 - depth * (1 - cos(phase)) / 2`, with the
/// phase advancing continuously across frames until `reset()`.
pub struct TremoloFilter {
    frequency: f32,
    depth: f32,
    sample_rate: u32,
    sample_index: u64,
}

impl TremoloFilter {
    pub fn new(frequency: f32, depth: f32, sample_rate: u32) -> Self {
        Self {
            frequency,
            depth,
            sample_rate,
            sample_index: 0,
        }
    }
}

impl Filter for TremoloFilter {
    fn process(&mut self, frame: &mut AudioFrame) {
        for sample in &mut frame.samples {
            let phase =
                2.0 * PI * self.frequency * self.sample_index as f32 / self.sample_rate as f32;
            let modulator = 1.0 - self.depth * (1.0 - phase.cos()) / 2.0;
            *sample *= modulator;
            self.sample_index += 1;
        }
    }

    fn reset(&mut self) {
        self.sample_index = 0;
    }
}

/// Pitch wobble via a sinusoidally-modulated read offset into a 20ms
/// delay line. Modulation depth scales the maximum delay excursion.
pub struct VibratoFilter {
    frequency: f32,
    depth: f32,
    sample_rate: u32,
    delay_line: Vec<f32>,
    write_pos: usize,
    sample_index: u64,
}

impl VibratoFilter {
    pub fn new(frequency: f32, depth: f32, sample_rate: u32) -> Self {
        // 20ms delay line
        let delay_len = (sample_rate as f32 * 0.02) as usize;
        Self {
            frequency,
            depth,
            sample_rate,
            delay_line: vec![0.0; delay_len],
            write_pos: 0,
            sample_index: 0,
        }
    }
}

impl Filter for VibratoFilter {
    fn process(&mut self, frame: &mut AudioFrame) {
        let len = self.delay_line.len();
        if len == 0 {
            return;
        }

        for sample in &mut frame.samples {
            let phase =
                2.0 * PI * self.frequency * self.sample_index as f32 / self.sample_rate as f32;
            let delay_samples = self.depth * len as f32 * 0.5 * (1.0 + phase.sin());

            self.delay_line[self.write_pos] = *sample;

            let mut read_pos = self.write_pos as f32 - delay_samples;
            if read_pos < 0.0 {
                read_pos += len as f32;
            }

            *sample = self.delay_line[read_pos as usize % len];

            self.write_pos = (self.write_pos + 1) % len;
            self.sample_index += 1;
        }
    }

    fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.write_pos = 0;
        self.sample_index = 0;
    }
}

/// Ordered filter chain, rebuilt wholesale on every configuration change
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the chain from `config`.
    ///
    /// Build order is fixed and significant: Volume -> Equalizer ->
    /// Timescale -> Tremolo -> Vibrato. Filters whose configuration
    /// equals the no-op default are skipped entirely.
    pub fn set_config(&mut self, config: &FilterConfig, sample_rate: u32) {
        self.filters.clear();

        if config.volume != 1.0 {
            self.filters.push(Box::new(VolumeFilter::new(config.volume)));
        }

        if !config.equalizer.is_empty() {
            self.filters
                .push(Box::new(EqualizerFilter::new(&config.equalizer, sample_rate)));
        }

        // A non-positive pitch cannot drive the resampling ratio;
        // treat it as unset
        let pitch = if config.pitch > 0.0 { config.pitch } else { 1.0 };
        if config.speed != 1.0 || pitch != 1.0 {
            self.filters.push(Box::new(TimescaleFilter::new(
                config.speed,
                pitch,
                config.rate,
            )));
        }

        if config.tremolo_enabled {
            self.filters.push(Box::new(TremoloFilter::new(
                config.tremolo_frequency,
                config.tremolo_depth,
                sample_rate,
            )));
        }

        if config.vibrato_enabled {
            self.filters.push(Box::new(VibratoFilter::new(
                config.vibrato_frequency,
                config.vibrato_depth,
                sample_rate,
            )));
        }
    }

    /// Apply every included filter in order, in place
    pub fn process(&mut self, frame: &mut AudioFrame) {
        for filter in &mut self.filters {
            filter.process(frame);
        }
    }

    /// Clear all internal filter state without changing configuration
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    /// Number of active filters (diagnostics and tests)
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
