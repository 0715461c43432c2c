//! Audio encoding
//!
//! The [`Encoder`] trait is the last pipeline stage; [`OpusEncoder`]
//! wraps libopus configured for low-latency voice/streaming transport.

use crate::audio::frame::AudioFrame;
use crate::config::{CHANNELS, FRAME_SIZE, MAX_PACKET_SIZE, SAMPLE_RATE};
use crate::error::{Error, Result};
use tracing::debug;

/// Expected network packet loss hinted to the encoder, in percent
const PACKET_LOSS_PERC: i32 = 5;

/// Encoder configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate: u32,
    pub vbr: bool,
    pub fec: bool,
    /// Samples per channel in one input frame
    pub frame_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            bitrate: 128_000,
            vbr: true,
            fec: true,
            frame_size: FRAME_SIZE,
        }
    }
}

/// Pipeline encode stage
pub trait Encoder: Send {
    /// Encode one PCM frame into a codec packet.
    ///
    /// The input frame must match the configured rate/channels/frame
    /// size; anything else is an encode failure, not a panic.
    fn encode_frame(&mut self, frame: &AudioFrame) -> Result<Vec<u8>>;
}

/// Opus encoder with transport-oriented settings (VBR, in-band FEC)
pub struct OpusEncoder {
    encoder: opus::Encoder,
    config: EncoderConfig,
}

impl OpusEncoder {
    pub fn new(config: EncoderConfig) -> Result<Self> {
        let channels = match config.channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            n => {
                return Err(Error::Encode(format!(
                    "Unsupported channel count: {}",
                    n
                )))
            }
        };

        let mut encoder =
            opus::Encoder::new(config.sample_rate, channels, opus::Application::Audio)
                .map_err(|e| Error::Encode(format!("Failed to create opus encoder: {}", e)))?;

        encoder
            .set_bitrate(opus::Bitrate::Bits(config.bitrate as i32))
            .map_err(|e| Error::Encode(format!("Failed to set bitrate: {}", e)))?;
        encoder
            .set_vbr(config.vbr)
            .map_err(|e| Error::Encode(format!("Failed to set VBR: {}", e)))?;
        encoder
            .set_inband_fec(config.fec)
            .map_err(|e| Error::Encode(format!("Failed to set FEC: {}", e)))?;
        encoder
            .set_packet_loss_perc(PACKET_LOSS_PERC)
            .map_err(|e| Error::Encode(format!("Failed to set loss percentage: {}", e)))?;

        debug!(
            "Created opus encoder: {}Hz, {} ch, {} bit/s, vbr={}, fec={}",
            config.sample_rate, config.channels, config.bitrate, config.vbr, config.fec
        );

        Ok(Self { encoder, config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}

impl Encoder for OpusEncoder {
    fn encode_frame(&mut self, frame: &AudioFrame) -> Result<Vec<u8>> {
        let mut output = vec![0u8; MAX_PACKET_SIZE];

        let bytes = self
            .encoder
            .encode_float(&frame.samples, &mut output)
            .map_err(|e| Error::Encode(format!("Opus encode failed: {}", e)))?;

        output.truncate(bytes);
        Ok(output)
    }
}
