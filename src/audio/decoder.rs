//! Audio decoding
//!
//! The [`Decoder`] trait is the pipeline's view of a codec; [`OpusDecoder`]
//! is the concrete implementation, pulling packets from a [`PacketSource`]
//! and decoding them with libopus. Packet-loss concealment is handled here:
//! a failed decode is retried once with an empty payload so libopus can
//! synthesize a plausible frame before the player falls back to silence.

use crate::audio::frame::AudioFrame;
use crate::config::{CHANNELS, FRAME_SIZE, SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::source::PacketSource;
use tracing::{debug, trace};

/// Pipeline decode stage
pub trait Decoder: Send {
    /// Decode one fixed-duration frame of PCM into `frame`.
    ///
    /// `frame` is resized to the decoder's native frame length. Errors
    /// mean no usable audio was produced, even after concealment.
    fn decode_frame(&mut self, frame: &mut AudioFrame) -> Result<()>;

    /// Seek the underlying source and reset internal codec state
    fn seek(&mut self, timestamp_ms: u64) -> Result<()>;

    /// Native sample rate of decoded PCM
    fn sample_rate(&self) -> u32;

    /// Native channel count of decoded PCM
    fn channels(&self) -> u16;

    /// Stream duration in milliseconds (0 if unknown)
    fn duration_ms(&self) -> u64;
}

/// Opus decoder over a packetized source
pub struct OpusDecoder {
    decoder: opus::Decoder,
    source: Box<dyn PacketSource>,
    duration_ms: u64,
    current_timestamp_ms: u64,
}

impl OpusDecoder {
    /// Open a decoder against an already-opened packet source.
    ///
    /// Opus always decodes at 48kHz stereo here, matching the pipeline's
    /// fixed output format.
    pub fn open(source: Box<dyn PacketSource>) -> Result<Self> {
        let decoder = opus::Decoder::new(SAMPLE_RATE, opus::Channels::Stereo)
            .map_err(|e| Error::Decode(format!("Failed to create opus decoder: {}", e)))?;

        let duration_ms = source.duration_ms();
        debug!("Opened opus decoder, stream duration {}ms", duration_ms);

        Ok(Self {
            decoder,
            source,
            duration_ms,
            current_timestamp_ms: 0,
        })
    }

    /// Timestamp of the most recently decoded packet
    pub fn position_ms(&self) -> u64 {
        self.current_timestamp_ms
    }
}

impl Decoder for OpusDecoder {
    fn decode_frame(&mut self, frame: &mut AudioFrame) -> Result<()> {
        let packet = self
            .source
            .read_packet()
            .ok_or_else(|| Error::Decode("End of stream".to_string()))?;

        frame.sample_rate = SAMPLE_RATE;
        frame.channels = CHANNELS;
        frame.resize(FRAME_SIZE);

        match self.decoder.decode_float(&packet.data, &mut frame.samples, false) {
            Ok(samples) => {
                frame.resize(samples);
            }
            Err(e) => {
                // Concealment: ask libopus to synthesize the missing frame
                trace!("Packet decode failed ({}), attempting concealment", e);
                let samples = self
                    .decoder
                    .decode_float(&[], &mut frame.samples, false)
                    .map_err(|e| Error::Decode(format!("Opus decode failed: {}", e)))?;
                frame.resize(samples);
            }
        }

        self.current_timestamp_ms = packet.timestamp_ms;
        Ok(())
    }

    fn seek(&mut self, timestamp_ms: u64) -> Result<()> {
        if !self.source.seek(timestamp_ms) {
            return Err(Error::Decode(format!(
                "Source seek to {}ms failed",
                timestamp_ms
            )));
        }

        self.current_timestamp_ms = timestamp_ms;
        // Codec delay registers are stale after a jump
        self.decoder
            .reset_state()
            .map_err(|e| Error::Decode(format!("Opus state reset failed: {}", e)))?;

        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl Drop for OpusDecoder {
    fn drop(&mut self) {
        self.source.close();
    }
}
