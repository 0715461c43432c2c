//! Engine configuration and fixed pipeline constants
//!
//! Every player pipeline produces 20ms frames of 48kHz stereo PCM,
//! encoded to Opus. These values are fixed by the transport framing,
//! not tunable per player.

/// Output sample rate for every pipeline (Hz)
pub const SAMPLE_RATE: u32 = 48_000;

/// Output channel count (stereo)
pub const CHANNELS: u16 = 2;

/// Samples per channel in one frame (20ms at 48kHz)
pub const FRAME_SIZE: usize = 960;

/// Frame duration in milliseconds
pub const FRAME_DURATION_MS: u64 = 20;

/// Maximum encoded packet size in bytes.
///
/// Callers of `read_frame` must supply a buffer at least this large
/// or risk silent truncation of the payload.
pub const MAX_PACKET_SIZE: usize = 4000;

/// Output ring buffer capacity in packets (1 second at 20ms/frame)
pub const RING_CAPACITY: usize = 50;

use serde::{Deserialize, Serialize};

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of worker threads in the pool
    pub worker_threads: usize,

    /// Per-player output buffer capacity in encoded packets
    pub ring_capacity: usize,

    /// Encoder target bitrate in bits per second
    pub bitrate: u32,

    /// Variable bitrate encoding
    pub vbr: bool,

    /// In-band forward error correction
    pub fec: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            ring_capacity: RING_CAPACITY,
            bitrate: 128_000,
            vbr: true,
            fec: true,
        }
    }
}
