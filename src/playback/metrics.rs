//! Per-player metrics
//!
//! Monotonic counters updated by the worker executing a player's frame
//! task (or by the reader on underrun) and read under a shared lock by
//! any caller. Fields are individually consistent; there is no
//! cross-field atomicity guarantee.

use serde::{Deserialize, Serialize};

/// Smoothing weight for the frame-time moving average (99/100 prior)
const FRAME_TIME_SMOOTHING: u64 = 99;

/// Snapshot of one player's production counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    /// Frames that completed the pipeline (including silence substitutes)
    pub frames_generated: u64,

    /// Encoded payloads discarded because the output buffer was full
    pub frames_dropped: u64,

    /// Decode failures and encode failures (shared counter)
    pub decode_errors: u32,

    /// Reads that found the output buffer empty
    pub buffer_underruns: u32,

    /// Exponentially smoothed frame production time in microseconds
    pub avg_frame_time_us: u64,
}

impl PlayerMetrics {
    /// Fold one frame-time sample into the moving average:
    /// `avg' = (avg * 99 + sample) / 100`
    pub fn record_frame_time(&mut self, sample_us: u64) {
        self.avg_frame_time_us =
            (self.avg_frame_time_us * FRAME_TIME_SMOOTHING + sample_us) / (FRAME_TIME_SMOOTHING + 1);
    }
}
