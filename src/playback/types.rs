//! Playback value types

use serde::{Deserialize, Serialize};

/// Metadata describing a loadable track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Source locator handed to the engine's source provider
    pub url: String,

    /// Total duration in milliseconds
    pub duration_ms: u64,

    /// Source sample rate (informational; the pipeline output is fixed)
    pub sample_rate: u32,

    /// Source channel count
    pub channels: u16,
}

impl TrackInfo {
    pub fn new(url: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            url: url.into(),
            duration_ms,
            sample_rate: crate::config::SAMPLE_RATE,
            channels: crate::config::CHANNELS,
        }
    }

    /// A track is loadable iff it has a source locator and a non-zero
    /// duration
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty() && self.duration_ms > 0
    }
}
