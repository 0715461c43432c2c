//! Packetized source boundary
//!
//! The engine consumes compressed audio through this interface and never
//! parses containers itself. Implementations demux WebM/MP4/etc. and hand
//! over codec packets with timestamps.

use crate::error::Result;

/// One compressed audio packet read from a source
#[derive(Debug, Clone)]
pub struct SourcePacket {
    /// Codec payload bytes
    pub data: Vec<u8>,

    /// Presentation timestamp in milliseconds
    pub timestamp_ms: u64,
}

/// A demuxed, seekable stream of codec packets.
///
/// Implementations are driven from exactly one worker thread at a time,
/// so they need `Send` but not `Sync`.
pub trait PacketSource: Send {
    /// Read the next packet, or `None` at end of stream
    fn read_packet(&mut self) -> Option<SourcePacket>;

    /// Seek to the given timestamp. Returns false if the source cannot
    /// seek there; position is unchanged on failure.
    fn seek(&mut self, timestamp_ms: u64) -> bool;

    /// Total stream duration in milliseconds (0 if unknown)
    fn duration_ms(&self) -> u64;

    /// Release underlying resources. Called once; reads after close
    /// return `None`.
    fn close(&mut self);
}

/// Opens packet sources from track locators.
///
/// The engine holds one provider and uses it for every `load`. Shared
/// across players and callers, hence `Send + Sync`.
pub trait SourceProvider: Send + Sync {
    /// Open a packet source for the given locator
    fn open(&self, url: &str) -> Result<Box<dyn PacketSource>>;
}
