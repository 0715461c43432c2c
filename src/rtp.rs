//! RTP-style packet framing
//!
//! Wraps an encoded payload with a versioned, sequenced, timestamped
//! 12-byte header for downstream real-time transport. The framer only
//! serializes; it never paces or transmits. Callers advance the
//! sequence number and timestamp between packets.

/// Fixed header length in bytes
pub const HEADER_SIZE: usize = 12;

const RTP_VERSION: u8 = 2;

/// Payload type marker for Opus audio
const PAYLOAD_TYPE: u8 = 0x78;

/// One framed packet: header plus payload, rebuilt on every change.
///
/// Header layout (big-endian): `[V=2|P|X|CC][M|PT][seq:2][timestamp:4][ssrc:4]`
pub struct RtpPacket {
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
    packet: Vec<u8>,
}

impl RtpPacket {
    /// Create a framer for one logical stream identified by `ssrc`
    pub fn new(ssrc: u32) -> Self {
        let mut packet = Self {
            sequence: 0,
            timestamp: 0,
            ssrc,
            packet: vec![0; HEADER_SIZE],
        };
        packet.rebuild_header();
        packet
    }

    /// Replace the payload, keeping header fields
    pub fn set_payload(&mut self, data: &[u8]) {
        self.packet.truncate(HEADER_SIZE);
        self.packet.extend_from_slice(data);
        self.rebuild_header();
    }

    pub fn set_sequence(&mut self, sequence: u16) {
        self.sequence = sequence;
        self.rebuild_header();
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
        self.rebuild_header();
    }

    pub fn set_ssrc(&mut self, ssrc: u32) {
        self.ssrc = ssrc;
        self.rebuild_header();
    }

    /// Step to the next packet in the sequence (wraps at 16 bits)
    pub fn advance_sequence(&mut self) {
        self.sequence = self.sequence.wrapping_add(1);
        self.rebuild_header();
    }

    /// Advance the media clock by `delta` units (wraps at 32 bits)
    pub fn advance_timestamp(&mut self, delta: u32) {
        self.timestamp = self.timestamp.wrapping_add(delta);
        self.rebuild_header();
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Complete wire bytes: header followed by payload
    pub fn data(&self) -> &[u8] {
        &self.packet
    }

    /// Payload bytes only
    pub fn payload(&self) -> &[u8] {
        &self.packet[HEADER_SIZE..]
    }

    fn rebuild_header(&mut self) {
        let h = &mut self.packet[..HEADER_SIZE];

        h[0] = RTP_VERSION << 6; // V=2, P=0, X=0, CC=0
        h[1] = PAYLOAD_TYPE; // M=0

        h[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        h[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        h[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
    }
}
