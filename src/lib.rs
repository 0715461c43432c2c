//! # opuscast
//!
//! Multi-tenant real-time audio streaming engine. Each playback session
//! (player) runs its own decode -> resample -> filter -> encode pipeline,
//! producing fixed-duration (20ms) Opus packets at 48kHz stereo into a
//! bounded ring buffer that a consumer drains at its own pace.
//!
//! Per-frame work is scheduled cooperatively across a fixed pool of
//! worker threads; a playing player keeps itself scheduled by
//! re-submitting its next frame task whenever the previous one
//! completes. Transient pipeline failures (decode errors, encoder
//! hiccups, full buffers) degrade to silence or dropped frames and are
//! surfaced only through per-player metrics — never as crashes.
//!
//! ```no_run
//! use opuscast::{Engine, EngineConfig, TrackInfo};
//! use opuscast::config::MAX_PACKET_SIZE;
//! # fn provider() -> std::sync::Arc<dyn opuscast::SourceProvider> { unimplemented!() }
//!
//! let engine = Engine::new(EngineConfig::default(), provider());
//! let player = engine.create_player();
//!
//! player.load(&TrackInfo::new("https://example.com/track.webm", 213_000))?;
//! player.play()?;
//!
//! let mut buf = [0u8; MAX_PACKET_SIZE];
//! let n = player.read_frame(&mut buf); // 0 = underrun, try again shortly
//! # let _ = n;
//! # Ok::<(), opuscast::Error>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod rtp;
pub mod source;

pub use audio::{AudioFrame, EqualizerBand, FilterConfig};
pub use config::EngineConfig;
pub use error::{Error, Result, Status};
pub use playback::{Engine, Player, PlayerMetrics, PlayerState, TrackInfo};
pub use rtp::RtpPacket;
pub use source::{PacketSource, SourcePacket, SourceProvider};
