//! Player: per-session state machine and pipeline driver
//!
//! Each player owns one decode -> resample -> volume -> filter -> encode
//! pipeline, one bounded output buffer of encoded packets, and an atomic
//! state machine. While `Playing`, the player keeps itself scheduled on
//! the engine's worker pool: each frame task produces one 20ms packet and
//! re-submits the next task on completion. That completion-driven
//! re-submission is the only pacing mechanism; the bounded buffer plus
//! drop/underrun counters absorb any mismatch with real time.
//!
//! Frame tasks for one player are strictly sequential (a task is only
//! submitted after the previous one finishes), so the pipeline state is
//! never touched by two tasks at once. A task captures a strong reference
//! to its player, keeping it alive until the task has run or been dropped
//! at pool shutdown.

use crate::audio::decoder::{Decoder, OpusDecoder};
use crate::audio::encoder::{Encoder, EncoderConfig, OpusEncoder};
use crate::audio::filters::{FilterChain, FilterConfig};
use crate::audio::frame::AudioFrame;
use crate::audio::resampler::StreamResampler;
use crate::config::{EngineConfig, CHANNELS, FRAME_DURATION_MS, FRAME_SIZE, SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::playback::metrics::PlayerMetrics;
use crate::playback::pool::{Task, ThreadPool};
use crate::playback::ring_buffer::RingBuffer;
use crate::playback::state::{AtomicState, PlayerState};
use crate::playback::types::TrackInfo;
use crate::source::SourceProvider;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// The transform stages owned by one player, recreated on every `load`
struct Pipeline {
    decoder: Box<dyn Decoder>,
    resampler: Option<StreamResampler>,
    encoder: Box<dyn Encoder>,
}

/// One independent playback session
pub struct Player {
    id: u64,
    /// Used to capture strong self-references inside scheduled tasks
    self_weak: Weak<Player>,
    pool: Arc<ThreadPool>,
    provider: Arc<dyn SourceProvider>,
    config: EngineConfig,

    state: AtomicState,
    frame_index: AtomicU64,
    /// Volume scalar stored as f32 bits, clamped to [0, 2]
    volume_bits: AtomicU32,

    track: Mutex<Option<TrackInfo>>,
    pipeline: Mutex<Option<Pipeline>>,
    filters: Mutex<FilterChain>,
    output: RingBuffer<Vec<u8>>,
    metrics: Mutex<PlayerMetrics>,
}

impl Player {
    pub(crate) fn new(
        id: u64,
        pool: Arc<ThreadPool>,
        provider: Arc<dyn SourceProvider>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let ring_capacity = config.ring_capacity;
        Arc::new_cyclic(|self_weak| Self {
            id,
            self_weak: self_weak.clone(),
            pool,
            provider,
            config,
            state: AtomicState::new(PlayerState::Idle),
            frame_index: AtomicU64::new(0),
            volume_bits: AtomicU32::new(1.0f32.to_bits()),
            track: Mutex::new(None),
            pipeline: Mutex::new(None),
            filters: Mutex::new(FilterChain::new()),
            output: RingBuffer::new(ring_capacity),
            metrics: Mutex::new(PlayerMetrics::default()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> PlayerState {
        self.state.load()
    }

    /// Playback position derived from the frame counter
    pub fn position_ms(&self) -> u64 {
        self.frame_index.load(Ordering::Relaxed) * FRAME_DURATION_MS
    }

    pub fn metrics(&self) -> PlayerMetrics {
        *self.metrics.lock().unwrap()
    }

    pub fn track(&self) -> Option<TrackInfo> {
        self.track.lock().unwrap().clone()
    }

    /// Load a track, building a fresh pipeline for it.
    ///
    /// Valid from any state. On failure the player returns to `Idle`;
    /// on success it is `Ready` with `frame_index` reset to 0.
    pub fn load(&self, track: &TrackInfo) -> Result<()> {
        self.state.store(PlayerState::Loading);

        if !track.is_valid() {
            self.state.store(PlayerState::Idle);
            return Err(Error::InvalidArg(
                "Track needs a source locator and a non-zero duration".to_string(),
            ));
        }

        let pipeline = match self.build_pipeline(track) {
            Ok(p) => p,
            Err(e) => {
                debug!(player = self.id, "Load failed: {}", e);
                self.state.store(PlayerState::Idle);
                return Err(e);
            }
        };

        *self.pipeline.lock().unwrap() = Some(pipeline);
        *self.track.lock().unwrap() = Some(track.clone());
        self.frame_index.store(0, Ordering::Relaxed);
        self.state.store(PlayerState::Ready);

        debug!(player = self.id, url = %track.url, "Track loaded");
        Ok(())
    }

    fn build_pipeline(&self, track: &TrackInfo) -> Result<Pipeline> {
        let source = self.provider.open(&track.url)?;
        let decoder = OpusDecoder::open(source)?;

        // Rate conversion only when the source deviates from the fixed
        // output rate
        let resampler = if decoder.sample_rate() != SAMPLE_RATE {
            Some(StreamResampler::new(
                decoder.sample_rate(),
                SAMPLE_RATE,
                CHANNELS,
            )?)
        } else {
            None
        };

        let encoder = OpusEncoder::new(EncoderConfig {
            bitrate: self.config.bitrate,
            vbr: self.config.vbr,
            fec: self.config.fec,
            ..EncoderConfig::default()
        })?;

        Ok(Pipeline {
            decoder: Box::new(decoder),
            resampler,
            encoder: Box::new(encoder),
        })
    }

    /// Start or resume production. Succeeds only from `Ready` or `Paused`.
    pub fn play(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(PlayerState::Ready, PlayerState::Playing)
            .is_err()
            && self
                .state
                .compare_exchange(PlayerState::Paused, PlayerState::Playing)
                .is_err()
        {
            return Err(Error::InvalidState(format!(
                "Cannot play from {}",
                self.state.load()
            )));
        }

        self.schedule_next_frame();
        Ok(())
    }

    /// Suspend production. Succeeds only from `Playing`.
    ///
    /// An already-dispatched frame task may complete one more cycle
    /// before observing the new state.
    pub fn pause(&self) -> Result<()> {
        self.state
            .compare_exchange(PlayerState::Playing, PlayerState::Paused)
            .map_err(|observed| {
                Error::InvalidState(format!("Cannot pause from {}", observed))
            })?;
        Ok(())
    }

    /// Stop unconditionally: discard buffered packets and rewind the
    /// frame counter. Always succeeds, from any state, repeatedly.
    pub fn stop(&self) {
        self.state.store(PlayerState::Stopped);
        self.output.clear();
        self.frame_index.store(0, Ordering::Relaxed);
    }

    /// Seek to `position_ms`.
    ///
    /// Pauses production first if playing, then seeks the decoder. On
    /// success the frame counter is re-derived from the position, the
    /// output buffer is cleared, and the resampler state is reset; if
    /// the player had been playing it resumes. On failure the player
    /// fails closed: it stays `Paused` (if it had been playing) and the
    /// decoder position is whatever the source left it at.
    pub fn seek(&self, position_ms: u64) -> Result<()> {
        let was_playing = self
            .state
            .compare_exchange(PlayerState::Playing, PlayerState::Paused)
            .is_ok();

        {
            let mut guard = self.pipeline.lock().unwrap();
            let pipeline = guard
                .as_mut()
                .ok_or_else(|| Error::InvalidState("No track loaded".to_string()))?;

            pipeline.decoder.seek(position_ms)?;

            self.frame_index
                .store(position_ms / FRAME_DURATION_MS, Ordering::Relaxed);
            self.output.clear();
            if let Some(resampler) = pipeline.resampler.as_mut() {
                resampler.reset();
            }
        }

        if was_playing {
            self.play()?;
        }
        Ok(())
    }

    /// Set the volume scalar, clamped to [0, 2]. Takes effect on the
    /// next produced frame; never fails, never changes state.
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 2.0);
        self.volume_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Replace the filter chain configuration (rebuilt wholesale)
    pub fn set_filters(&self, config: &FilterConfig) {
        self.filters.lock().unwrap().set_config(config, SAMPLE_RATE);
    }

    /// Drain one encoded packet into `buffer` without blocking.
    ///
    /// Returns the number of bytes written; 0 means the buffer was empty
    /// (an underrun, not an error — try again shortly). Payloads larger
    /// than `buffer` are silently truncated, so callers should size the
    /// buffer to [`crate::config::MAX_PACKET_SIZE`].
    pub fn read_frame(&self, buffer: &mut [u8]) -> usize {
        match self.output.try_pop() {
            Some(payload) => {
                let n = payload.len().min(buffer.len());
                buffer[..n].copy_from_slice(&payload[..n]);
                n
            }
            None => {
                self.metrics.lock().unwrap().buffer_underruns += 1;
                0
            }
        }
    }

    /// Encoded packets currently buffered (diagnostics)
    pub fn buffered_packets(&self) -> usize {
        self.output.len()
    }

    /// Produce one 20ms frame: decode, resample, volume, filter, encode,
    /// enqueue, then re-schedule if still playing.
    ///
    /// Runs inside a worker task. Every failure is absorbed locally —
    /// silence substitution, degraded audio, or a dropped frame — and
    /// surfaced only through metrics, so the worker loop and the
    /// re-scheduling chain are never disturbed.
    fn process_frame(&self) {
        let start = Instant::now();

        let mut frame = AudioFrame::new(FRAME_SIZE, SAMPLE_RATE, CHANNELS);

        {
            let mut guard = self.pipeline.lock().unwrap();
            let Some(pipeline) = guard.as_mut() else {
                return;
            };

            // Decode. Concealment already happened inside the decoder;
            // a failure here means even that produced nothing usable.
            if let Err(e) = pipeline.decoder.decode_frame(&mut frame) {
                trace!(player = self.id, "Decode failed, substituting silence: {}", e);
                self.metrics.lock().unwrap().decode_errors += 1;

                frame.sample_rate = SAMPLE_RATE;
                frame.channels = CHANNELS;
                frame.resize(FRAME_SIZE);
                frame.fill_silence();
            }

            // Resample to the fixed output rate; a conversion failure
            // degrades to the unconverted frame rather than dropping it
            if let Some(resampler) = pipeline.resampler.as_mut() {
                match resampler.resample(&frame) {
                    Ok(converted) => frame = converted,
                    Err(e) => {
                        warn!(player = self.id, "Resample failed, passing frame through: {}", e);
                    }
                }
            }

            // Identity skip is a shortcut, not a correctness requirement
            let volume = self.volume();
            if volume != 1.0 {
                frame.apply_volume(volume);
            }

            self.filters.lock().unwrap().process(&mut frame);

            match pipeline.encoder.encode_frame(&frame) {
                Ok(payload) => {
                    if self.output.try_push(payload).is_err() {
                        // Consumer is behind; production never blocks on it
                        trace!(player = self.id, "Output buffer full, frame dropped");
                        self.metrics.lock().unwrap().frames_dropped += 1;
                    }
                }
                Err(e) => {
                    trace!(player = self.id, "Encode failed, frame discarded: {}", e);
                    // Encode failures share the decode error counter
                    self.metrics.lock().unwrap().decode_errors += 1;
                }
            }
        }

        let elapsed_us = start.elapsed().as_micros() as u64;
        {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.frames_generated += 1;
            metrics.record_frame_time(elapsed_us);
        }

        self.frame_index.fetch_add(1, Ordering::Relaxed);
        self.schedule_next_frame();
    }

    /// Submit the task for the next frame, unless playback has stopped.
    ///
    /// This check is the sole cancellation mechanism: a player stops
    /// producing by failing it, never by interrupting in-flight work.
    fn schedule_next_frame(&self) {
        if self.state.load() != PlayerState::Playing {
            return;
        }

        let Some(player) = self.self_weak.upgrade() else {
            return;
        };

        let frame_index = self.frame_index.load(Ordering::Relaxed);
        self.pool.submit(Task {
            player_id: self.id,
            frame_index,
            job: Box::new(move || player.process_frame()),
        });
    }

    #[cfg(test)]
    pub(crate) fn install_pipeline(
        &self,
        decoder: Box<dyn Decoder>,
        resampler: Option<StreamResampler>,
        encoder: Box<dyn Encoder>,
    ) {
        *self.pipeline.lock().unwrap() = Some(Pipeline {
            decoder,
            resampler,
            encoder,
        });
        self.state.store(PlayerState::Ready);
    }

    #[cfg(test)]
    pub(crate) fn run_one_frame(&self) {
        self.process_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::source::{PacketSource, SourcePacket};
    use std::sync::atomic::AtomicUsize;

    struct NullProvider;

    impl SourceProvider for NullProvider {
        fn open(&self, _url: &str) -> Result<Box<dyn PacketSource>> {
            Err(Error::Source("no source".to_string()))
        }
    }

    /// Decoder whose every frame fails (concealment included)
    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn decode_frame(&mut self, _frame: &mut AudioFrame) -> Result<()> {
            Err(Error::Decode("corrupt packet".to_string()))
        }
        fn seek(&mut self, _timestamp_ms: u64) -> Result<()> {
            Ok(())
        }
        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }
        fn channels(&self) -> u16 {
            CHANNELS
        }
        fn duration_ms(&self) -> u64 {
            60_000
        }
    }

    /// Decoder producing a constant non-zero signal
    struct ToneDecoder;

    impl Decoder for ToneDecoder {
        fn decode_frame(&mut self, frame: &mut AudioFrame) -> Result<()> {
            frame.sample_rate = SAMPLE_RATE;
            frame.channels = CHANNELS;
            frame.resize(FRAME_SIZE);
            frame.samples.fill(0.5);
            Ok(())
        }
        fn seek(&mut self, _timestamp_ms: u64) -> Result<()> {
            Ok(())
        }
        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }
        fn channels(&self) -> u16 {
            CHANNELS
        }
        fn duration_ms(&self) -> u64 {
            60_000
        }
    }

    /// Encoder that records what it saw and emits fixed payloads
    struct ProbeEncoder {
        frames_seen: Arc<Mutex<Vec<AudioFrame>>>,
        fail: bool,
    }

    impl Encoder for ProbeEncoder {
        fn encode_frame(&mut self, frame: &AudioFrame) -> Result<Vec<u8>> {
            self.frames_seen.lock().unwrap().push(frame.clone());
            if self.fail {
                Err(Error::Encode("encoder broken".to_string()))
            } else {
                Ok(vec![0xAB; 32])
            }
        }
    }

    fn test_player() -> Arc<Player> {
        Player::new(
            1,
            Arc::new(ThreadPool::new(1)),
            Arc::new(NullProvider),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_load_invalid_track_returns_to_idle() {
        let player = test_player();

        let no_url = TrackInfo::new("", 1000);
        assert!(player.load(&no_url).is_err());
        assert_eq!(player.state(), PlayerState::Idle);

        let zero_duration = TrackInfo::new("https://example.com/t.webm", 0);
        assert!(player.load(&zero_duration).is_err());
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_load_source_failure_returns_to_idle() {
        let player = test_player();
        let track = TrackInfo::new("https://example.com/t.webm", 1000);

        // NullProvider refuses to open anything
        assert!(player.load(&track).is_err());
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_play_requires_ready_or_paused() {
        let player = test_player();

        // Idle: rejected
        assert!(player.play().is_err());
        assert_eq!(player.state(), PlayerState::Idle);

        // Ready: accepted
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );
        assert!(player.play().is_ok());
        assert_eq!(player.state(), PlayerState::Playing);

        // Playing -> Paused -> Playing
        assert!(player.pause().is_ok());
        assert_eq!(player.state(), PlayerState::Paused);
        assert!(player.play().is_ok());

        player.stop();
    }

    #[test]
    fn test_pause_requires_playing() {
        let player = test_player();
        assert!(player.pause().is_err());

        player.stop();
        assert!(player.pause().is_err());
        assert_eq!(player.state(), PlayerState::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let player = test_player();
        player.stop();
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(player.position_ms(), 0);
        assert_eq!(player.buffered_packets(), 0);

        player.stop();
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(player.position_ms(), 0);
        assert_eq!(player.buffered_packets(), 0);
    }

    #[test]
    fn test_seek_without_track_fails() {
        let player = test_player();
        assert!(player.seek(1000).is_err());
    }

    #[test]
    fn test_seek_rederives_frame_index() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );

        player.seek(2000).unwrap();
        assert_eq!(player.position_ms(), 2000);
        assert_eq!(player.buffered_packets(), 0);
    }

    #[test]
    fn test_volume_clamping() {
        let player = test_player();

        player.set_volume(-1.0);
        assert_eq!(player.volume(), 0.0);

        player.set_volume(5.0);
        assert_eq!(player.volume(), 2.0);

        player.set_volume(1.5);
        assert_eq!(player.volume(), 1.5);
    }

    #[test]
    fn test_decode_failure_substitutes_silence_once() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(FailingDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: Arc::clone(&frames),
                fail: false,
            }),
        );

        player.run_one_frame();

        // A full silent frame reached the encoder
        let seen = frames.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].num_samples(), FRAME_SIZE);
        assert!(seen[0].samples.iter().all(|&s| s == 0.0));

        // Exactly one decode error for that frame, and the frame still
        // counts as generated
        let metrics = player.metrics();
        assert_eq!(metrics.decode_errors, 1);
        assert_eq!(metrics.frames_generated, 1);
        assert_eq!(metrics.frames_dropped, 0);
    }

    #[test]
    fn test_encode_failure_discards_frame_and_shares_counter() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: true,
            }),
        );

        player.run_one_frame();

        let metrics = player.metrics();
        assert_eq!(metrics.decode_errors, 1);
        assert_eq!(metrics.frames_generated, 1);
        assert_eq!(player.buffered_packets(), 0);
    }

    #[test]
    fn test_full_buffer_drops_frames() {
        let player = Player::new(
            1,
            Arc::new(ThreadPool::new(1)),
            Arc::new(NullProvider),
            EngineConfig {
                ring_capacity: 2,
                ..EngineConfig::default()
            },
        );
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );

        for _ in 0..5 {
            player.run_one_frame();
        }

        let metrics = player.metrics();
        assert_eq!(metrics.frames_generated, 5);
        assert_eq!(metrics.frames_dropped, 3);
        assert_eq!(player.buffered_packets(), 2);
    }

    #[test]
    fn test_volume_applied_to_frames() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: Arc::clone(&frames),
                fail: false,
            }),
        );

        player.set_volume(0.5);
        player.run_one_frame();

        let seen = frames.lock().unwrap();
        assert!(seen[0].samples.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_read_frame_underrun_and_truncation() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );

        // Empty buffer: zero bytes and an underrun
        let mut buf = [0u8; 64];
        assert_eq!(player.read_frame(&mut buf), 0);
        assert_eq!(player.metrics().buffer_underruns, 1);

        // Produced payload (32 bytes of 0xAB) round-trips
        player.run_one_frame();
        let n = player.read_frame(&mut buf);
        assert_eq!(n, 32);
        assert!(buf[..n].iter().all(|&b| b == 0xAB));

        // Undersized reader buffer truncates silently
        player.run_one_frame();
        let mut small = [0u8; 8];
        assert_eq!(player.read_frame(&mut small), 8);
    }

    #[test]
    fn test_frame_time_average_updates() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );

        for _ in 0..3 {
            player.run_one_frame();
        }
        assert_eq!(player.metrics().frames_generated, 3);
        // EMA may round to zero for sub-100us frames; position advanced
        assert_eq!(player.position_ms(), 3 * FRAME_DURATION_MS);
    }

    #[test]
    fn test_concurrent_transitions_single_winner() {
        let player = test_player();
        let frames = Arc::new(Mutex::new(Vec::new()));
        player.install_pipeline(
            Box::new(ToneDecoder),
            None,
            Box::new(ProbeEncoder {
                frames_seen: frames,
                fail: false,
            }),
        );
        player.play().unwrap();

        let pause_wins = Arc::new(AtomicUsize::new(0));
        std::thread::scope(|s| {
            for _ in 0..8 {
                let player = Arc::clone(&player);
                let pause_wins = Arc::clone(&pause_wins);
                s.spawn(move || {
                    if player.pause().is_ok() {
                        pause_wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        // Exactly one pause() observed Playing
        assert_eq!(pause_wins.load(Ordering::SeqCst), 1);
        assert_eq!(player.state(), PlayerState::Paused);
        player.stop();
    }
}
