//! Scheduling and playback: worker pool, engine, players, buffering

pub mod engine;
pub mod metrics;
pub mod player;
pub mod pool;
pub mod ring_buffer;
pub mod state;
pub mod types;

pub use engine::Engine;
pub use metrics::PlayerMetrics;
pub use player::Player;
pub use pool::{Task, ThreadPool, WorkerThread};
pub use ring_buffer::RingBuffer;
pub use state::PlayerState;
pub use types::TrackInfo;
