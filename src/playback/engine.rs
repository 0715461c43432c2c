//! Engine: pool owner, id mint, player registry
//!
//! The engine owns the worker pool, allocates unique player ids, and
//! tracks live players through weak references only — the registry never
//! keeps a discarded player alive. Callers hold the strong reference;
//! scheduled tasks hold their own strong captures.
//!
//! Engines are plain owned objects, never process-wide singletons;
//! independent engines can coexist (and do, in tests). The pool is
//! stopped and joined by an explicit `shutdown()` or, failing that, by
//! drop — strictly before the pool itself goes away.

use crate::config::EngineConfig;
use crate::playback::player::Player;
use crate::playback::pool::{Task, ThreadPool};
use crate::source::SourceProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info};

/// Multi-tenant streaming engine
pub struct Engine {
    config: EngineConfig,
    pool: Arc<ThreadPool>,
    provider: Arc<dyn SourceProvider>,
    next_player_id: AtomicU64,
    players: Mutex<Vec<Weak<Player>>>,
}

impl Engine {
    /// Create an engine with its own worker pool and source provider
    pub fn new(config: EngineConfig, provider: Arc<dyn SourceProvider>) -> Self {
        let pool = Arc::new(ThreadPool::new(config.worker_threads));

        info!(
            "Engine started: {} workers, ring capacity {}",
            pool.worker_count(),
            config.ring_capacity
        );

        Self {
            config,
            pool,
            provider,
            next_player_id: AtomicU64::new(1),
            players: Mutex::new(Vec::new()),
        }
    }

    /// Create a player with a freshly minted id.
    ///
    /// Ids are strictly increasing and never reused. The caller owns
    /// the returned reference; the registry only holds a weak one.
    pub fn create_player(&self) -> Arc<Player> {
        let id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        let player = Player::new(
            id,
            Arc::clone(&self.pool),
            Arc::clone(&self.provider),
            self.config.clone(),
        );

        self.players.lock().unwrap().push(Arc::downgrade(&player));
        debug!(player = id, "Player created");

        player
    }

    /// Drop the registry entry for `player_id` and prune any entries
    /// whose players are already gone.
    pub fn destroy_player(&self, player_id: u64) {
        let mut players = self.players.lock().unwrap();
        players.retain(|weak| match weak.upgrade() {
            Some(player) => player.id() != player_id,
            None => false,
        });
        debug!(player = player_id, "Player destroyed");
    }

    /// Look up a live player by id
    pub fn get_player(&self, player_id: u64) -> Option<Arc<Player>> {
        self.players
            .lock()
            .unwrap()
            .iter()
            .filter_map(Weak::upgrade)
            .find(|p| p.id() == player_id)
    }

    /// Number of players still alive
    pub fn player_count(&self) -> usize {
        self.players
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Forward a task to the pool. Scheduling and pacing are the
    /// player's responsibility, not the engine's.
    pub fn submit_task(&self, task: Task) {
        self.pool.submit(task);
    }

    /// Stop and join every worker. Pending tasks are discarded along
    /// with the player references they capture. Must happen before the
    /// engine is dropped if callers need deterministic completion;
    /// drop performs it regardless.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }
}
