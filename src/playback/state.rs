//! Player state machine
//!
//! Transitions go through an atomic cell with compare-and-swap so that
//! concurrent callers racing on the same transition see exactly one
//! winner. A stale frame-production task may still observe the old
//! state for one cycle; "not Playing" is re-checked at every
//! scheduling decision, not assumed to take effect instantly.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Player lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PlayerState {
    Idle = 0,
    Loading = 1,
    Ready = 2,
    Playing = 3,
    Paused = 4,
    Stopped = 5,
}

impl PlayerState {
    fn from_u8(value: u8) -> PlayerState {
        match value {
            0 => PlayerState::Idle,
            1 => PlayerState::Loading,
            2 => PlayerState::Ready,
            3 => PlayerState::Playing,
            4 => PlayerState::Paused,
            _ => PlayerState::Stopped,
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlayerState::Idle => "idle",
            PlayerState::Loading => "loading",
            PlayerState::Ready => "ready",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Lock-free state cell
#[derive(Debug)]
pub struct AtomicState {
    inner: AtomicU8,
}

impl AtomicState {
    pub fn new(state: PlayerState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    pub fn load(&self) -> PlayerState {
        PlayerState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn store(&self, state: PlayerState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Transition `from -> to`; fails (returning the observed state)
    /// if the current state is not `from`. Exactly one of any set of
    /// racing callers wins.
    pub fn compare_exchange(
        &self,
        from: PlayerState,
        to: PlayerState,
    ) -> Result<PlayerState, PlayerState> {
        self.inner
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(PlayerState::from_u8)
            .map_err(PlayerState::from_u8)
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(PlayerState::Idle)
    }
}
