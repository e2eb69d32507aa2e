// engine/state.rs — Shared application state and the turn-token guard.
// One explicit record instead of ambient globals: theme, user, language
// and mode live here and are owned by the session controller. The
// decoder/classifier core takes no dependency on any of this.

use crate::atoms::types::{ChatMessage, CoachMode, ThemeId, UserAccount};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Mutable state shared between the controller and the embedding UI.
#[derive(Default)]
pub struct AppState {
    pub current_user: Mutex<Option<UserAccount>>,
    pub theme: Mutex<ThemeId>,
    pub mode: Mutex<CoachMode>,
    /// BCP 47 tag for UI copy; the engine only carries it.
    pub language: Mutex<String>,
    /// The visible conversation, newest message last.
    pub transcript: Mutex<Vec<ChatMessage>>,
    /// Id of the session the transcript is persisted under, if any.
    pub current_session: Mutex<Option<String>>,
    /// Set when a paywall frame rolled back the last turn; the UI clears
    /// it after showing the upgrade prompt.
    pub paywall_pending: AtomicBool,
    active_turn: Arc<AtomicU64>,
}

impl AppState {
    pub fn new() -> Self {
        let state = AppState::default();
        *state.language.lock() = "zh-CN".into();
        state
    }

    /// Begin a new turn, superseding any turn still streaming. The
    /// returned guard is checked between frames: once it is stale, the
    /// old stream stops and its remaining frames are discarded.
    pub fn begin_turn(&self) -> TurnGuard {
        let token = self.active_turn.fetch_add(1, Ordering::AcqRel) + 1;
        TurnGuard {
            active: Arc::clone(&self.active_turn),
            token,
        }
    }
}

/// Token identifying one in-flight turn. Exactly one guard is current
/// per `AppState` at any time.
#[derive(Debug, Clone)]
pub struct TurnGuard {
    active: Arc<AtomicU64>,
    token: u64,
}

impl TurnGuard {
    pub fn is_current(&self) -> bool {
        self.active.load(Ordering::Acquire) == self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_turn_supersedes_older() {
        let state = AppState::new();
        let first = state.begin_turn();
        assert!(first.is_current());

        let second = state.begin_turn();
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[test]
    fn defaults_match_the_product() {
        let state = AppState::new();
        assert_eq!(*state.theme.lock(), ThemeId::Royal);
        assert_eq!(*state.mode.lock(), CoachMode::Master);
        assert_eq!(*state.language.lock(), "zh-CN");
        assert!(state.current_user.lock().is_none());
    }
}
