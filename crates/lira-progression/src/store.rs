//! Progression store
//!
//! Owns the read-modify-write cycle over the persisted state:
//! - `load` never fails on bad data (corrupt state resets to default)
//! - `apply_event` is serialized by a single-writer lock
//! - every mutation is persisted before it is returned

use crate::badge;
use crate::error::ProgressionError;
use crate::kv::KeyValueStore;
use crate::state::{EventKind, HistoryEvent, ProgressionState, STAT_LINES_REFACTORED};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key the state is stored under by default
pub const DEFAULT_STATE_KEY: &str = "lira_developer_gamification";

/// Meta entry carrying a changed line count
pub const META_LINES: &str = "lines";

/// Progression store over a key-value backend
pub struct ProgressionStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    writer: Mutex<()>,
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl ProgressionStore {
    /// Create a store using [`DEFAULT_STATE_KEY`]
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, DEFAULT_STATE_KEY)
    }

    /// Create a store under a custom key (one per user/session)
    #[inline]
    #[must_use]
    pub fn with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            writer: Mutex::new(()),
        }
    }

    /// Key the state lives under
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the current state
    ///
    /// Absent state yields the default without persisting it. Unparsable
    /// state is discarded and the default returned. Cached level fields are
    /// always recomputed from `xp`.
    ///
    /// # Errors
    /// Returns error only if the backend itself cannot be read
    pub fn load(&self) -> Result<ProgressionState, ProgressionError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(ProgressionState::default());
        };

        match serde_json::from_str::<ProgressionState>(&raw) {
            Ok(mut state) => {
                if !state.is_level_consistent() {
                    tracing::debug!(xp = state.xp, "Stored level out of date, recomputing");
                }
                state.recompute_level();
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, "Progression state corrupt, resetting: {}", e);
                if let Err(del) = self.backend.delete(&self.key) {
                    tracing::warn!("Could not discard corrupt state: {}", del);
                }
                Ok(ProgressionState::default())
            }
        }
    }

    /// Record an event and return the updated state
    ///
    /// Adds `xp_delta`, bumps the counter for `kind`, recomputes the level,
    /// prepends the event, awards badges and persists the result. Calls are
    /// serialized; concurrent callers never lose each other's updates.
    ///
    /// # Errors
    /// Returns error if the state cannot be read or persisted
    pub fn apply_event(
        &self,
        kind: EventKind,
        xp_delta: u64,
        meta: BTreeMap<String, String>,
    ) -> Result<ProgressionState, ProgressionError> {
        let _guard = self.writer.lock();

        let mut state = self.load()?;
        let now = Utc::now();

        state.xp = state.xp.saturating_add(xp_delta);
        if let Some(counter) = kind.counter() {
            state.bump_stat(counter, 1);
        }
        if let Some(lines) = meta.get(META_LINES).and_then(|v| v.parse::<u64>().ok()) {
            state.bump_stat(STAT_LINES_REFACTORED, lines);
        }
        state.recompute_level();

        state.push_history(HistoryEvent::at(now, kind, xp_delta, meta));
        let unlocked = badge::evaluate(&mut state, now);

        self.persist(&state)?;

        tracing::info!(
            event = %kind,
            xp = state.xp,
            level = state.level,
            badges_unlocked = unlocked.len(),
            "Progression updated: +{} XP",
            xp_delta
        );

        Ok(state)
    }

    /// Delete the persisted state
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    pub fn reset(&self) -> Result<(), ProgressionError> {
        let _guard = self.writer.lock();
        self.backend.delete(&self.key)?;
        tracing::info!(key = %self.key, "Progression state reset");
        Ok(())
    }

    fn persist(&self, state: &ProgressionState) -> Result<(), ProgressionError> {
        let encoded = serde_json::to_string(state)?;
        self.backend.set(&self.key, &encoded)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::state::STAT_SELF_IMPROVES;

    fn store() -> (Arc<MemoryStore>, ProgressionStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = ProgressionStore::new(backend.clone());
        (backend, store)
    }

    fn change_meta(file: &str) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert("file".to_string(), file.to_string());
        meta
    }

    #[test]
    fn load_absent_returns_default_without_persisting() {
        let (backend, store) = store();
        assert_eq!(store.load().unwrap(), ProgressionState::default());
        assert!(backend.is_empty());
    }

    #[test]
    fn apply_change_event() {
        let (backend, store) = store();
        let state = store
            .apply_event(EventKind::ChangeApplied, 25, change_meta("a.py"))
            .unwrap();

        assert_eq!(state.xp, 25);
        assert_eq!(state.stat(STAT_SELF_IMPROVES), 1);
        assert!(state.badges.contains("first_improve"));
        // The change stays on top, its badge right behind it
        assert_eq!(state.history[0].kind, EventKind::ChangeApplied);
        assert_eq!(state.history[1].kind, EventKind::BadgeAwarded);
        assert!(backend.get(DEFAULT_STATE_KEY).unwrap().is_some());

        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn lines_meta_accumulates() {
        let (_, store) = store();
        let mut meta = change_meta("a.py");
        meta.insert(META_LINES.to_string(), "12".to_string());
        store.apply_event(EventKind::ChangeApplied, 25, meta.clone()).unwrap();
        let state = store.apply_event(EventKind::ChangeApplied, 25, meta).unwrap();
        assert_eq!(state.stat(STAT_LINES_REFACTORED), 24);
    }

    #[test]
    fn corrupt_state_resets_to_default() {
        let (backend, store) = store();
        backend.set(DEFAULT_STATE_KEY, "{not json").unwrap();

        assert_eq!(store.load().unwrap(), ProgressionState::default());
        assert!(backend.get(DEFAULT_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn stale_level_is_recomputed_on_load() {
        let (backend, store) = store();
        let mut state = ProgressionState::default();
        state.xp = 400;
        backend
            .set(DEFAULT_STATE_KEY, &serde_json::to_string(&state).unwrap())
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.level, 5);
        assert_eq!(loaded.next_level_xp, 505);
    }

    #[test]
    fn reset_clears_state() {
        let (_, store) = store();
        store
            .apply_event(EventKind::ChangeApplied, 25, BTreeMap::new())
            .unwrap();
        store.reset().unwrap();
        assert_eq!(store.load().unwrap(), ProgressionState::default());
    }

    #[test]
    fn separate_keys_are_isolated() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let alice = ProgressionStore::with_key(backend.clone(), "alice");
        let bob = ProgressionStore::with_key(backend, "bob");

        alice
            .apply_event(EventKind::ChangeApplied, 25, BTreeMap::new())
            .unwrap();
        assert_eq!(bob.load().unwrap().xp, 0);
    }
}
