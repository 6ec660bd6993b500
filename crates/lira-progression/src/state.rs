//! Progression state and history events

use crate::level::level_of;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of history events kept (most recent first)
pub const HISTORY_LIMIT: usize = 50;

/// Stat incremented once per applied change
pub const STAT_SELF_IMPROVES: &str = "self_improves";
/// Stat counting modules touched
pub const STAT_MODULES_WORKED: &str = "modules_worked";
/// Stat accumulating refactored line counts
pub const STAT_LINES_REFACTORED: &str = "lines_refactored";
/// Stat accumulating estimated time saved
pub const STAT_TIME_SAVED: &str = "time_saved";

const DEFAULT_STATS: [&str; 4] = [
    STAT_SELF_IMPROVES,
    STAT_MODULES_WORKED,
    STAT_LINES_REFACTORED,
    STAT_TIME_SAVED,
];

/// Kind of progression event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// An approved change was written to a file
    #[serde(rename = "SELF_IMPROVE_APPLIED")]
    ChangeApplied,
    /// A badge was unlocked
    BadgeAwarded,
}

impl EventKind {
    /// Stat bumped by one for this kind of event, if any
    #[inline]
    #[must_use]
    pub fn counter(self) -> Option<&'static str> {
        match self {
            Self::ChangeApplied => Some(STAT_SELF_IMPROVES),
            Self::BadgeAwarded => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChangeApplied => write!(f, "SELF_IMPROVE_APPLIED"),
            Self::BadgeAwarded => write!(f, "BADGE_AWARDED"),
        }
    }
}

/// One entry in the progression history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// What happened
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// XP granted by the event
    #[serde(rename = "xp")]
    pub xp_delta: u64,
    /// Free-form details (file, module, badge...)
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl HistoryEvent {
    /// Create an event stamped now
    #[must_use]
    pub fn new(kind: EventKind, xp_delta: u64, meta: BTreeMap<String, String>) -> Self {
        Self::at(Utc::now(), kind, xp_delta, meta)
    }

    /// Create an event with an explicit timestamp
    #[must_use]
    pub fn at(
        timestamp: DateTime<Utc>,
        kind: EventKind,
        xp_delta: u64,
        meta: BTreeMap<String, String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            xp_delta,
            meta,
        }
    }
}

/// Persisted progression of a developer
///
/// `level` and `next_level_xp` are caches of [`level_of`]`(xp)`; call
/// [`ProgressionState::recompute_level`] after touching `xp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    /// Cached level
    pub level: u32,
    /// Total XP earned
    pub xp: u64,
    /// Cached XP threshold of the next level
    pub next_level_xp: u64,
    /// Named counters
    #[serde(default)]
    pub stats: BTreeMap<String, u64>,
    /// Unlocked badge ids, in unlock order
    #[serde(default)]
    pub badges: IndexSet<String>,
    /// Events, most recent first
    #[serde(default)]
    pub history: VecDeque<HistoryEvent>,
}

impl ProgressionState {
    /// Read a stat, missing stats count as zero
    #[inline]
    #[must_use]
    pub fn stat(&self, name: &str) -> u64 {
        self.stats.get(name).copied().unwrap_or(0)
    }

    /// Add to a stat, creating it if needed
    pub fn bump_stat(&mut self, name: &str, by: u64) {
        let entry = self.stats.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(by);
    }

    /// Refresh the cached level fields from `xp`
    pub fn recompute_level(&mut self) {
        let info = level_of(self.xp);
        self.level = info.level;
        self.next_level_xp = info.next_level_xp;
    }

    /// Whether the cached level fields agree with `xp`
    #[must_use]
    pub fn is_level_consistent(&self) -> bool {
        let info = level_of(self.xp);
        info.level == self.level && info.next_level_xp == self.next_level_xp
    }

    /// Prepend an event and drop anything past [`HISTORY_LIMIT`]
    pub fn push_history(&mut self, event: HistoryEvent) {
        self.history.push_front(event);
        self.history.truncate(HISTORY_LIMIT);
    }

    /// Insert events directly behind the most recent one, keeping their order
    ///
    /// For events caused by the latest entry, which stays on top.
    pub fn record_follow_ups(&mut self, events: impl IntoIterator<Item = HistoryEvent>) {
        let start = usize::from(!self.history.is_empty());
        for (offset, event) in events.into_iter().enumerate() {
            self.history.insert(start + offset, event);
        }
        self.history.truncate(HISTORY_LIMIT);
    }

    /// Most recent history event
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEvent> {
        self.history.front()
    }
}

impl Default for ProgressionState {
    fn default() -> Self {
        let info = level_of(0);
        Self {
            level: info.level,
            xp: 0,
            next_level_xp: info.next_level_xp,
            stats: DEFAULT_STATS.iter().map(|s| ((*s).to_string(), 0)).collect(),
            badges: IndexSet::new(),
            history: VecDeque::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_shape() {
        let state = ProgressionState::default();
        assert_eq!(state.level, 1);
        assert_eq!(state.xp, 0);
        assert_eq!(state.next_level_xp, 100);
        assert_eq!(state.stats.len(), 4);
        assert_eq!(state.stat(STAT_SELF_IMPROVES), 0);
        assert!(state.badges.is_empty());
        assert!(state.history.is_empty());
    }

    #[test]
    fn history_is_bounded_and_most_recent_first() {
        let mut state = ProgressionState::default();
        for i in 0..60u64 {
            state.push_history(HistoryEvent::new(EventKind::ChangeApplied, i, BTreeMap::new()));
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.latest().map(|e| e.xp_delta), Some(59));
        assert_eq!(state.history.back().map(|e| e.xp_delta), Some(10));
    }

    #[test]
    fn serializes_with_wire_names() {
        let mut state = ProgressionState::default();
        state.push_history(HistoryEvent::new(EventKind::ChangeApplied, 25, BTreeMap::new()));
        let json = serde_json::to_value(&state).unwrap();

        assert!(json.get("next_level_xp").is_some());
        assert_eq!(json["history"][0]["event"], "SELF_IMPROVE_APPLIED");
        assert_eq!(json["history"][0]["xp"], 25);
    }

    #[test]
    fn badge_kind_wire_name() {
        let json = serde_json::to_string(&EventKind::BadgeAwarded).unwrap();
        assert_eq!(json, "\"BADGE_AWARDED\"");
    }

    #[test]
    fn level_consistency_check() {
        let mut state = ProgressionState::default();
        state.xp = 120;
        assert!(!state.is_level_consistent());
        state.recompute_level();
        assert!(state.is_level_consistent());
        assert_eq!(state.level, 2);
    }
}
