//! Badge table and evaluation
//!
//! Badges are checked in table order. A badge already present in the state
//! is never awarded twice, so evaluating the same state repeatedly is a
//! no-op after the first call.

use crate::state::{EventKind, HistoryEvent, ProgressionState, STAT_SELF_IMPROVES};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A badge and the condition that unlocks it
#[derive(Debug, Clone, Copy)]
pub struct Badge {
    /// Stable identifier stored in the state
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// How to earn it
    pub description: &'static str,
    predicate: fn(&ProgressionState) -> bool,
}

impl Badge {
    const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        predicate: fn(&ProgressionState) -> bool,
    ) -> Self {
        Self {
            id,
            name,
            description,
            predicate,
        }
    }

    /// Whether the state qualifies for this badge
    #[inline]
    #[must_use]
    pub fn is_earned(&self, state: &ProgressionState) -> bool {
        (self.predicate)(state)
    }
}

/// Every badge, in evaluation order
pub const BADGES: &[Badge] = &[
    Badge::new("first_improve", "First Step", "Apply your first change", improves_at_least_1),
    Badge::new("code_crafter", "Code Crafter", "Apply 5 changes", improves_at_least_5),
    Badge::new("refactor_master", "Refactor Master", "Apply 10 changes", improves_at_least_10),
    Badge::new("level_5", "Level 5 Reached", "Reach level 5", level_at_least_5),
    Badge::new("level_10", "Level 10 Reached", "Reach level 10", level_at_least_10),
];

fn improves_at_least_1(s: &ProgressionState) -> bool {
    s.stat(STAT_SELF_IMPROVES) >= 1
}

fn improves_at_least_5(s: &ProgressionState) -> bool {
    s.stat(STAT_SELF_IMPROVES) >= 5
}

fn improves_at_least_10(s: &ProgressionState) -> bool {
    s.stat(STAT_SELF_IMPROVES) >= 10
}

fn level_at_least_5(s: &ProgressionState) -> bool {
    s.level >= 5
}

fn level_at_least_10(s: &ProgressionState) -> bool {
    s.level >= 10
}

/// Look up a badge by id
#[must_use]
pub fn badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

/// Every badge with whether `state` has unlocked it, in table order
pub fn all_badges(state: &ProgressionState) -> impl Iterator<Item = (&'static Badge, bool)> + '_ {
    BADGES.iter().map(move |b| (b, state.badges.contains(b.id)))
}

/// Display name for a badge id, falling back to the id itself
#[must_use]
pub fn badge_name(id: &str) -> &str {
    badge(id).map_or(id, |b| b.name)
}

/// Award every newly qualifying badge
///
/// Each award is inserted into `state.badges` and recorded as a
/// zero-XP [`EventKind::BadgeAwarded`] history entry directly behind the
/// event that earned it.
///
/// # Returns
/// Ids of the badges unlocked by this call, in table order
pub fn evaluate(state: &mut ProgressionState, now: DateTime<Utc>) -> Vec<&'static str> {
    let mut unlocked = Vec::new();
    let mut events = Vec::new();

    for badge in BADGES {
        if state.badges.contains(badge.id) || !badge.is_earned(state) {
            continue;
        }

        state.badges.insert(badge.id.to_string());

        let mut meta = BTreeMap::new();
        meta.insert("badge".to_string(), badge.id.to_string());
        meta.insert("name".to_string(), badge.name.to_string());
        events.push(HistoryEvent::at(now, EventKind::BadgeAwarded, 0, meta));

        tracing::info!(badge = badge.id, "Badge unlocked: {}", badge.name);
        unlocked.push(badge.id);
    }

    state.record_follow_ups(events);
    unlocked
}
