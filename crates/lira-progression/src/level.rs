//! Level curve
//!
//! Level 1 starts at 0 XP. The first threshold is [`BASE_XP`]; every
//! threshold after that is the previous one times [`GROWTH_MULTIPLIER`],
//! rounded down. Reaching a threshold exactly counts as reaching the level.

use serde::{Deserialize, Serialize};

/// XP required to leave level 1
pub const BASE_XP: u64 = 100;

/// Growth applied to each successive threshold
pub const GROWTH_MULTIPLIER: f64 = 1.5;

/// Level derived from a total XP amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Current level (starts at 1)
    pub level: u32,
    /// Total XP at which the next level is reached
    pub next_level_xp: u64,
}

/// Compute the level for a total XP amount.
///
/// Always terminates: the threshold strictly increases on every step.
#[must_use]
pub fn level_of(xp: u64) -> LevelInfo {
    let mut level = 1;
    let mut required = BASE_XP;

    while xp >= required {
        level += 1;
        if required == u64::MAX {
            break;
        }
        required = next_threshold(required);
    }

    LevelInfo {
        level,
        next_level_xp: required,
    }
}

/// Threshold that follows `required`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn next_threshold(required: u64) -> u64 {
    let grown = (required as f64 * GROWTH_MULTIPLIER).floor() as u64;
    // Guards against f64 saturation near u64::MAX
    grown.max(required.saturating_add(1))
}

/// XP at which the given level starts
#[must_use]
pub fn level_floor_xp(level: u32) -> u64 {
    let mut floor = 0;
    let mut required = BASE_XP;
    for _ in 1..level {
        floor = required;
        required = next_threshold(required);
    }
    floor
}

/// Progress through the current level band, 0-100
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn progress_percent(xp: u64) -> u8 {
    let info = level_of(xp);
    let floor = level_floor_xp(info.level);
    let band = info.next_level_xp.saturating_sub(floor);
    if band == 0 {
        return 100;
    }
    let done = xp.saturating_sub(floor) as f64 / band as f64;
    (done * 100.0).clamp(0.0, 100.0) as u8
}
