use lira_progression::state::STAT_SELF_IMPROVES;
use lira_progression::{
    badge, level_of, EventKind, FileStore, MemoryStore, ProgressionStore, HISTORY_LIMIT,
};
use chrono::Utc;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

fn memory_store() -> ProgressionStore {
    ProgressionStore::new(Arc::new(MemoryStore::new()))
}

fn meta(file: &str) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    meta.insert("file".to_string(), file.to_string());
    meta
}

#[test]
fn test_level_boundaries() {
    assert_eq!((level_of(0).level, level_of(0).next_level_xp), (1, 100));
    assert_eq!((level_of(99).level, level_of(99).next_level_xp), (1, 100));
    assert_eq!((level_of(100).level, level_of(100).next_level_xp), (2, 150));
}

#[test]
fn test_history_never_exceeds_limit() {
    let store = memory_store();
    let mut last = None;
    for i in 0..(HISTORY_LIMIT + 20) {
        let state = store
            .apply_event(EventKind::ChangeApplied, 25, meta(&format!("f{i}.py")))
            .unwrap();
        assert!(state.history.len() <= HISTORY_LIMIT);
        last = Some(state);
    }

    let state = last.unwrap();
    assert_eq!(state.history.len(), HISTORY_LIMIT);
    // Newest change is on top
    let newest = format!("f{}.py", HISTORY_LIMIT + 19);
    assert_eq!(state.history[0].meta.get("file"), Some(&newest));
    // The very first events were dropped
    assert!(state
        .history
        .iter()
        .all(|e| e.meta.get("file").map(String::as_str) != Some("f0.py")));
}

#[test]
fn test_independent_events_commute_on_totals() {
    let a = memory_store();
    a.apply_event(EventKind::ChangeApplied, 10, meta("x")).unwrap();
    let a = a.apply_event(EventKind::BadgeAwarded, 0, meta("y")).unwrap();

    let b = memory_store();
    b.apply_event(EventKind::BadgeAwarded, 0, meta("y")).unwrap();
    let b = b.apply_event(EventKind::ChangeApplied, 10, meta("x")).unwrap();

    assert_eq!(a.xp, b.xp);
    assert_eq!(a.stats, b.stats);
    assert_ne!(a.history[0], b.history[0]);
}

#[test]
fn test_badge_evaluation_is_idempotent_on_store_state() {
    let store = memory_store();
    let mut state = store
        .apply_event(EventKind::ChangeApplied, 25, meta("a"))
        .unwrap();
    let before = state.clone();

    assert!(badge::evaluate(&mut state, Utc::now()).is_empty());
    assert_eq!(state, before);
}

#[test]
fn test_concurrent_apply_event_loses_nothing() {
    let store = Arc::new(memory_store());
    let threads = 8;
    let per_thread = 10;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..per_thread {
                    store
                        .apply_event(EventKind::ChangeApplied, 25, meta(&format!("{t}-{i}")))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let state = store.load().unwrap();
    let total = u64::try_from(threads * per_thread).unwrap();
    assert_eq!(state.xp, total * 25);
    assert_eq!(state.stat(STAT_SELF_IMPROVES), total);
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let first = ProgressionStore::new(Arc::new(FileStore::new(dir.path())));
    first
        .apply_event(EventKind::ChangeApplied, 25, meta("a"))
        .unwrap();

    let second = ProgressionStore::new(Arc::new(FileStore::new(dir.path())));
    let state = second.load().unwrap();
    assert_eq!(state.xp, 25);
    assert!(state.badges.contains("first_improve"));
}

proptest! {
    #[test]
    fn prop_level_is_monotonic(a in 0u64..2_000_000, b in 0u64..2_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_of(lo).level <= level_of(hi).level);
    }

    #[test]
    fn prop_next_level_is_above_xp(xp in 0u64..10_000_000) {
        let info = level_of(xp);
        prop_assert!(info.next_level_xp > xp);
        prop_assert!(info.level >= 1);
    }

    #[test]
    fn prop_totals_independent_of_order(deltas in proptest::collection::vec(0u64..500, 1..12)) {
        let forward = memory_store();
        for d in &deltas {
            forward.apply_event(EventKind::ChangeApplied, *d, BTreeMap::new()).unwrap();
        }
        let backward = memory_store();
        for d in deltas.iter().rev() {
            backward.apply_event(EventKind::ChangeApplied, *d, BTreeMap::new()).unwrap();
        }

        let f = forward.load().unwrap();
        let b = backward.load().unwrap();
        prop_assert_eq!(f.xp, b.xp);
        prop_assert_eq!(f.stats, b.stats);
        prop_assert_eq!(f.level, b.level);
    }
}
