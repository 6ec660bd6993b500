use chrono::Utc;
use lira_patch::fallback::{self, SuffixSequence, FALLBACK_WARNING};
use lira_patch::ChangeRequest;
use proptest::prelude::*;

fn appending_extension() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("css"), Just("rs"), Just("md"), Just("toml"), Just("html")]
}

proptest! {
    #[test]
    fn prop_fallback_keeps_existing_content(
        content in "[a-zA-Z0-9 {};:\n]{0,200}",
        goal in "[a-zA-Z \n]{1,40}",
        ext in appending_extension(),
    ) {
        let request = ChangeRequest::new(format!("frontend/file.{ext}"), content.clone(), goal);
        let result = fallback::generate(&request, 7, Utc::now());

        prop_assert!(result.success);
        prop_assert!(result.is_fallback());
        prop_assert!(result.updated_content.starts_with(&content));
        prop_assert!(result.updated_content.len() > content.len());
        prop_assert_eq!(result.warnings, vec![FALLBACK_WARNING.to_string()]);
    }

    #[test]
    fn prop_goal_stays_on_one_line(goal in "[a-z]{1,10}(\n[a-z]{1,10}){0,3}") {
        let block = fallback::patch_block(Some("py"), &goal, 1, Utc::now());
        let intent = block
            .lines()
            .find(|line| line.starts_with("# Intent: "))
            .expect("python block names the intent");
        let words: Vec<&str> = goal.split('\n').collect();
        prop_assert_eq!(intent, format!("# Intent: {}", words.join(" ")));
    }

    #[test]
    fn prop_suffixes_never_repeat(clock in prop::collection::vec(0u64..5_000, 1..50)) {
        let sequence = SuffixSequence::new();
        let mut last = None;
        for now in clock {
            let next = sequence.next(now);
            prop_assert!(next >= now);
            if let Some(previous) = last {
                prop_assert!(next > previous);
            }
            last = Some(next);
        }
    }
}
