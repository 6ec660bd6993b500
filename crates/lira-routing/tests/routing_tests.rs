use lira_routing::{
    FileCatalog, FileEntry, FileKind, InMemoryCatalog, IntentRouter, RouteIntent, DEFAULT_TARGET,
    ROUTING_RULES,
};
use proptest::prelude::*;

fn catalog() -> InMemoryCatalog {
    let paths = [
        "frontend/app.js",
        "frontend/style.css",
        "backend/server.py",
        "backend/image_generator.py",
        "backend/stt_engine.py",
        "lira_core/memory_manager.py",
        "lira_core/file_router.py",
    ];
    InMemoryCatalog::new(
        paths
            .iter()
            .map(|p| FileEntry::new(*p, "", "", FileKind::infer(p)))
            .collect(),
    )
}

#[test]
fn test_every_rule_target_is_in_demo_catalog() {
    let catalog = catalog();
    for rule in ROUTING_RULES {
        assert!(catalog.get_file(rule.target).is_some(), "{}", rule.target);
    }
    assert!(catalog.get_file(DEFAULT_TARGET).is_some());
}

#[test]
fn test_routing_is_case_insensitive() {
    let router = IntentRouter::new();
    let catalog = catalog();
    let lower = router.route_in("mude o layout", &catalog);
    let upper = router.route_in("MUDE O LAYOUT", &catalog);
    assert_eq!(lower, upper);
    assert_eq!(upper.intent, RouteIntent::Style);
}

#[test]
fn test_accented_keywords() {
    let router = IntentRouter::new();
    let catalog = catalog();
    assert_eq!(router.route_in("limpar a memória", &catalog).intent, RouteIntent::Memory);
    assert_eq!(router.route_in("melhorar o áudio", &catalog).intent, RouteIntent::VoiceInteraction);
}

#[test]
fn test_route_sees_catalog_updates() {
    let router = IntentRouter::new();
    let catalog = catalog();
    catalog.update_content("frontend/style.css", "body {}").unwrap();
    let result = router.route_in("css", &catalog);
    assert_eq!(result.file.unwrap().content, "body {}");
}

proptest! {
    #[test]
    fn routing_is_total_and_deterministic(request in "\\PC{0,60}") {
        let router = IntentRouter::new();
        let catalog = catalog();
        let first = router.route_in(&request, &catalog);
        let second = router.route_in(&request, &catalog);

        prop_assert_eq!(&first, &second);
        prop_assert!((0.0..=1.0).contains(&first.confidence));
        prop_assert!(!first.reasoning.is_empty());
        let file = first.file.as_ref().expect("every route targets a demo file");
        prop_assert_eq!(&file.path, &first.target_path);
    }

    #[test]
    fn ambiguous_only_for_default_target(request in "[a-z ]{0,40}") {
        let result = IntentRouter::new().route_in(&request, &catalog());
        prop_assert_eq!(result.is_ambiguous(), result.target_path == DEFAULT_TARGET);
    }
}
