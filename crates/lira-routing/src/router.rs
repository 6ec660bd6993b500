//! Keyword intent router
//!
//! Maps a free-text request to one target file. Rules are tried in table
//! order and the first match wins; there is no scoring across groups, so
//! the order of [`ROUTING_RULES`] decides every tie.

use crate::catalog::{FileCatalog, FileEntry};
use serde::{Deserialize, Serialize};

/// Path targeted when no rule matches
pub const DEFAULT_TARGET: &str = "lira_core/file_router.py";

/// Confidence reported for the default route
pub const DEFAULT_CONFIDENCE: f64 = 0.4;

/// Which rule produced a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteIntent {
    Style,
    SpeechToText,
    ImageGeneration,
    VoiceInteraction,
    Api,
    Memory,
    /// No rule matched
    Ambiguous,
}

/// A single keyword
#[derive(Debug, Clone, Copy)]
pub enum Keyword {
    /// Matches anywhere in the request
    Contains(&'static str),
    /// Matches a whole word only
    Word(&'static str),
}

impl Keyword {
    fn matches(self, text: &str, words: &[&str]) -> bool {
        match self {
            Self::Contains(k) => text.contains(k),
            Self::Word(k) => words.contains(&k),
        }
    }
}

/// One row of the routing table
#[derive(Debug, Clone, Copy)]
pub struct RoutingRule {
    pub intent: RouteIntent,
    /// At least one of these must appear
    pub any_of: &'static [Keyword],
    /// If non-empty, at least one of these must also appear
    pub and_any_of: &'static [Keyword],
    pub target: &'static str,
    pub confidence: f64,
    pub reasoning: &'static str,
}

impl RoutingRule {
    fn matches(&self, text: &str, words: &[&str]) -> bool {
        let hit = |set: &[Keyword]| set.iter().any(|k| k.matches(text, words));
        hit(self.any_of) && (self.and_any_of.is_empty() || hit(self.and_any_of))
    }
}

const STYLE: &[Keyword] = &[
    Keyword::Contains("layout"),
    Keyword::Contains("css"),
    Keyword::Contains("color"),
    Keyword::Contains("colour"),
    Keyword::Contains("style"),
    Keyword::Contains("estilo"),
    Keyword::Word("cor"),
    Keyword::Word("cores"),
];

const VOICE: &[Keyword] = &[
    Keyword::Contains("voz"),
    Keyword::Contains("fala"),
    Keyword::Contains("microfone"),
    Keyword::Contains("audio"),
    Keyword::Contains("áudio"),
];

const TRANSCRIPTION: &[Keyword] = &[
    Keyword::Word("stt"),
    Keyword::Contains("transcrever"),
    Keyword::Contains("transcri"),
];

const IMAGE: &[Keyword] = &[
    Keyword::Contains("image"),
    Keyword::Contains("imagem"),
    Keyword::Contains("foto"),
    Keyword::Contains("gerar"),
];

const API: &[Keyword] = &[
    Keyword::Contains("rota"),
    Keyword::Word("api"),
    Keyword::Contains("endpoint"),
];

const MEMORY: &[Keyword] = &[
    Keyword::Contains("memoria"),
    Keyword::Contains("memória"),
    Keyword::Contains("mapa"),
    Keyword::Contains("estrutura"),
];

/// The routing table, in priority order
///
/// Speech-to-text needs both a voice and a transcription keyword and sits
/// above image generation; generic voice requests sit below it, so
/// "gerar imagem com voz" routes to the image generator.
pub const ROUTING_RULES: &[RoutingRule] = &[
    RoutingRule {
        intent: RouteIntent::Style,
        any_of: STYLE,
        and_any_of: &[],
        target: "frontend/style.css",
        confidence: 0.9,
        reasoning: "Detected keywords related to styling/layout. Routing to CSS.",
    },
    RoutingRule {
        intent: RouteIntent::SpeechToText,
        any_of: VOICE,
        and_any_of: TRANSCRIPTION,
        target: "backend/stt_engine.py",
        confidence: 0.95,
        reasoning: "Detected Speech-to-Text keywords.",
    },
    RoutingRule {
        intent: RouteIntent::ImageGeneration,
        any_of: IMAGE,
        and_any_of: &[],
        target: "backend/image_generator.py",
        confidence: 0.95,
        reasoning: "Detected image generation keywords. Priority: backend generator.",
    },
    RoutingRule {
        intent: RouteIntent::VoiceInteraction,
        any_of: VOICE,
        and_any_of: &[],
        target: "frontend/app.js",
        confidence: 0.8,
        reasoning: "Detected generic voice/frontend interaction keywords.",
    },
    RoutingRule {
        intent: RouteIntent::Api,
        any_of: API,
        and_any_of: &[],
        target: "backend/server.py",
        confidence: 0.9,
        reasoning: "Detected API/Server routing keywords.",
    },
    RoutingRule {
        intent: RouteIntent::Memory,
        any_of: MEMORY,
        and_any_of: &[],
        target: "lira_core/memory_manager.py",
        confidence: 0.9,
        reasoning: "Detected meta-system keywords regarding the assistant's memory.",
    },
];

const AMBIGUOUS_REASONING: &str =
    "Request ambiguous. Routing to File Router logic for inspection or default.";

/// Outcome of routing a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    /// Target file; `None` means the route's path is not in the catalog
    pub file: Option<FileEntry>,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Human-readable rationale
    pub reasoning: String,
    /// Rule that fired
    pub intent: RouteIntent,
    /// Path the rule resolved to, present even when `file` is `None`
    pub target_path: String,
}

impl RoutingResult {
    /// Whether no rule matched and the default route was used
    #[inline]
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.intent == RouteIntent::Ambiguous
    }

    /// Whether the route resolved to a catalogued file
    #[inline]
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.file.is_some()
    }
}

/// Stateless keyword router
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentRouter;

impl IntentRouter {
    /// Create a router over [`ROUTING_RULES`]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rule that would fire for a request (catalog-independent)
    #[must_use]
    pub fn classify(&self, request: &str) -> Option<&'static RoutingRule> {
        let text = request.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        ROUTING_RULES.iter().find(|rule| rule.matches(&text, &words))
    }

    /// Route a request against a list of files
    #[must_use]
    pub fn route(&self, request: &str, files: &[FileEntry]) -> RoutingResult {
        let (intent, target, confidence, reasoning) = match self.classify(request) {
            Some(rule) => (rule.intent, rule.target, rule.confidence, rule.reasoning),
            None => (
                RouteIntent::Ambiguous,
                DEFAULT_TARGET,
                DEFAULT_CONFIDENCE,
                AMBIGUOUS_REASONING,
            ),
        };

        let file = files.iter().find(|f| f.path == target).cloned();
        if file.is_none() {
            tracing::warn!(target, "Routed path is not in the catalog");
        }
        tracing::debug!(?intent, target, confidence, "Request routed");

        RoutingResult {
            file,
            confidence,
            reasoning: reasoning.to_string(),
            intent,
            target_path: target.to_string(),
        }
    }

    /// Route a request against a catalog
    #[must_use]
    pub fn route_in(&self, request: &str, catalog: &dyn FileCatalog) -> RoutingResult {
        self.route(request, &catalog.list_files())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileKind;

    fn files() -> Vec<FileEntry> {
        [
            "frontend/app.js",
            "frontend/style.css",
            "backend/server.py",
            "backend/image_generator.py",
            "backend/stt_engine.py",
            "lira_core/memory_manager.py",
            "lira_core/file_router.py",
        ]
        .iter()
        .map(|p| FileEntry::new(*p, "", "", FileKind::infer(p)))
        .collect()
    }

    fn route(text: &str) -> RoutingResult {
        IntentRouter::new().route(text, &files())
    }

    #[test]
    fn style_request() {
        let r = route("mude a cor do botão");
        assert_eq!(r.target_path, "frontend/style.css");
        assert_eq!(r.confidence, 0.9);
        assert!(r.is_routable());
    }

    #[test]
    fn cor_is_word_matched() {
        // "corrigir" must not look like a colour request
        let r = route("corrigir a rota de login");
        assert_eq!(r.intent, RouteIntent::Api);
    }

    #[test]
    fn image_request() {
        let r = route("gerar uma imagem de um gato");
        assert_eq!(r.target_path, "backend/image_generator.py");
        assert_eq!(r.confidence, 0.95);
    }

    #[test]
    fn image_wins_over_generic_voice() {
        assert_eq!(route("gerar imagem com voz").intent, RouteIntent::ImageGeneration);
    }

    #[test]
    fn transcription_split() {
        let stt = route("transcrever o audio do microfone");
        assert_eq!(stt.target_path, "backend/stt_engine.py");
        assert_eq!(stt.confidence, 0.95);

        let voice = route("ativar a voz");
        assert_eq!(voice.target_path, "frontend/app.js");
        assert_eq!(voice.confidence, 0.8);
    }

    #[test]
    fn api_and_memory() {
        assert_eq!(route("novo endpoint de chat").target_path, "backend/server.py");
        assert_eq!(route("the API is slow").target_path, "backend/server.py");
        assert_eq!(route("atualizar o mapa do projeto").target_path, "lira_core/memory_manager.py");
    }

    #[test]
    fn default_route_is_ambiguous() {
        let r = route("faça algo");
        assert_eq!(r.target_path, DEFAULT_TARGET);
        assert_eq!(r.confidence, 0.4);
        assert!(r.is_ambiguous());
        assert!(r.reasoning.contains("ambiguous"));
    }

    #[test]
    fn missing_target_is_not_an_error() {
        let r = IntentRouter::new().route("mude o css", &[]);
        assert!(r.file.is_none());
        assert_eq!(r.confidence, 0.9);
        assert!(!r.reasoning.is_empty());
    }

    #[test]
    fn first_rule_wins_on_overlap() {
        // style is listed before api
        assert_eq!(route("css for the api page").intent, RouteIntent::Style);
    }
}
