//! Learning-mode knowledge base
//!
//! Short tip lists appended to a fallback explanation, chosen by file
//! extension and by keywords in the goal.

use crate::request::ChangeRequest;

/// A titled list of tips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipSet {
    /// Heading shown above the tips
    pub title: &'static str,
    /// Bullet points
    pub tips: &'static [&'static str],
}

const PYTHON: TipSet = TipSet {
    title: "Python tips:",
    tips: &[
        "Use type hints for readability",
        "PEP8 is the official style guide",
        "Consider dataclasses for simple structures",
    ],
};

const JAVASCRIPT: TipSet = TipSet {
    title: "JavaScript/TypeScript tips:",
    tips: &[
        "Use async/await for asynchronous operations",
        "Consider arrow functions for callbacks",
        "TypeScript adds type safety",
    ],
};

const CSS: TipSet = TipSet {
    title: "CSS tips:",
    tips: &[
        "Prefer classes over element selectors",
        "Keep colours in custom properties",
        "Design mobile-first with min-width media queries",
    ],
};

const ERRORS: TipSet = TipSet {
    title: "Error handling practices:",
    tips: &[
        "Catch specific exceptions when possible",
        "Give error messages that help the reader",
        "Log failures for debugging",
    ],
};

const TESTING: TipSet = TipSet {
    title: "Testing practices:",
    tips: &[
        "Test one behaviour per case",
        "Cover edge cases and failure paths",
        "Keep tests independent of execution order",
    ],
};

const PERFORMANCE: TipSet = TipSet {
    title: "Performance practices:",
    tips: &[
        "Measure before optimising",
        "Avoid repeated work inside loops",
        "Cache results of expensive pure computations",
    ],
};

/// Tip sets relevant to a request, extension first
#[must_use]
pub fn tips_for(request: &ChangeRequest) -> Vec<TipSet> {
    let mut sets = Vec::new();
    match request.extension().as_deref() {
        Some("py") => sets.push(PYTHON),
        Some("js" | "ts") => sets.push(JAVASCRIPT),
        Some("css") => sets.push(CSS),
        _ => {}
    }
    for (keyword, set) in [("error", ERRORS), ("test", TESTING), ("performance", PERFORMANCE)] {
        if request.goal_mentions(keyword) {
            sets.push(set);
        }
    }
    sets
}

/// Append relevant tips to an explanation
#[must_use]
pub fn enhance_explanation(base: &str, request: &ChangeRequest) -> String {
    let mut enhanced = base.to_string();
    for set in tips_for(request) {
        enhanced.push_str("\n\n");
        enhanced.push_str(set.title);
        for tip in set.tips {
            enhanced.push_str("\n- ");
            enhanced.push_str(tip);
        }
    }
    enhanced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_error_goal_gets_both_sets() {
        let req = ChangeRequest::new("a.py", "", "add error handling");
        let titles: Vec<_> = tips_for(&req).iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Python tips:", "Error handling practices:"]);
    }

    #[test]
    fn unknown_extension_without_keywords_is_unchanged() {
        let req = ChangeRequest::new("README.md", "", "rewrite intro");
        assert_eq!(enhance_explanation("base", &req), "base");
    }

    #[test]
    fn tips_render_as_bullets() {
        let req = ChangeRequest::new("style.css", "", "speed up: performance");
        let text = enhance_explanation("Done.", &req);
        assert!(text.starts_with("Done.\n\nCSS tips:\n- Prefer classes"));
        assert!(text.contains("Performance practices:\n- Measure before optimising"));
    }
}
