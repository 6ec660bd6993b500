//! Deterministic local rewrites
//!
//! Used whenever the remote path is unavailable or fails. The rewrites are
//! purely textual: the output is not guaranteed to parse, but producing it
//! never fails.

use crate::request::{ChangeRequest, ChangeResult, GenerationSource};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Always attached to a fallback result
pub const FALLBACK_WARNING: &str =
    "Simulated change from the local fallback. Configure a remote API key for better results.";

/// Attached to a fallback result in learning mode
pub const LEARNING_WARNING: &str =
    "Learning notes come from the built-in knowledge base, not from a review of this code.";

static PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"def (\w+)\([^)]*\):").expect("valid regex"));

static JS_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function (\w+)\(([^)]*)\)").expect("valid regex"));

/// Source of strictly increasing placeholder suffixes
///
/// Suffixes follow wall-clock milliseconds but never repeat, even for two
/// calls within the same millisecond.
#[derive(Debug, Default)]
pub struct SuffixSequence {
    last: AtomicU64,
}

impl SuffixSequence {
    /// Create a sequence starting from zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next suffix, at least `now_millis` and above every previous one
    pub fn next(&self, now_millis: u64) -> u64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_millis.max(current.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Rewrite a request's content without a model
#[must_use]
pub fn generate(request: &ChangeRequest, suffix: u64, now: DateTime<Utc>) -> ChangeResult {
    let extension = request.extension();
    let ext = extension.as_deref();

    let (updated_content, explanation) = if ext == Some("py") && request.goal_mentions("error handling") {
        (
            wrap_python_errors(&request.current_content),
            "Added basic error handling with try/except.".to_string(),
        )
    } else if matches!(ext, Some("js" | "ts")) && request.goal_mentions("typescript") {
        (
            JS_FUNCTION
                .replace_all(&request.current_content, "function ${1}(${2}): any")
                .into_owned(),
            "Added basic type annotations for a TypeScript migration.".to_string(),
        )
    } else {
        let mut content = request.current_content.clone();
        content.push_str(&patch_block(ext, &request.goal, suffix, now));
        (
            content,
            "Appended a placeholder patch. Describe the kind of refactor you want for a more specific change."
                .to_string(),
        )
    };

    tracing::debug!(path = %request.file_path, suffix, "Fallback rewrite produced");

    ChangeResult {
        updated_content,
        explanation: Some(explanation),
        warnings: vec![FALLBACK_WARNING.to_string()],
        success: true,
        source: GenerationSource::Fallback,
    }
}

fn wrap_python_errors(content: &str) -> String {
    let name = PY_DEF
        .captures_iter(content)
        .last()
        .and_then(|c| c.get(1))
        .map_or("patched code", |m| m.as_str())
        .to_string();

    let mut out = PY_DEF
        .replace_all(content, "def ${1}(*args, **kwargs):\n    try:")
        .into_owned();
    out.push_str("\n    except Exception as e:\n");
    out.push_str(&format!("        print(f\"Error in {name}: {{e}}\")\n"));
    out.push_str("        raise");
    out
}

fn one_line(goal: &str) -> String {
    goal.split(['\r', '\n']).map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Comment block and placeholder appended by the generic fallback
#[must_use]
pub fn patch_block(extension: Option<&str>, goal: &str, suffix: u64, now: DateTime<Utc>) -> String {
    let goal = one_line(goal);
    let stamp = now.to_rfc3339();

    match extension {
        Some("py") => format!(
            "\n\n# PATCH APPLIED: {stamp}\n# Intent: {goal}\ndef patch_update_{suffix}():\n    \"\"\"\n    Auto-generated patch based on user request.\n    \"\"\"\n    pass\n"
        ),
        Some("js" | "ts") => {
            let quoted = goal.replace('\\', "\\\\").replace('"', "\\\"");
            format!(
                "\n\n// PATCH APPLIED: {stamp}\n// Intent: {goal}\nfunction patchUpdate{suffix}() {{\n    console.log(\"Patch applied for: {quoted}\");\n}}\n"
            )
        }
        Some("rs") => format!(
            "\n\n// PATCH APPLIED: {stamp}\n// Intent: {goal}\n#[allow(dead_code)]\nfn patch_update_{suffix}() {{}}\n"
        ),
        Some("css") => {
            let goal = goal.replace("*/", "* /");
            format!(
                "\n\n/* PATCH APPLIED: {stamp} - {goal} */\n.patched-class-{suffix} {{\n    /* Styles added */\n    visibility: visible;\n}}\n"
            )
        }
        Some("sh" | "toml" | "yaml" | "yml") => {
            format!("\n\n# PATCH APPLIED: {stamp}\n# Intent: {goal}\n")
        }
        _ => {
            let goal = goal.replace("--", "- -");
            format!("\n\n<!-- PATCH APPLIED: {stamp} - {goal} -->\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn python_error_handling() {
        let req = ChangeRequest::new("backend/server.py", "def handle(req):\n    return 1", "Add error handling");
        let result = generate(&req, 7, now());

        assert_eq!(
            result.updated_content,
            "def handle(*args, **kwargs):\n    try:\n    return 1\n    except Exception as e:\n        print(f\"Error in handle: {e}\")\n        raise"
        );
        assert_eq!(result.warnings, vec![FALLBACK_WARNING.to_string()]);
        assert!(result.is_fallback());
    }

    #[test]
    fn python_without_defs_still_appends_handler() {
        let req = ChangeRequest::new("a.py", "x = 1", "error handling please");
        let result = generate(&req, 1, now());
        assert!(result.updated_content.starts_with("x = 1\n    except Exception as e:"));
        assert!(result.updated_content.contains("Error in patched code"));
    }

    #[test]
    fn typescript_annotations() {
        let req = ChangeRequest::new("frontend/app.js", "function send(msg, to) {}", "migrate to TypeScript");
        let result = generate(&req, 1, now());
        assert_eq!(result.updated_content, "function send(msg, to): any {}");
    }

    #[test]
    fn typescript_goal_on_python_appends_block() {
        let req = ChangeRequest::new("a.py", "x = 1", "typescript");
        let result = generate(&req, 42, now());
        assert!(result.updated_content.contains("def patch_update_42():"));
    }

    #[test]
    fn blocks_per_extension() {
        let goal = "tidy up";
        assert!(patch_block(Some("py"), goal, 3, now()).contains("# Intent: tidy up\ndef patch_update_3():"));
        assert!(patch_block(Some("ts"), goal, 3, now()).contains("function patchUpdate3()"));
        assert!(patch_block(Some("rs"), goal, 3, now()).contains("fn patch_update_3() {}"));
        assert!(patch_block(Some("css"), goal, 3, now()).contains(".patched-class-3 {"));
        assert!(patch_block(Some("toml"), goal, 3, now()).starts_with("\n\n# PATCH APPLIED: 2024-05-01T12:00:00+00:00"));
        assert_eq!(
            patch_block(Some("md"), goal, 3, now()),
            "\n\n<!-- PATCH APPLIED: 2024-05-01T12:00:00+00:00 - tidy up -->\n"
        );
        assert!(patch_block(None, goal, 3, now()).contains("<!--"));
    }

    #[test]
    fn goal_cannot_break_out_of_comment() {
        let block = patch_block(Some("css"), "a */ b\nc", 1, now());
        assert!(block.contains("a * / b c"));
        let js = patch_block(Some("js"), "say \"hi\"", 1, now());
        assert!(js.contains("Patch applied for: say \\\"hi\\\""));
    }

    #[test]
    fn suffixes_strictly_increase() {
        let seq = SuffixSequence::new();
        assert_eq!(seq.next(1000), 1000);
        assert_eq!(seq.next(1000), 1001);
        assert_eq!(seq.next(500), 1002);
        assert_eq!(seq.next(5000), 5000);
    }
}
