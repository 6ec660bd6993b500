//! Prompt construction and response interpretation

use crate::error::RemoteError;
use crate::request::ChangeRequest;
use serde::Deserialize;
use std::fmt::Write as _;

/// Style rules given to the model for a file extension
#[must_use]
pub fn language_rules(extension: Option<&str>) -> &'static str {
    match extension {
        Some("py") => "PEP8, type hints, docstrings",
        Some("js") => "ES6+, JSDoc comments",
        Some("ts") => "TypeScript best practices, strict typing",
        Some("css") => "BEM methodology, responsive design",
        Some("rs") => "idiomatic Rust, rustfmt formatting, no panics in library code",
        _ => "best practices",
    }
}

/// Build the refactoring prompt for a request
#[must_use]
pub fn build_prompt(request: &ChangeRequest) -> String {
    let extension = request.extension();
    let language = extension.as_deref().map_or_else(|| "TEXT".to_string(), str::to_uppercase);
    let rules = language_rules(extension.as_deref());

    let mut prompt = String::with_capacity(request.current_content.len() + 1024);
    prompt.push_str("You are a senior software engineer specialised in refactoring.\n\n");
    prompt.push_str("TASK: Rewrite the code below to meet the goal while following best practices.\n\n");
    let _ = writeln!(prompt, "FILE: {}", request.file_path);
    let _ = writeln!(prompt, "LANGUAGE: {language}");
    if let Some(kind) = request.kind {
        let _ = writeln!(prompt, "TYPE: {kind}");
    }
    if let Some(description) = request.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(prompt, "DESCRIPTION: {description}");
    }
    let _ = writeln!(prompt, "GOAL: {}", request.goal);
    let _ = writeln!(prompt, "RULES: {rules}");
    prompt.push_str("\nCURRENT CODE:\n");
    prompt.push_str(&request.current_content);
    prompt.push_str("\n\nINSTRUCTIONS:\n");
    prompt.push_str("1. Keep existing functionality\n");
    prompt.push_str("2. Follow the language's conventions\n");
    prompt.push_str("3. Improve readability and maintainability\n");
    prompt.push_str("4. Add comments where needed\n");

    if request.learning_mode {
        prompt.push_str("5. Explain the changes in detail\n\n");
        prompt.push_str("ANSWER AS JSON:\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"updatedContent\": \"the complete rewritten file\",\n");
        prompt.push_str("  \"explanation\": \"detailed explanation of the changes\",\n");
        prompt.push_str("  \"warnings\": [\"caveats, if any\"]\n");
        prompt.push('}');
    } else {
        prompt.push_str("\nRETURN ONLY THE COMPLETE REWRITTEN FILE, WITHOUT MARKDOWN.");
    }
    prompt
}

/// Remove markdown code fence lines
///
/// Models often wrap code in ```` ```lang ```` blocks even when told not to.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    text.trim()
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structured answer requested in learning mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    /// Full rewritten file
    #[serde(rename = "updatedContent")]
    pub updated_content: String,
    /// Explanation of the changes
    #[serde(default)]
    pub explanation: Option<String>,
    /// Caveats
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Parse a learning-mode answer, fenced or bare
///
/// # Errors
/// Returns error if no JSON object with a non-empty `updatedContent` can be
/// found
pub fn parse_envelope(text: &str) -> Result<Envelope, RemoteError> {
    let unfenced = strip_fences(text);
    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => return Err(RemoteError::InvalidResponse("no JSON object in response".to_string())),
    };

    let envelope: Envelope =
        serde_json::from_str(json).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    if envelope.updated_content.trim().is_empty() {
        return Err(RemoteError::InvalidResponse("empty updatedContent".to_string()));
    }
    Ok(envelope)
}

/// Interpret a plain (non-learning) answer as file content
///
/// # Errors
/// Returns [`RemoteError::EmptyResponse`] if nothing remains after removing
/// fences
pub fn parse_plain(text: &str) -> Result<String, RemoteError> {
    let content = strip_fences(text);
    if content.trim().is_empty() {
        return Err(RemoteError::EmptyResponse);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lira_routing::FileKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_carries_context() {
        let req = ChangeRequest::new("backend/server.py", "app = 1", "add logging")
            .with_kind(FileKind::Backend)
            .with_description("HTTP routes");
        let prompt = build_prompt(&req);

        assert!(prompt.contains("FILE: backend/server.py"));
        assert!(prompt.contains("LANGUAGE: PY"));
        assert!(prompt.contains("TYPE: backend"));
        assert!(prompt.contains("DESCRIPTION: HTTP routes"));
        assert!(prompt.contains("RULES: PEP8, type hints, docstrings"));
        assert!(prompt.contains("app = 1"));
        assert!(prompt.contains("RETURN ONLY"));
        assert!(!prompt.contains("updatedContent"));
    }

    #[test]
    fn learning_prompt_asks_for_envelope() {
        let req = ChangeRequest::new("a.css", "", "dark mode").with_learning_mode(true);
        let prompt = build_prompt(&req);
        assert!(prompt.contains("\"updatedContent\""));
        assert!(prompt.contains("BEM methodology"));
    }

    #[test]
    fn fences_removed() {
        let raw = "```python\nprint('a')\nprint('b')\n```\n";
        assert_eq!(strip_fences(raw), "print('a')\nprint('b')");
        assert_eq!(strip_fences("x = 1"), "x = 1");
    }

    #[test]
    fn envelope_fenced_and_bare() {
        let bare = r#"{"updatedContent": "x = 2", "explanation": "bumped", "warnings": ["w"]}"#;
        let fenced = format!("Here you go:\n```json\n{bare}\n```");

        for text in [bare.to_string(), fenced] {
            let env = parse_envelope(&text).unwrap();
            assert_eq!(env.updated_content, "x = 2");
            assert_eq!(env.explanation.as_deref(), Some("bumped"));
            assert_eq!(env.warnings, vec!["w".to_string()]);
        }
    }

    #[test]
    fn envelope_rejects_garbage() {
        assert!(parse_envelope("just code").is_err());
        assert!(parse_envelope(r#"{"explanation": "no content"}"#).is_err());
        assert!(parse_envelope(r#"{"updatedContent": "  "}"#).is_err());
    }

    #[test]
    fn plain_rejects_empty() {
        assert_eq!(parse_plain("```\n```"), Err(RemoteError::EmptyResponse));
        assert_eq!(parse_plain("```js\nlet a;\n```").unwrap(), "let a;");
    }
}
