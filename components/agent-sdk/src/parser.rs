//! Extraction of fenced blocks and JSON payloads from model output.
//!
//! The only structured envelope the loop recognises is a three-backtick
//! fenced block, optionally tagged with a language token right after the
//! opening fence:
//!
//! ````text
//! ```json
//! {"use": "tool"}
//! ```
//! ````
//!
//! Both functions are pure: parsing the same text twice yields the same result.

use crate::error::ParseError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+\-]*)[ \t]*\r?\n(?:[ \t]*\r?\n)*(.*?)```") {
        Ok(regex) => regex,
        Err(e) => panic!("fenced block pattern should be valid at compile time: {e}"),
    }
});

/// Returns the bodies of every fenced block tagged `language`, in document order.
///
/// Tags compare case-insensitively. Unterminated blocks are ignored.
///
/// # Example
///
/// ```
/// use agent_sdk::parser::extract_fenced_blocks;
///
/// let text = "Here:\n```python\nprint(1)\n```\nand\n```python\nprint(2)\n```";
/// assert_eq!(extract_fenced_blocks(text, "python"), vec!["print(1)", "print(2)"]);
/// ```
#[must_use]
pub fn extract_fenced_blocks(text: &str, language: &str) -> Vec<String> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter(|caps| {
            caps.get(1)
                .is_some_and(|tag| tag.as_str().eq_ignore_ascii_case(language))
        })
        .filter_map(|caps| caps.get(2))
        .map(|body| body.as_str().trim_end_matches(['\n', '\r']).to_string())
        .collect()
}

/// Returns the first `json` fenced block that deserializes.
///
/// # Errors
///
/// Returns [`ParseError::NoJsonBlock`] when the text has no `json` block and
/// [`ParseError::InvalidJson`] when none of the candidates parse. Callers must
/// treat both as a reason to ask the model again, never as a default decision.
pub fn extract_single_json(text: &str) -> Result<Value, ParseError> {
    let candidates = extract_fenced_blocks(text, "json");
    if candidates.is_empty() {
        return Err(ParseError::NoJsonBlock);
    }

    let mut last_error = String::new();
    for candidate in &candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ParseError::InvalidJson(last_error))
}
