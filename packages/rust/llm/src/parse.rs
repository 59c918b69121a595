//! Defensive parsing of model output.
//!
//! Small local models wrap JSON in prose, markdown fences or reasoning
//! blocks. These helpers recover the payload before giving up.

use serde_json::Value;

use postforge_shared::{PostforgeError, Result};

const THINK_START: &str = "<think>";
const THINK_END: &str = "</think>";

/// Split a `<think>...</think>` block off the content.
///
/// Returns `(reasoning, cleaned)`. Content without a complete block is
/// returned unchanged.
pub fn strip_thinking(text: &str) -> (Option<String>, String) {
    let (Some(start), Some(end)) = (text.find(THINK_START), text.find(THINK_END)) else {
        return (None, text.to_string());
    };
    if end < start {
        return (None, text.to_string());
    }

    let thinking = text[start + THINK_START.len()..end].trim().to_string();
    let mut cleaned = String::with_capacity(text.len());
    cleaned.push_str(&text[..start]);
    cleaned.push_str(&text[end + THINK_END.len()..]);

    let thinking = (!thinking.is_empty()).then_some(thinking);
    (thinking, cleaned.trim().to_string())
}

/// Parse model content as JSON, trying progressively looser extractions.
pub fn parse_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Ok(value);
        }
    }

    for slice in outer_slices(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(slice) {
            return Ok(value);
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(PostforgeError::MalformedResponse(format!(
        "content is not valid JSON: {preview}"
    )))
}

/// Body of the first ```json (or bare ```) fenced block.
fn fenced_block(text: &str) -> Option<&str> {
    for marker in ["```json", "```JSON", "```"] {
        if let Some(start) = text.find(marker) {
            let body_start = start + marker.len();
            let end = text[body_start..].find("```")?;
            return Some(text[body_start..body_start + end].trim());
        }
    }
    None
}

/// Slices from the first `{` to the last `}` and from the first `[` to the
/// last `]`, earliest opener first.
fn outer_slices(text: &str) -> Vec<&str> {
    let mut slices: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    slices.sort_by_key(|(start, _)| *start);
    slices.into_iter().map(|(_, slice)| slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let value = parse_json(r#"{"score": 8}"#).unwrap();
        assert_eq!(value["score"], 8);
    }

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"overview\": \"x\"}\n```\nEnjoy!";
        assert_eq!(parse_json(text).unwrap()["overview"], "x");
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let text = "Sure! {\"score\": 6, \"instructions\": \"tighten the hook\"} Hope that helps.";
        let value = parse_json(text).unwrap();
        assert_eq!(value["instructions"], "tighten the hook");
    }

    #[test]
    fn top_level_array_is_recovered() {
        let text = "points: [\"a\", \"b\"] done";
        assert_eq!(parse_json(text).unwrap()[1], "b");
    }

    #[test]
    fn bracket_in_prose_before_object_falls_back_to_braces() {
        let text = r#"Review (scale [0-10]): {"score": 6, "instructions": "add data"}"#;
        let value = parse_json(text).unwrap();
        assert_eq!(value["score"], 6);
        assert_eq!(value["instructions"], "add data");
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_json("I could not produce JSON, sorry.").unwrap_err();
        assert!(matches!(err, PostforgeError::MalformedResponse(_)));
    }

    #[test]
    fn strips_think_block() {
        let (thinking, cleaned) = strip_thinking("<think>plan it</think>\n{\"a\": 1}");
        assert_eq!(thinking.as_deref(), Some("plan it"));
        assert_eq!(cleaned, "{\"a\": 1}");

        let (thinking, cleaned) = strip_thinking("no reasoning here");
        assert!(thinking.is_none());
        assert_eq!(cleaned, "no reasoning here");
    }
}
