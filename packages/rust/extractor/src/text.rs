//! Plain-text extraction from parsed HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as article content.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Containers tried, in order, when no configured selector matches.
const FALLBACK_SELECTORS: &[&str] = &["article", "main", "body"];

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Visible text of an element, skipping script/style content.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

/// Concatenated text of every element matching `selector`, in document order.
pub fn selected_text(doc: &Html, selector: &Selector) -> String {
    let parts: Vec<String> = doc
        .select(selector)
        .map(visible_text)
        .filter(|t| !t.is_empty())
        .collect();
    parts.join(" ")
}

/// Text of the first non-empty fallback container.
pub fn fallback_text(doc: &Html) -> String {
    for sel_str in FALLBACK_SELECTORS {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(text) = doc
                .select(&selector)
                .map(visible_text)
                .find(|t| !t.is_empty())
            {
                return text;
            }
        }
    }
    String::new()
}

/// Best-effort article text: configured selector first, then fallbacks.
///
/// Returns `None` when the document has no visible text at all.
pub fn extract_text(html: &str, selector: Option<&Selector>) -> Option<String> {
    let doc = Html::parse_document(html);

    let text = selector
        .map(|sel| selected_text(&doc, sel))
        .unwrap_or_default();
    let text = if text.is_empty() {
        fallback_text(&doc)
    } else {
        text
    };

    (!text.is_empty()).then_some(text)
}
