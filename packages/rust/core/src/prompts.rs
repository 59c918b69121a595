//! Prompt text and response schemas for each stage.

use serde_json::{Value, json};

use postforge_llm::{ChatMessage, ResponseSchema};
use postforge_shared::Summary;

const SUMMARIZER_SYSTEM: &str = "You are an expert summarizer. Distill the text you are given \
into a concise, accurate summary that captures the main ideas, key arguments and essential \
details, written so that someone unfamiliar with the source can grasp it quickly.";

const PERSONA_SYSTEM: &str = "You are an expert in building detailed, accurate target audience \
personas from content summaries. Describe the single reader who would get the most out of \
the content.";

const WRITER_SYSTEM: &str = "You are a social media strategist who writes LinkedIn posts that \
build professional visibility. Write in a confident, professional tone, include relevant \
industry insight and end with a clear call to action (default: asking readers to follow).";

const REVIEWER_SYSTEM: &str = "You are a demanding LinkedIn editor. Score a post from 0 to 10 \
for how well it would land with the given audience persona, and explain concretely what must \
change to improve it.";

const SUBREDDIT_SYSTEM: &str = "You know Reddit inside out. Given a topic, name the active \
subreddits where people discuss it, most relevant first.";

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {label}\n{content}")
}

/// Render a summary as prompt text.
pub fn summary_text(summary: &Summary) -> String {
    format!(
        "Overview: {}\n\nKey Points:\n{}\n\nConclusion: {}",
        summary.overview,
        numbered_list(&summary.key_points),
        summary.conclusion
    )
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

fn string_array() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

pub fn summary_schema() -> ResponseSchema {
    ResponseSchema::new(
        "summary",
        json!({
            "type": "object",
            "properties": {
                "overview": {"type": "string"},
                "keyPoints": string_array(),
                "conclusion": {"type": "string"},
            },
            "required": ["overview", "keyPoints", "conclusion"],
        }),
    )
}

pub fn persona_schema() -> ResponseSchema {
    ResponseSchema::new(
        "persona",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"},
                "gender": {"type": "string"},
                "interests": string_array(),
                "behaviors": string_array(),
                "painPoints": string_array(),
                "goals": string_array(),
                "challenges": string_array(),
                "preferredChannels": string_array(),
            },
            "required": [
                "name", "age", "gender", "interests", "behaviors",
                "painPoints", "goals", "challenges", "preferredChannels"
            ],
        }),
    )
}

pub fn review_schema() -> ResponseSchema {
    ResponseSchema::new(
        "review",
        json!({
            "type": "object",
            "properties": {
                "score": {"type": "number", "minimum": 0, "maximum": 10},
                "instructions": {"type": "string"},
            },
            "required": ["score", "instructions"],
        }),
    )
}

pub fn subreddits_schema() -> ResponseSchema {
    ResponseSchema::new(
        "subreddits",
        json!({
            "type": "object",
            "properties": {"subreddits": string_array()},
            "required": ["subreddits"],
        }),
    )
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub fn summarize_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARIZER_SYSTEM),
        ChatMessage::user(format!(
            "Summarize this blog post. Give an overview, at least five key points and a \
             conclusion.\n\n{}",
            section("Blog post", text)
        )),
    ]
}

pub fn persona_messages(source: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PERSONA_SYSTEM),
        ChatMessage::user(format!(
            "{}\n\nAnalyze the content above and create a comprehensive persona.",
            section("Content", source)
        )),
        ChatMessage::user("Return only JSON with well-structured persona details."),
    ]
}

/// Draft prompt; `correction` carries review feedback and the rejected draft.
pub fn draft_messages(
    summary: &str,
    persona: &str,
    correction: Option<(&str, Option<&str>)>,
) -> Vec<ChatMessage> {
    let mut prompt = format!(
        "Write a LinkedIn post based on the blog below, tailored to the target persona.\n\n{}\n\n{}",
        section("Target persona", persona),
        section("Blog", summary),
    );

    if let Some((instructions, previous)) = correction {
        if let Some(previous) = previous {
            prompt.push_str("\n\n");
            prompt.push_str(&section("Previous draft", previous));
        }
        prompt.push_str("\n\n");
        prompt.push_str(&section("Reviewer instructions", instructions));
        prompt.push_str("\n\nRewrite the post so it addresses every instruction.");
    }

    vec![
        ChatMessage::system(WRITER_SYSTEM),
        ChatMessage::user(prompt),
        ChatMessage::user("Only give me the post text, do not write anything else."),
    ]
}

pub fn review_messages(post: &str, persona: &str, threshold: f64) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(REVIEWER_SYSTEM),
        ChatMessage::user(format!(
            "{}\n\n{}\n\nA post needs a score of at least {threshold} to be published. Respond \
             with JSON: {{\"score\": number, \"instructions\": string}}.",
            section("Target persona", persona),
            section("Post", post),
        )),
    ]
}

pub fn subreddit_messages(topic: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUBREDDIT_SYSTEM),
        ChatMessage::user(format!(
            "List the subreddits related to this topic, written as \"r/name\", in order of \
             relevance. Respond with JSON: {{\"subreddits\": [string]}}.\n\n{}",
            section("Topic", topic)
        )),
    ]
}
