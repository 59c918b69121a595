use serde_json::Value;
use tracing::{info, instrument};

use postforge_shared::{PostforgeError, Result};

use super::StageRunner;
use crate::cancel::CancelFlag;
use crate::prompts;
use crate::validation::{SUBREDDITS_SHAPE, ValidationPolicy};

const STAGE: &str = "suggest_subreddits";

impl StageRunner {
    /// Suggest subreddits for `topic`, most relevant first.
    ///
    /// Names are normalized to `r/name`; duplicates and blank entries are
    /// dropped while keeping the model's order.
    #[instrument(skip_all, fields(stage = STAGE))]
    pub async fn suggest_subreddits(&self, topic: &str, cancel: &CancelFlag) -> Result<Vec<String>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PostforgeError::input("topic is required"));
        }

        let request = self.request(
            prompts::subreddit_messages(topic),
            Some(prompts::subreddits_schema()),
        );
        let value = self.call(STAGE, request, cancel).await?.into_json()?;
        SUBREDDITS_SHAPE.check(&value, ValidationPolicy::Strict)?;

        let mut subreddits: Vec<String> = Vec::new();
        for name in value["subreddits"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter_map(normalize_subreddit)
        {
            if !subreddits.iter().any(|s| s.eq_ignore_ascii_case(&name)) {
                subreddits.push(name);
            }
        }

        info!(count = subreddits.len(), "subreddits suggested");
        Ok(subreddits)
    }
}

/// `"/r/Rust "`, `"r/Rust"` and `"Rust"` all become `"r/Rust"`.
fn normalize_subreddit(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('/');
    let name = name
        .strip_prefix("r/")
        .or_else(|| name.strip_prefix("R/"))
        .unwrap_or(name)
        .trim_matches('/')
        .trim();
    (!name.is_empty() && !name.contains(char::is_whitespace)).then(|| format!("r/{name}"))
}
