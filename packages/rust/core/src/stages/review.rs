use serde_json::Value;
use tracing::{info, instrument, warn};

use postforge_shared::{Persona, PostforgeError, Result, ReviewVerdict};

use super::StageRunner;
use crate::cancel::CancelFlag;
use crate::prompts;

const STAGE: &str = "review_post";

/// Used when the reviewer fails a post without saying why.
const FALLBACK_INSTRUCTIONS: &str = "The post did not reach the required score. Make it more \
specific to the persona: sharpen the opening hook, add concrete evidence and end with a \
clear call to action.";

/// Inputs to one Review Post call.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub post: String,
    pub persona: Persona,
    /// Minimum score for a pass, within `[0, 10]`.
    pub threshold: f64,
}

/// Reject thresholds outside the scoring range.
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && (0.0..=10.0).contains(&threshold) {
        Ok(())
    } else {
        Err(PostforgeError::input(format!(
            "threshold must be a number between 0 and 10, got {threshold}"
        )))
    }
}

impl StageRunner {
    /// Score a post against the persona.
    ///
    /// The model only scores; `passed` is decided here from the threshold.
    #[instrument(skip_all, fields(stage = STAGE, threshold = request.threshold))]
    pub async fn review_post(
        &self,
        request: &ReviewRequest,
        cancel: &CancelFlag,
    ) -> Result<ReviewVerdict> {
        validate_threshold(request.threshold)?;
        let post = request.post.trim();
        if post.is_empty() {
            return Err(PostforgeError::EmptyInput { stage: STAGE });
        }
        if request.persona.is_blank() {
            return Err(PostforgeError::MissingInput {
                stage: STAGE,
                field: "persona",
            });
        }

        let messages =
            prompts::review_messages(post, &request.persona.as_prompt_text(), request.threshold);
        let value = self
            .call(STAGE, self.request(messages, Some(prompts::review_schema())), cancel)
            .await?
            .into_json()?;

        let verdict = verdict_from(&value, request.threshold)?;
        info!(score = ?verdict.score, passed = verdict.passed, "post reviewed");
        Ok(verdict)
    }
}

fn verdict_from(value: &Value, threshold: f64) -> Result<ReviewVerdict> {
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .ok_or_else(|| PostforgeError::schema(STAGE, "`score` must be a number"))?;

    let instructions = value
        .get("instructions")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let passed = score >= threshold;
    let instructions = match (passed, instructions) {
        (false, None) => {
            warn!(score, "reviewer failed the post without instructions");
            Some(FALLBACK_INSTRUCTIONS.to_string())
        }
        (_, instructions) => instructions,
    };

    Ok(ReviewVerdict {
        passed,
        score: Some(score),
        instructions,
    })
}
