use tracing::{info, instrument};

use postforge_shared::{PLACEHOLDER_TEXT, PostforgeError, Result, Summary};

use super::{StageRunner, truncate_chars};
use crate::cancel::CancelFlag;
use crate::prompts;
use crate::validation::{SUMMARY_SHAPE, ValidationPolicy};

const STAGE: &str = "summarize";

impl StageRunner {
    /// Summarize document text into overview, key points and conclusion.
    ///
    /// The reply is validated strictly whatever the backend claims about
    /// schema conformance, so a returned `Summary` is always complete.
    #[instrument(skip_all, fields(stage = STAGE, chars = text.len()))]
    pub async fn summarize(&self, text: &str, cancel: &CancelFlag) -> Result<Summary> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case(PLACEHOLDER_TEXT) {
            return Err(PostforgeError::EmptyInput { stage: STAGE });
        }

        let text = truncate_chars(text, self.config.max_input_chars);
        let request = self.request(
            prompts::summarize_messages(&text),
            Some(prompts::summary_schema()),
        );
        let value = self.call(STAGE, request, cancel).await?.into_json()?;

        SUMMARY_SHAPE.check(&value, ValidationPolicy::Strict)?;
        let summary: Summary =
            serde_json::from_value(value).map_err(|e| PostforgeError::schema(STAGE, e.to_string()))?;

        info!(key_points = summary.key_points.len(), "summary produced");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use postforge_llm::ModelReply;
    use postforge_shared::PipelineConfig;
    use serde_json::json;

    use super::*;
    use crate::test_support::{ScriptedInvoker, summary_json, test_config};

    fn runner(replies: Vec<ModelReply>) -> (StageRunner, Arc<ScriptedInvoker>) {
        let invoker = Arc::new(ScriptedInvoker::new(replies));
        (StageRunner::new(invoker.clone(), test_config()), invoker)
    }

    #[tokio::test]
    async fn produces_complete_summary() {
        let (runner, invoker) = runner(vec![ModelReply::Json(summary_json())]);
        let summary = runner
            .summarize("Rust makes systems programming safer.", &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(summary.overview, "Rust in production");
        assert_eq!(summary.key_points.len(), 5);
        assert!(!summary.conclusion.is_empty());

        let requests = invoker.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].response_schema.is_some());
        assert!(requests[0].user_content().contains("systems programming safer"));
    }

    #[tokio::test]
    async fn blank_and_placeholder_input_are_empty() {
        let (runner, invoker) = runner(vec![]);
        for input in ["", "   \n", "No content extracted"] {
            let err = runner.summarize(input, &CancelFlag::new()).await.unwrap_err();
            assert!(matches!(err, PostforgeError::EmptyInput { stage: "summarize" }));
        }
        assert_eq!(invoker.calls(), 0);
    }

    #[tokio::test]
    async fn missing_field_is_schema_violation() {
        let (runner, _) = runner(vec![ModelReply::Json(
            json!({"overview": "o", "keyPoints": ["a"]}),
        )]);
        let err = runner.summarize("text", &CancelFlag::new()).await.unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[tokio::test]
    async fn key_points_must_be_array() {
        let (runner, _) = runner(vec![ModelReply::Json(
            json!({"overview": "o", "keyPoints": "a; b", "conclusion": "c"}),
        )]);
        let err = runner.summarize("text", &CancelFlag::new()).await.unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[tokio::test]
    async fn text_reply_is_recovered_or_malformed() {
        let (runner, _) = runner(vec![
            ModelReply::Text(format!("Here it is:\n```json\n{}\n```", summary_json())),
            ModelReply::Text("I cannot summarize this.".into()),
        ]);
        let cancel = CancelFlag::new();
        assert!(runner.summarize("text", &cancel).await.is_ok());
        let err = runner.summarize("text", &cancel).await.unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[tokio::test]
    async fn idempotent_against_deterministic_model() {
        let (runner, _) = runner(vec![
            ModelReply::Json(summary_json()),
            ModelReply::Json(summary_json()),
        ]);
        let cancel = CancelFlag::new();
        let first = runner.summarize("same input", &cancel).await.unwrap();
        let second = runner.summarize("same input", &cancel).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn long_input_is_truncated() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![ModelReply::Json(summary_json())]));
        let config = PipelineConfig {
            max_input_chars: 10,
            ..test_config()
        };
        let runner = StageRunner::new(invoker.clone(), config);
        runner
            .summarize(&"word ".repeat(100), &CancelFlag::new())
            .await
            .unwrap();

        let prompt = invoker.requests()[0].user_content();
        assert!(prompt.contains("[truncated]"));
        assert!(!prompt.contains(&"word ".repeat(5)));
    }
}
