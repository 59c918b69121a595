//! The model-backed pipeline stages.
//!
//! Each stage is a method on [`StageRunner`], which owns the model invoker
//! and the runtime settings every call shares. Stages never retry; the review
//! loop in [`crate::review_loop`] is the only place a stage runs twice.

mod draft;
mod persona;
mod review;
mod subreddits;
mod summarize;

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use postforge_llm::{ChatMessage, ModelInvoker, ModelReply, ModelRequest, ResponseSchema};
use postforge_shared::{PipelineConfig, PostforgeError, Result};

use crate::cancel::CancelFlag;
use crate::validation::ValidationPolicy;

pub use draft::{DraftRequest, SummarySource};
pub use persona::PersonaInput;
pub use review::ReviewRequest;
pub(crate) use review::validate_threshold;

/// Runs individual stages against a model invoker.
#[derive(Clone)]
pub struct StageRunner {
    invoker: Arc<dyn ModelInvoker>,
    config: Arc<PipelineConfig>,
}

impl StageRunner {
    pub fn new(invoker: Arc<dyn ModelInvoker>, config: PipelineConfig) -> Self {
        Self {
            invoker,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn persona_policy(&self) -> ValidationPolicy {
        self.config.persona_policy.into()
    }

    fn request(&self, messages: Vec<ChatMessage>, schema: Option<ResponseSchema>) -> ModelRequest {
        ModelRequest {
            messages,
            response_schema: schema,
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// One model call, bounded by the configured timeout and the cancel flag.
    async fn call(
        &self,
        stage: &'static str,
        request: ModelRequest,
        cancel: &CancelFlag,
    ) -> Result<ModelReply> {
        let start = Instant::now();
        let timeout = self.config.llm_timeout;

        let reply = cancel
            .race(async {
                tokio::time::timeout(timeout, self.invoker.invoke(&request))
                    .await
                    .map_err(|_| {
                        PostforgeError::Invocation(format!(
                            "{stage}: model call timed out after {}ms",
                            timeout.as_millis()
                        ))
                    })?
            })
            .await?;

        debug!(
            stage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "stage model call returned"
        );
        Ok(reply)
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
fn truncate_chars(text: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}\n\n[truncated]", &text[..byte_idx]).into(),
        None => text.into(),
    }
}
