use tracing::{info, instrument};

use postforge_shared::{Draft, Persona, PostforgeError, Result, Summary};

use super::StageRunner;
use crate::cancel::CancelFlag;
use crate::prompts;

const STAGE: &str = "draft_post";

/// The blog material a draft is written from.
#[derive(Debug, Clone, PartialEq)]
pub enum SummarySource {
    Structured(Summary),
    Text(String),
}

impl SummarySource {
    fn prompt_text(&self) -> Option<String> {
        match self {
            Self::Structured(summary) => Some(prompts::summary_text(summary)),
            Self::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

/// Inputs to one Draft Post call.
#[derive(Debug, Clone, Default)]
pub struct DraftRequest {
    pub summary: Option<SummarySource>,
    pub persona: Option<Persona>,
    /// Reviewer feedback; present on regeneration passes.
    pub instructions: Option<String>,
    /// The draft the instructions refer to.
    pub previous: Option<String>,
}

impl StageRunner {
    /// Write a post for the persona from the summary.
    #[instrument(skip_all, fields(stage = STAGE, regeneration = request.instructions.is_some()))]
    pub async fn draft_post(&self, request: &DraftRequest, cancel: &CancelFlag) -> Result<Draft> {
        let summary = request
            .summary
            .as_ref()
            .and_then(SummarySource::prompt_text)
            .ok_or(PostforgeError::MissingInput {
                stage: STAGE,
                field: "summary",
            })?;
        let persona = request
            .persona
            .as_ref()
            .filter(|p| !p.is_blank())
            .ok_or(PostforgeError::MissingInput {
                stage: STAGE,
                field: "persona",
            })?;

        let instructions = request
            .instructions
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty());
        let correction = instructions.map(|i| (i, request.previous.as_deref()));

        let messages = prompts::draft_messages(&summary, &persona.as_prompt_text(), correction);
        let text = self
            .call(STAGE, self.request(messages, None), cancel)
            .await?
            .into_text();

        let text = text.trim();
        if text.is_empty() {
            return Err(PostforgeError::schema(STAGE, "model returned an empty post"));
        }

        info!(chars = text.len(), "draft written");
        Ok(Draft {
            text: text.to_string(),
            instructions: instructions.map(str::to_string),
        })
    }
}
