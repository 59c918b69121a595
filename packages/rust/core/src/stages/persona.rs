use serde_json::Value;
use tracing::{info, instrument};

use postforge_shared::{Persona, PersonaProfile, PostforgeError, Result, Summary};

use super::StageRunner;
use crate::cancel::CancelFlag;
use crate::prompts;
use crate::validation::PERSONA_SHAPE;

const STAGE: &str = "derive_persona";

/// What a persona is derived from.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonaInput {
    /// A validated structured summary.
    Summary(Summary),
    /// An already-serialized summary or any other descriptive text.
    Text(String),
}

impl PersonaInput {
    fn prompt_text(&self) -> Option<String> {
        match self {
            Self::Summary(summary) => Some(prompts::summary_text(summary)),
            Self::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

impl StageRunner {
    /// Derive the target-audience persona for a summary.
    ///
    /// Output is checked with the configured persona policy. A reply matching
    /// the profile shape becomes [`Persona::Structured`]; any other non-empty
    /// reply is kept as free text.
    #[instrument(skip_all, fields(stage = STAGE))]
    pub async fn derive_persona(
        &self,
        input: Option<&PersonaInput>,
        cancel: &CancelFlag,
    ) -> Result<Persona> {
        let source = input
            .and_then(PersonaInput::prompt_text)
            .ok_or(PostforgeError::MissingInput {
                stage: STAGE,
                field: "summary",
            })?;

        let request = self.request(
            prompts::persona_messages(&source),
            Some(prompts::persona_schema()),
        );
        let value = self.call(STAGE, request, cancel).await?.into_json()?;

        PERSONA_SHAPE.check(&value, self.persona_policy())?;
        let persona = into_persona(value);

        info!(
            structured = matches!(persona, Persona::Structured(_)),
            "persona derived"
        );
        Ok(persona)
    }
}

fn into_persona(value: Value) -> Persona {
    match value {
        Value::String(text) => Persona::FreeText(text.trim().to_string()),
        other => match serde_json::from_value::<PersonaProfile>(other.clone()) {
            Ok(profile) => Persona::Structured(profile),
            Err(_) => Persona::FreeText(
                serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
            ),
        },
    }
}
