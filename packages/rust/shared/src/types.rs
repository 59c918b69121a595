//! Core domain types flowing through the Postforge pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel text returned by extraction when no content nodes match.
pub const PLACEHOLDER_TEXT: &str = "No content extracted";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Plain text extracted from a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the text came from (usually the URL).
    pub source_ref: String,
    /// Best-effort plain text.
    pub text: String,
    /// When the document was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    pub fn new(source_ref: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            text: text.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Placeholder document for a source with no matching content nodes.
    pub fn placeholder(source_ref: impl Into<String>) -> Self {
        Self::new(source_ref, PLACEHOLDER_TEXT)
    }

    /// True when the text is blank or the extraction sentinel.
    pub fn is_placeholder(&self) -> bool {
        let text = self.text.trim();
        text.is_empty() || text.eq_ignore_ascii_case(PLACEHOLDER_TEXT)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Structured summary of a document.
///
/// All three fields are required; a summary is never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub overview: String,
    /// Ordered key points (five or more are requested, not enforced).
    #[serde(
        rename = "keyPoints",
        alias = "key_points",
        alias = "detailed_key_points"
    )]
    pub key_points: Vec<String>,
    pub conclusion: String,
}

// ---------------------------------------------------------------------------
// Persona
// ---------------------------------------------------------------------------

/// Structured audience persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaProfile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
    #[serde(alias = "pain_points")]
    pub pain_points: Vec<String>,
    pub goals: Vec<String>,
    pub challenges: Vec<String>,
    #[serde(alias = "preferred_channels")]
    pub preferred_channels: Vec<String>,
}

/// Target audience persona.
///
/// The pipeline treats this as opaque: it is validated for presence and
/// interpolated into prompts, never inspected field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Persona {
    Structured(PersonaProfile),
    FreeText(String),
}

impl Persona {
    /// Text used when the persona is interpolated into a prompt.
    pub fn as_prompt_text(&self) -> String {
        match self {
            Self::Structured(profile) => {
                serde_json::to_string_pretty(profile).unwrap_or_else(|_| profile.name.clone())
            }
            Self::FreeText(text) => text.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Structured(profile) => profile.name.trim().is_empty(),
            Self::FreeText(text) => text.trim().is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Draft / ReviewVerdict
// ---------------------------------------------------------------------------

/// A candidate post body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    /// Review feedback this draft was regenerated against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Outcome of scoring a draft against a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Always present when `passed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ---------------------------------------------------------------------------
// PipelineResult
// ---------------------------------------------------------------------------

/// One review of one draft inside the review loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRound {
    pub round: u32,
    pub post: String,
    pub score: Option<f64>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Stage outputs obtained before a failure, kept for diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    /// Latest draft produced, passing or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rounds: Vec<ReviewRound>,
}

/// Aggregate result of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    pub success: bool,
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ReviewVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable code of the failing error (see `PostforgeError::kind`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub partial: PartialOutputs,
}

impl PipelineResult {
    /// Empty, not-yet-successful result for `source_ref`.
    pub fn pending(source_ref: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            success: false,
            source_ref: source_ref.into(),
            summary: None,
            persona: None,
            draft: None,
            verdict: None,
            error: None,
            error_kind: None,
            partial: PartialOutputs::default(),
        }
    }
}
