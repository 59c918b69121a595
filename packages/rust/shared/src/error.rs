//! Error types for Postforge.
//!
//! Library crates use [`PostforgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Postforge operations.
#[derive(Debug, thiserror::Error)]
pub enum PostforgeError {
    /// A required field from the caller is missing or malformed.
    #[error("invalid input: {message}")]
    InputValidation { message: String },

    /// Upstream fetch or HTML parse failure.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The extractor produced no usable text for the document.
    #[error("no content extracted from {source_ref}")]
    EmptyContent { source_ref: String },

    /// A stage received empty or whitespace-only text.
    #[error("{stage}: input text is empty")]
    EmptyInput { stage: &'static str },

    /// A stage was called without one of its required inputs.
    #[error("{stage}: missing required input `{field}`")]
    MissingInput {
        stage: &'static str,
        field: &'static str,
    },

    /// Model backend unreachable, non-2xx, timed out, or returned no content.
    #[error("model invocation failed: {0}")]
    Invocation(String),

    /// A schema was requested but the model content is not valid JSON.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Parsed model output is missing required fields.
    #[error("{stage}: response violates schema: {message}")]
    SchemaViolation {
        stage: &'static str,
        message: String,
    },

    /// The review loop regenerated the maximum number of times without a pass.
    #[error("review did not pass after {regenerations} regenerations (last score: {})", fmt_score(.last_score))]
    MaxRetriesExceeded {
        regenerations: u32,
        last_score: Option<f64>,
    },

    /// The caller tripped the cancellation flag.
    #[error("pipeline was cancelled")]
    Cancelled,

    /// Configuration loading or validation error.
    #[error("{message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PostforgeError>;

fn fmt_score(score: &Option<f64>) -> String {
    score.map_or_else(|| "none".to_string(), |s| format!("{s}"))
}

impl PostforgeError {
    /// Create an input validation error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputValidation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a schema violation for the given stage.
    pub fn schema(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::SchemaViolation {
            stage,
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable error code for envelopes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation { .. } => "input_validation",
            Self::Extraction(_) => "extraction",
            Self::EmptyContent { .. } => "empty_content",
            Self::EmptyInput { .. } => "empty_input",
            Self::MissingInput { .. } => "missing_input",
            Self::Invocation(_) => "invocation",
            Self::MalformedResponse(_) => "malformed_response",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::MaxRetriesExceeded { .. } => "max_retries_exceeded",
            Self::Cancelled => "cancelled",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }

    /// Whether the error stems from the caller's request rather than a stage.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InputValidation { .. } | Self::EmptyInput { .. } | Self::MissingInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PostforgeError::config("Missing LLM_URL environment variable");
        assert_eq!(err.to_string(), "Missing LLM_URL environment variable");

        let err = PostforgeError::schema("summarize", "missing field `overview`");
        assert_eq!(
            err.to_string(),
            "summarize: response violates schema: missing field `overview`"
        );

        let err = PostforgeError::MissingInput {
            stage: "draft_post",
            field: "persona",
        };
        assert!(err.to_string().contains("`persona`"));
    }

    #[test]
    fn max_retries_display_includes_last_score() {
        let err = PostforgeError::MaxRetriesExceeded {
            regenerations: 3,
            last_score: Some(4.5),
        };
        assert_eq!(
            err.to_string(),
            "review did not pass after 3 regenerations (last score: 4.5)"
        );

        let err = PostforgeError::MaxRetriesExceeded {
            regenerations: 0,
            last_score: None,
        };
        assert!(err.to_string().ends_with("(last score: none)"));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(PostforgeError::Cancelled.kind(), "cancelled");
        assert_eq!(
            PostforgeError::Invocation("boom".into()).kind(),
            "invocation"
        );
        assert!(PostforgeError::input("url is required").is_caller_error());
        assert!(!PostforgeError::Extraction("404".into()).is_caller_error());
    }
}
