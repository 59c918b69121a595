//! Request and reply types for model invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use postforge_shared::{PostforgeError, Result};

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A named JSON schema the reply must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Everything the backend needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    pub response_schema: Option<ResponseSchema>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelRequest {
    /// Concatenated content of all user messages. Handy in logs and tests.
    pub fn user_content(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Model output: parsed JSON when a schema was requested, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Json(Value),
    Text(String),
}

impl ModelReply {
    /// Take the reply as JSON, parsing text replies when possible.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => crate::parse::parse_json(&text),
        }
    }

    /// Take the reply as text; JSON string values are unwrapped.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(Value::String(text)) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

/// Shorthand used by the client when the backend breaks the chat contract.
pub(crate) fn invocation(msg: impl Into<String>) -> PostforgeError {
    PostforgeError::Invocation(msg.into())
}
