//! OpenAI-compatible chat-completions client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use postforge_shared::{Result, missing_endpoint};

use crate::ModelInvoker;
use crate::parse::{parse_json, strip_thinking};
use crate::types::{ChatMessage, ModelReply, ModelRequest, invocation};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("Postforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Model invoker posting to a chat-completions endpoint.
///
/// The endpoint URL is used verbatim. When no endpoint is configured every
/// call fails with a config error and no request is sent.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: Option<String>,
}

impl ChatClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| invocation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        })
    }
}

#[async_trait]
impl ModelInvoker for ChatClient {
    #[instrument(skip_all, fields(model = %request.model, schema = request.response_schema.is_some()))]
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply> {
        let endpoint = self.endpoint.as_deref().ok_or_else(missing_endpoint)?;
        let start = Instant::now();

        let response_format = request.response_schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "strict": true,
                    "schema": schema.schema,
                }
            })
        });

        let body = ChatApiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            response_format,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    invocation(format!("request to {endpoint} timed out"))
                } else {
                    invocation(format!("failed to reach {endpoint}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(200).collect();
            warn!(status = status.as_u16(), "model backend returned error status");
            return Err(invocation(format!("backend returned HTTP {status}: {preview}")));
        }

        let parsed: ChatApiResponse = response
            .json()
            .await
            .map_err(|e| invocation(format!("unreadable chat response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| invocation("response has no choices[0].message.content"))?;

        let (thinking, content) = strip_thinking(&content);
        if thinking.is_some() {
            debug!("stripped reasoning block from model content");
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            content_len = content.len(),
            "model call completed"
        );

        if request.response_schema.is_some() {
            parse_json(&content).map(ModelReply::Json)
        } else {
            Ok(ModelReply::Text(content))
        }
    }
}
