//! Model invocation for Postforge.
//!
//! This crate provides:
//! - [`ModelInvoker`]: the seam the pipeline stages call through
//! - [`ChatClient`]: an OpenAI-compatible chat-completions implementation
//! - [`parse`]: defensive JSON recovery for small-model output

pub mod client;
pub mod parse;
pub mod types;

use async_trait::async_trait;

use postforge_shared::Result;

pub use client::ChatClient;
pub use types::{ChatMessage, ModelReply, ModelRequest, ResponseSchema, Role};

/// Sends one request to a language model and returns its reply.
///
/// Implementations report unreachable backends, bad statuses and missing
/// content as `Invocation`, and unparseable JSON (when a schema was supplied)
/// as `MalformedResponse`.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply>;
}
