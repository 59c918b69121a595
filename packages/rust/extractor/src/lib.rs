//! Blog content extraction for Postforge.
//!
//! This crate provides:
//! - [`ContentExtractor`]: the seam the orchestrator fetches documents through
//! - [`HttpExtractor`]: fetches a URL and reduces the HTML to article text
//! - [`guard`]: refuses loopback/private targets

pub mod fetch;
pub mod guard;
pub mod text;

use async_trait::async_trait;

use postforge_shared::{Document, Result};

pub use fetch::HttpExtractor;

/// Turns a source reference into plain text.
///
/// A page with no usable text still yields a [`Document`], carrying the
/// placeholder text; callers decide whether that is terminal.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Document>;
}
