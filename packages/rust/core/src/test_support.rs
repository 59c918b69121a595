//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use postforge_extractor::ContentExtractor;
use postforge_llm::{ModelInvoker, ModelReply, ModelRequest};
use postforge_shared::{
    Document, Persona, PersonaProfile, PipelineConfig, PostforgeError, Result, Summary,
};

/// Pipeline config pointed at nothing, with a short timeout.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        llm_endpoint: Some("http://model.test/v1/chat/completions".into()),
        llm_timeout: Duration::from_secs(5),
        ..PipelineConfig::default()
    }
}

pub fn summary_json() -> Value {
    json!({
        "overview": "Rust in production",
        "keyPoints": [
            "Memory safety without a GC",
            "Fearless concurrency",
            "Great tooling",
            "Growing ecosystem",
            "Steep but worthwhile learning curve"
        ],
        "conclusion": "Rust is ready for serious workloads."
    })
}

pub fn sample_summary() -> Summary {
    serde_json::from_value(summary_json()).unwrap()
}

pub fn persona_json() -> Value {
    json!({
        "name": "Dana",
        "age": 34,
        "gender": "female",
        "interests": ["systems programming"],
        "behaviors": ["reads engineering blogs"],
        "painPoints": ["memory bugs"],
        "goals": ["ship reliable services"],
        "challenges": ["legacy C++"],
        "preferredChannels": ["LinkedIn"]
    })
}

pub fn sample_persona() -> Persona {
    Persona::Structured(serde_json::from_value::<PersonaProfile>(persona_json()).unwrap())
}

pub fn review_reply(score: f64, instructions: &str) -> ModelReply {
    ModelReply::Json(json!({"score": score, "instructions": instructions}))
}

// ---------------------------------------------------------------------------
// ScriptedInvoker
// ---------------------------------------------------------------------------

/// Replays queued replies in order and records every request.
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedInvoker {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(replies: Vec<Result<ModelReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(PostforgeError::Invocation("script exhausted".into())))
    }
}

// ---------------------------------------------------------------------------
// StaticExtractor
// ---------------------------------------------------------------------------

/// Returns a fixed document (or error) and counts calls.
pub struct StaticExtractor {
    text: Option<String>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Extraction always fails with an HTTP error.
    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for StaticExtractor {
    async fn extract(&self, url: &str) -> Result<Document> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => Ok(Document::new(url, text.clone())),
            None => Err(PostforgeError::Extraction(format!("{url}: HTTP 404 Not Found"))),
        }
    }
}
