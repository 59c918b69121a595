//! Route handlers: a JSON request body in, a JSON envelope out.
//!
//! [`Service::dispatch`] is transport-agnostic. An HTTP listener (or the CLI)
//! maps its request path and body onto it and writes the envelope back.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use postforge_shared::{
    Draft, Persona, PersonaProfile, PostforgeError, Result, ReviewRound, Summary,
};

use crate::cancel::CancelFlag;
use crate::pipeline::{Orchestrator, PipelineMode};
use crate::review_loop::{RefineRequest, refine_post};
use crate::stages::{DraftRequest, PersonaInput, SummarySource, validate_threshold};
use crate::validation::{SUMMARY_SHAPE, ValidationPolicy};

/// The externally reachable entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ProcessBlog,
    ExtractContent,
    Summarize,
    GeneratePersona,
    GeneratePost,
    ReviewPost,
    SuggestSubreddits,
}

/// Mount points a transport may put in front of the route paths.
const MOUNT_PREFIXES: [&str; 2] = ["/agent", "/api/v1/crawler"];

impl Route {
    pub const ALL: [Route; 7] = [
        Self::ProcessBlog,
        Self::ExtractContent,
        Self::Summarize,
        Self::GeneratePersona,
        Self::GeneratePost,
        Self::ReviewPost,
        Self::SuggestSubreddits,
    ];

    /// Match a request path, ignoring a trailing slash and a mount prefix.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
        let path = MOUNT_PREFIXES
            .iter()
            .find_map(|prefix| path.strip_prefix(prefix).filter(|rest| rest.starts_with('/')))
            .unwrap_or(path);
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::ProcessBlog => "/process-blog",
            Self::ExtractContent => "/blog-content-extractor",
            Self::Summarize => "/summarizer",
            Self::GeneratePersona => "/persona-generator",
            Self::GeneratePost => "/linkedin-post-generator",
            Self::ReviewPost => "/post-reviewer",
            Self::SuggestSubreddits => "/get-subreddits",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Response envelope shared by every route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Extracted text; only set by `/blog-content-extractor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_outputs: Option<PreviousOutputs>,
}

impl ApiResponse {
    pub fn data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            content: None,
            error: None,
            error_kind: None,
            previous_outputs: None,
        }
    }

    pub fn content(content: String) -> Self {
        Self {
            content: Some(content),
            data: None,
            ..Self::data(Value::Null)
        }
    }

    pub fn failure(error: &PostforgeError) -> Self {
        Self {
            success: false,
            data: None,
            content: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            previous_outputs: None,
        }
    }

    fn not_found() -> Self {
        Self {
            success: false,
            data: None,
            content: None,
            error: Some("Route not found".to_string()),
            error_kind: None,
            previous_outputs: None,
        }
    }
}

/// Whatever a failed `/process-blog` or `/post-reviewer` call produced
/// before it halted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    /// Latest draft, when the run got as far as drafting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rounds: Vec<ReviewRound>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProcessBlogBody {
    url: Option<String>,
    /// Also draft and review a post.
    #[serde(default)]
    draft: bool,
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExtractBody {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummarizeBody {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonaBody {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct GeneratePostBody {
    #[serde(default)]
    blog: Value,
    #[serde(default)]
    persona: Value,
    instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewPostBody {
    post: Option<String>,
    #[serde(default)]
    persona: Value,
    threshold: Option<f64>,
    /// Blog material for regenerations.
    #[serde(default, alias = "blog")]
    summary: Value,
}

#[derive(Debug, Deserialize)]
struct SubredditsBody {
    topic: Option<String>,
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    let body = if body.is_null() { json!({}) } else { body };
    serde_json::from_value(body).map_err(|e| PostforgeError::input(format!("invalid request body: {e}")))
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PostforgeError::input(format!("{name} is required")))
}

/// Loose persona coercion: a profile-shaped object is structured, any other
/// non-null value is carried as text.
fn persona_from(value: Value) -> Option<Persona> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(Persona::FreeText(text)),
        other => Some(
            match serde_json::from_value::<PersonaProfile>(other.clone()) {
                Ok(profile) => Persona::Structured(profile),
                Err(_) => Persona::FreeText(
                    serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
                ),
            },
        ),
    }
}

fn summary_source_from(value: Value) -> Option<SummarySource> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(SummarySource::Text(text)),
        other => Some(match serde_json::from_value::<Summary>(other.clone()) {
            Ok(summary) => SummarySource::Structured(summary),
            Err(_) => SummarySource::Text(
                serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
            ),
        }),
    }
}

/// `/persona-generator` input: an object must be a complete summary, a
/// string is taken as descriptive text.
fn persona_input_from(value: Value) -> Result<Option<PersonaInput>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(PersonaInput::Text(text))),
        object @ Value::Object(_) => {
            SUMMARY_SHAPE.check_as("derive_persona", &object, ValidationPolicy::Strict)?;
            let summary = serde_json::from_value::<Summary>(object)
                .map_err(|e| PostforgeError::schema("derive_persona", e.to_string()))?;
            Ok(Some(PersonaInput::Summary(summary)))
        }
        _ => Err(PostforgeError::input(
            "data must be a summary object or a string",
        )),
    }
}

fn process_blog_request(body: Value) -> Result<(String, PipelineMode)> {
    let body: ProcessBlogBody = parse_body(body)?;
    let url = required(body.url, "url")?;
    let mode = if body.draft || body.threshold.is_some() {
        PipelineMode::Post {
            threshold: body.threshold,
        }
    } else {
        PipelineMode::Persona
    };
    Ok((url, mode))
}

fn to_data<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| PostforgeError::Invocation(format!("failed to encode response: {e}")))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Dispatches route requests onto a shared orchestrator.
#[derive(Clone)]
pub struct Service {
    orchestrator: Arc<Orchestrator>,
}

impl Service {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Handle one request. Never fails; errors become `success: false`.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn dispatch(&self, path: &str, body: Value, cancel: &CancelFlag) -> ApiResponse {
        let Some(route) = Route::from_path(path) else {
            debug!("no route for path");
            return ApiResponse::not_found();
        };
        self.handle(route, body, cancel).await
    }

    pub async fn handle(&self, route: Route, body: Value, cancel: &CancelFlag) -> ApiResponse {
        let outcome = match route {
            Route::ProcessBlog => return self.process_blog(body, cancel).await,
            Route::ExtractContent => self.extract(body, cancel).await,
            Route::Summarize => self.summarize(body, cancel).await,
            Route::GeneratePersona => self.generate_persona(body, cancel).await,
            Route::GeneratePost => self.generate_post(body, cancel).await,
            Route::ReviewPost => return self.review_post(body, cancel).await,
            Route::SuggestSubreddits => self.suggest_subreddits(body, cancel).await,
        };

        outcome.unwrap_or_else(|e| {
            warn!(route = route.path(), error_kind = e.kind(), error = %e, "request failed");
            ApiResponse::failure(&e)
        })
    }

    async fn process_blog(&self, body: Value, cancel: &CancelFlag) -> ApiResponse {
        let (url, mode) = match process_blog_request(body) {
            Ok(parsed) => parsed,
            Err(e) => return ApiResponse::failure(&e),
        };

        let result = self.orchestrator.process_blog(&url, mode, cancel).await;

        if result.success {
            let mut data = json!({
                "url": result.source_ref,
                "summary": result.summary,
                "persona": result.persona,
            });
            if let Some(draft) = &result.draft {
                data["draft"] = json!(draft);
            }
            if let Some(verdict) = &result.verdict {
                data["verdict"] = json!(verdict);
            }
            return ApiResponse::data(data);
        }

        let partial = result.partial;
        ApiResponse {
            success: false,
            data: None,
            content: None,
            error: result.error,
            error_kind: result.error_kind,
            previous_outputs: Some(PreviousOutputs {
                extracted_content: partial.extracted.map(|d| d.text),
                summary: partial.summary,
                persona: partial.persona,
                draft: partial.draft,
                rounds: partial.rounds,
            }),
        }
    }

    async fn extract(&self, body: Value, cancel: &CancelFlag) -> Result<ApiResponse> {
        let body: ExtractBody = parse_body(body)?;
        let url = required(body.url, "url")?;
        let document = cancel
            .race(self.orchestrator.extractor().extract(&url))
            .await?;
        Ok(ApiResponse::content(document.text))
    }

    async fn summarize(&self, body: Value, cancel: &CancelFlag) -> Result<ApiResponse> {
        let body: SummarizeBody = parse_body(body)?;
        let content = required(body.content, "content")?;
        let summary = self.orchestrator.stages().summarize(&content, cancel).await?;
        Ok(ApiResponse::data(to_data(&summary)?))
    }

    async fn generate_persona(&self, body: Value, cancel: &CancelFlag) -> Result<ApiResponse> {
        let body: PersonaBody = parse_body(body)?;
        let input = persona_input_from(body.data)?;
        let persona = self
            .orchestrator
            .stages()
            .derive_persona(input.as_ref(), cancel)
            .await?;
        Ok(ApiResponse::data(to_data(&persona)?))
    }

    async fn generate_post(&self, body: Value, cancel: &CancelFlag) -> Result<ApiResponse> {
        let body: GeneratePostBody = parse_body(body)?;
        let request = DraftRequest {
            summary: summary_source_from(body.blog),
            persona: persona_from(body.persona),
            instructions: body.instructions,
            previous: None,
        };
        let draft = self.orchestrator.stages().draft_post(&request, cancel).await?;
        Ok(ApiResponse::data(to_data(&draft)?))
    }

    async fn review_post(&self, body: Value, cancel: &CancelFlag) -> ApiResponse {
        let request = match self.refine_request(body) {
            Ok(request) => request,
            Err(e) => return ApiResponse::failure(&e),
        };
        let max_regenerations = self.orchestrator.config().max_regenerations;

        match refine_post(self.orchestrator.stages(), request, max_regenerations, cancel).await {
            Ok(outcome) => ApiResponse::data(json!({
                "post": outcome.draft.text,
                "score": outcome.verdict.score,
                "passed": outcome.verdict.passed,
                "instructions": outcome.verdict.instructions,
                "regenerations": outcome.regenerations,
                "rounds": outcome.rounds,
            })),
            Err(failure) => {
                let e = &failure.error;
                warn!(
                    route = Route::ReviewPost.path(),
                    error_kind = e.kind(),
                    error = %e,
                    rounds = failure.rounds.len(),
                    "request failed"
                );
                let previous = (!failure.rounds.is_empty()).then(|| PreviousOutputs {
                    draft: Some(failure.last_draft),
                    rounds: failure.rounds,
                    ..PreviousOutputs::default()
                });
                ApiResponse {
                    previous_outputs: previous,
                    ..ApiResponse::failure(&failure.error)
                }
            }
        }
    }

    async fn suggest_subreddits(&self, body: Value, cancel: &CancelFlag) -> Result<ApiResponse> {
        let body: SubredditsBody = parse_body(body)?;
        let topic = required(body.topic, "topic")?;
        let subreddits = self
            .orchestrator
            .stages()
            .suggest_subreddits(&topic, cancel)
            .await?;
        Ok(ApiResponse::data(to_data(&subreddits)?))
    }

    fn refine_request(&self, body: Value) -> Result<RefineRequest> {
        let body: ReviewPostBody = parse_body(body)?;
        let post = required(body.post, "post")?;
        let persona = persona_from(body.persona)
            .filter(|p| !p.is_blank())
            .ok_or_else(|| PostforgeError::input("persona is required"))?;
        let threshold = body
            .threshold
            .unwrap_or(self.orchestrator.config().default_review_threshold);
        validate_threshold(threshold)?;

        Ok(RefineRequest {
            post,
            persona,
            summary: summary_source_from(body.summary),
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use postforge_llm::{ChatClient, ModelReply};
    use postforge_shared::PipelineConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{
        ScriptedInvoker, StaticExtractor, persona_json, review_reply, summary_json, test_config,
    };

    fn service(
        extractor: StaticExtractor,
        replies: Vec<ModelReply>,
    ) -> (Service, Arc<ScriptedInvoker>) {
        let invoker = Arc::new(ScriptedInvoker::new(replies));
        let orch = Orchestrator::new(Arc::new(extractor), invoker.clone(), test_config());
        (Service::new(Arc::new(orch)), invoker)
    }

    #[test]
    fn routes_round_trip_paths() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/summarizer/"), Some(Route::Summarize));
        assert_eq!(Route::from_path("/nope"), None);
        assert_eq!(Route::from_path("/"), None);
    }

    #[test]
    fn mount_prefixes_are_stripped() {
        assert_eq!(Route::from_path("/agent/process-blog"), Some(Route::ProcessBlog));
        assert_eq!(Route::from_path("/agent/post-reviewer/"), Some(Route::ReviewPost));
        assert_eq!(
            Route::from_path("/api/v1/crawler/get-subreddits"),
            Some(Route::SuggestSubreddits)
        );
        assert_eq!(Route::from_path("/agent"), None);
        assert_eq!(Route::from_path("/agentprocess-blog"), None);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (svc, _) = service(StaticExtractor::with_text("x"), vec![]);
        let resp = svc.dispatch("/unknown", json!({}), &CancelFlag::new()).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Route not found"));
    }

    #[tokio::test]
    async fn process_blog_success_envelope() {
        let (svc, _) = service(
            StaticExtractor::with_text("Article."),
            vec![ModelReply::Json(summary_json()), ModelReply::Json(persona_json())],
        );
        let resp = svc
            .dispatch(
                "/process-blog",
                json!({"url": "https://example.com/post"}),
                &CancelFlag::new(),
            )
            .await;

        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["url"], "https://example.com/post");
        assert_eq!(data["summary"]["overview"], "Rust in production");
        assert_eq!(data["persona"]["name"], "Dana");
        assert!(data.get("draft").is_none());
    }

    #[tokio::test]
    async fn process_blog_failure_echoes_previous_outputs() {
        let (svc, invoker) = service(
            StaticExtractor::with_text("Article body."),
            vec![ModelReply::Json(summary_json())],
        );
        let resp = svc
            .dispatch(
                "/process-blog",
                json!({"url": "https://example.com/post"}),
                &CancelFlag::new(),
            )
            .await;

        assert!(!resp.success);
        assert_eq!(resp.error_kind.as_deref(), Some("invocation"));
        let previous = resp.previous_outputs.unwrap();
        assert_eq!(previous.extracted_content.as_deref(), Some("Article body."));
        assert!(previous.summary.is_some());
        assert!(previous.persona.is_none());
        assert_eq!(invoker.calls(), 2);
    }

    #[tokio::test]
    async fn process_blog_failed_review_echoes_last_draft() {
        let mut replies = vec![
            ModelReply::Json(summary_json()),
            ModelReply::Json(persona_json()),
            ModelReply::Text("Draft 0".into()),
        ];
        for i in 1..=3 {
            replies.push(review_reply(2.0, "too vague"));
            replies.push(ModelReply::Text(format!("Draft {i}")));
        }
        replies.push(review_reply(2.0, "too vague"));
        let (svc, _) = service(StaticExtractor::with_text("Article body."), replies);

        let resp = svc
            .dispatch(
                "/agent/process-blog",
                json!({"url": "https://example.com/post", "draft": true}),
                &CancelFlag::new(),
            )
            .await;

        assert!(!resp.success);
        assert_eq!(resp.error_kind.as_deref(), Some("max_retries_exceeded"));
        let previous = resp.previous_outputs.unwrap();
        assert_eq!(previous.draft.map(|d| d.text).as_deref(), Some("Draft 3"));
        assert_eq!(previous.rounds.len(), 4);
        assert!(previous.persona.is_some());

        let json = serde_json::to_value(&previous.rounds[0]).unwrap();
        assert_eq!(json["post"], "Draft 0");
        assert_eq!(json["score"], 2.0);
    }

    #[tokio::test]
    async fn process_blog_requires_url() {
        let (svc, _) = service(StaticExtractor::with_text("x"), vec![]);
        let resp = svc
            .dispatch("/process-blog", json!({}), &CancelFlag::new())
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));
        assert!(resp.previous_outputs.is_none());
    }

    #[tokio::test]
    async fn extractor_route_returns_content() {
        let (svc, _) = service(StaticExtractor::with_text("Hello blog."), vec![]);
        let resp = svc
            .dispatch(
                "/blog-content-extractor",
                json!({"url": "https://example.com"}),
                &CancelFlag::new(),
            )
            .await;
        assert!(resp.success);
        assert_eq!(resp.content.as_deref(), Some("Hello blog."));
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn summarizer_requires_content() {
        let (svc, invoker) = service(StaticExtractor::with_text("x"), vec![]);
        let resp = svc
            .dispatch("/summarizer", json!({"content": "  "}), &CancelFlag::new())
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));
        assert_eq!(invoker.calls(), 0);
    }

    fn chat_service(endpoint: Option<String>) -> Service {
        let client = ChatClient::new(endpoint.clone(), Duration::from_secs(5)).unwrap();
        let config = PipelineConfig {
            llm_endpoint: endpoint,
            ..test_config()
        };
        let orch = Orchestrator::new(
            Arc::new(StaticExtractor::with_text("x")),
            Arc::new(client),
            config,
        );
        Service::new(Arc::new(orch))
    }

    #[tokio::test]
    async fn summarizer_without_llm_url_reports_config_error() {
        let resp = chat_service(None)
            .dispatch(
                "/summarizer",
                json!({"content": "A real article."}),
                &CancelFlag::new(),
            )
            .await;

        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Missing LLM_URL"));
        assert_eq!(resp.error_kind.as_deref(), Some("config"));
    }

    #[tokio::test]
    async fn summarizer_over_chat_backend() {
        let server = MockServer::start().await;
        let content = summary_json().to_string();
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = chat_service(Some(format!("{}/v1/chat/completions", server.uri())))
            .dispatch(
                "/summarizer",
                json!({"content": "A real article."}),
                &CancelFlag::new(),
            )
            .await;

        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.data.unwrap()["overview"], "Rust in production");
    }

    #[tokio::test]
    async fn persona_generator_accepts_summary_or_text() {
        let (svc, invoker) = service(
            StaticExtractor::with_text("x"),
            vec![ModelReply::Json(persona_json()), ModelReply::Json(persona_json())],
        );
        let cancel = CancelFlag::new();

        let resp = svc
            .dispatch("/persona-generator", json!({"data": summary_json()}), &cancel)
            .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.data.unwrap()["name"], "Dana");

        let resp = svc
            .dispatch("/persona-generator", json!({"data": "a blog about Rust"}), &cancel)
            .await;
        assert!(resp.success);
        assert_eq!(invoker.calls(), 2);
    }

    #[tokio::test]
    async fn persona_generator_rejects_incomplete_summary() {
        let (svc, invoker) = service(StaticExtractor::with_text("x"), vec![]);
        let cancel = CancelFlag::new();

        let resp = svc
            .dispatch("/persona-generator", json!({"data": {"overview": "only"}}), &cancel)
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("schema_violation"));

        let resp = svc.dispatch("/persona-generator", json!({}), &cancel).await;
        assert_eq!(resp.error_kind.as_deref(), Some("missing_input"));

        let resp = svc
            .dispatch("/persona-generator", json!({"data": 42}), &cancel)
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));
        assert_eq!(invoker.calls(), 0);
    }

    #[tokio::test]
    async fn post_generator_builds_draft() {
        let (svc, _) = service(
            StaticExtractor::with_text("x"),
            vec![ModelReply::Text("A fine post.".into())],
        );
        let resp = svc
            .dispatch(
                "/linkedin-post-generator",
                json!({"blog": summary_json(), "persona": persona_json()}),
                &CancelFlag::new(),
            )
            .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.data.unwrap()["text"], "A fine post.");
    }

    #[tokio::test]
    async fn post_generator_missing_persona() {
        let (svc, invoker) = service(StaticExtractor::with_text("x"), vec![]);
        let resp = svc
            .dispatch(
                "/linkedin-post-generator",
                json!({"blog": "some blog"}),
                &CancelFlag::new(),
            )
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("missing_input"));
        assert_eq!(invoker.calls(), 0);
    }

    #[tokio::test]
    async fn post_reviewer_runs_bounded_loop() {
        let (svc, invoker) = service(
            StaticExtractor::with_text("x"),
            vec![
                review_reply(3.0, "add data"),
                ModelReply::Text("Post with data.".into()),
                review_reply(8.0, ""),
            ],
        );
        let resp = svc
            .dispatch(
                "/post-reviewer",
                json!({"post": "Thin post.", "persona": persona_json(), "threshold": 7}),
                &CancelFlag::new(),
            )
            .await;

        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["post"], "Post with data.");
        assert_eq!(data["score"], 8.0);
        assert_eq!(data["passed"], true);
        assert_eq!(data["regenerations"], 1);
        assert_eq!(data["rounds"].as_array().map(Vec::len), Some(2));
        assert_eq!(invoker.calls(), 3);
    }

    #[tokio::test]
    async fn post_reviewer_gives_up_after_max_regenerations() {
        let mut replies = Vec::new();
        for i in 0..10 {
            replies.push(review_reply(1.0, "try again"));
            replies.push(ModelReply::Text(format!("Draft {i}")));
        }
        let (svc, invoker) = service(StaticExtractor::with_text("x"), replies);

        let resp = svc
            .dispatch(
                "/post-reviewer",
                json!({"post": "Thin post.", "persona": "CTOs"}),
                &CancelFlag::new(),
            )
            .await;

        assert!(!resp.success);
        assert_eq!(resp.error_kind.as_deref(), Some("max_retries_exceeded"));
        let max = test_config().max_regenerations as usize;
        assert_eq!(invoker.calls(), 2 * max + 1);

        let previous = resp.previous_outputs.unwrap();
        assert_eq!(previous.rounds.len(), max + 1);
        assert_eq!(
            previous.draft.map(|d| d.text),
            Some(format!("Draft {}", max - 1))
        );
        assert!(previous.summary.is_none());
    }

    #[tokio::test]
    async fn get_subreddits_returns_list() {
        let (svc, invoker) = service(
            StaticExtractor::with_text("x"),
            vec![ModelReply::Json(json!({"subreddits": ["r/rust", "r/programming"]}))],
        );
        let cancel = CancelFlag::new();

        let resp = svc
            .dispatch("/api/v1/crawler/get-subreddits", json!({"topic": "rust"}), &cancel)
            .await;
        assert!(resp.success, "{:?}", resp.error);
        assert_eq!(resp.data.unwrap(), json!(["r/rust", "r/programming"]));

        let resp = svc.dispatch("/get-subreddits", json!({}), &cancel).await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));
        assert_eq!(invoker.calls(), 1);
    }

    #[tokio::test]
    async fn post_reviewer_validates_input() {
        let (svc, invoker) = service(StaticExtractor::with_text("x"), vec![]);
        let cancel = CancelFlag::new();

        let resp = svc
            .dispatch("/post-reviewer", json!({"persona": "CTOs"}), &cancel)
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));

        let resp = svc
            .dispatch(
                "/post-reviewer",
                json!({"post": "p", "persona": "CTOs", "threshold": 12}),
                &cancel,
            )
            .await;
        assert_eq!(resp.error_kind.as_deref(), Some("input_validation"));
        assert_eq!(invoker.calls(), 0);
    }
}
