//! End-to-end blog pipeline: URL → extract → summarize → persona (→ draft → review).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use postforge_extractor::{ContentExtractor, HttpExtractor};
use postforge_llm::{ChatClient, ModelInvoker};
use postforge_shared::{AppConfig, PipelineConfig, PipelineResult, PostforgeError, Result};

use crate::cancel::CancelFlag;
use crate::review_loop::{RefineRequest, refine_post};
use crate::stages::{DraftRequest, PersonaInput, StageRunner, SummarySource, validate_threshold};

/// How far a pipeline run goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineMode {
    /// Extract, summarize and derive the persona.
    Persona,
    /// Also draft a post and run it through the review loop.
    /// `threshold` falls back to the configured default.
    Post { threshold: Option<f64> },
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, name: &str);
    /// Called when the pipeline completes (successfully or not).
    fn done(&self, result: &PipelineResult, elapsed: Duration);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _name: &str) {}
    fn done(&self, _result: &PipelineResult, _elapsed: Duration) {}
}

/// Sequences the stages for one blog post.
///
/// Holds only shared, immutable state, so one orchestrator serves any
/// number of concurrent runs.
pub struct Orchestrator {
    extractor: Arc<dyn ContentExtractor>,
    stages: StageRunner,
    progress: Arc<dyn ProgressReporter>,
}

impl Orchestrator {
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        invoker: Arc<dyn ModelInvoker>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            stages: StageRunner::new(invoker, config),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Build the HTTP extractor and chat client described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let pipeline = PipelineConfig::from(config);
        let extractor = HttpExtractor::new(&config.extractor)?;
        let invoker = ChatClient::new(pipeline.llm_endpoint.clone(), pipeline.llm_timeout)?;
        Ok(Self::new(Arc::new(extractor), Arc::new(invoker), pipeline))
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn stages(&self) -> &StageRunner {
        &self.stages
    }

    pub fn extractor(&self) -> &dyn ContentExtractor {
        self.extractor.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        self.stages.config()
    }

    /// Run the pipeline for `url`.
    ///
    /// Never fails: the first stage error halts the run and is recorded in
    /// the result next to every output obtained before it.
    #[instrument(skip_all, fields(url = %url, mode = ?mode))]
    pub async fn process_blog(
        &self,
        url: &str,
        mode: PipelineMode,
        cancel: &CancelFlag,
    ) -> PipelineResult {
        let start = Instant::now();
        let mut result = PipelineResult::pending(url.trim());
        info!(run_id = %result.run_id, "starting pipeline");

        match self.run(url.trim(), mode, cancel, &mut result).await {
            Ok(()) => {
                result.success = true;
                info!(
                    run_id = %result.run_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "pipeline completed"
                );
            }
            Err(e) => {
                warn!(
                    run_id = %result.run_id,
                    error_kind = e.kind(),
                    error = %e,
                    "pipeline halted"
                );
                result.error_kind = Some(e.kind().to_string());
                result.error = Some(e.to_string());
            }
        }

        self.progress.done(&result, start.elapsed());
        result
    }

    async fn run(
        &self,
        url: &str,
        mode: PipelineMode,
        cancel: &CancelFlag,
        result: &mut PipelineResult,
    ) -> Result<()> {
        if url.is_empty() {
            return Err(PostforgeError::input("url is required"));
        }
        let threshold = match mode {
            PipelineMode::Post { threshold } => {
                let threshold = threshold.unwrap_or(self.config().default_review_threshold);
                validate_threshold(threshold)?;
                Some(threshold)
            }
            PipelineMode::Persona => None,
        };

        // --- Extract ---
        self.progress.stage("Extracting content");
        let document = cancel.race(self.extractor.extract(url)).await?;
        let placeholder = document.is_placeholder();
        let text = document.text.clone();
        result.partial.extracted = Some(document);
        if placeholder {
            return Err(PostforgeError::EmptyContent {
                source_ref: url.to_string(),
            });
        }

        // --- Summarize ---
        self.progress.stage("Summarizing");
        let summary = self.stages.summarize(&text, cancel).await?;
        result.partial.summary = Some(summary.clone());

        // --- Persona ---
        self.progress.stage("Deriving persona");
        let persona = self
            .stages
            .derive_persona(Some(&PersonaInput::Summary(summary.clone())), cancel)
            .await?;
        result.partial.persona = Some(persona.clone());

        // --- Draft + review ---
        if let Some(threshold) = threshold {
            self.progress.stage("Drafting post");
            let first = self
                .stages
                .draft_post(
                    &DraftRequest {
                        summary: Some(SummarySource::Structured(summary.clone())),
                        persona: Some(persona.clone()),
                        ..DraftRequest::default()
                    },
                    cancel,
                )
                .await?;
            result.partial.draft = Some(first.clone());

            self.progress.stage("Reviewing post");
            let refined = refine_post(
                &self.stages,
                RefineRequest {
                    post: first.text,
                    persona: persona.clone(),
                    summary: Some(SummarySource::Structured(summary.clone())),
                    threshold,
                },
                self.config().max_regenerations,
                cancel,
            )
            .await;

            match refined {
                Ok(outcome) => {
                    result.partial.draft = Some(outcome.draft.clone());
                    result.partial.rounds = outcome.rounds;
                    result.draft = Some(outcome.draft);
                    result.verdict = Some(outcome.verdict);
                }
                Err(failure) => {
                    result.partial.draft = Some(failure.last_draft);
                    result.partial.rounds = failure.rounds;
                    return Err(failure.error);
                }
            }
        }

        result.summary = Some(summary);
        result.persona = Some(persona);
        Ok(())
    }
}
