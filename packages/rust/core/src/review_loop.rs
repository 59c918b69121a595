//! Review → regenerate loop.
//!
//! A draft is reviewed; a failing verdict drives one regeneration with the
//! reviewer's instructions, and the new draft is reviewed again. The loop
//! stops on the first pass or after `max_regenerations` regenerations.

use tracing::{info, instrument, warn};

use postforge_shared::{Draft, Persona, PostforgeError, Result, ReviewRound, ReviewVerdict};

use crate::cancel::CancelFlag;
use crate::stages::{DraftRequest, ReviewRequest, StageRunner, SummarySource, validate_threshold};

/// Inputs to [`refine_post`].
#[derive(Debug, Clone)]
pub struct RefineRequest {
    /// The first draft to review.
    pub post: String,
    pub persona: Persona,
    /// Blog material for regenerations; the current draft is used when absent.
    pub summary: Option<SummarySource>,
    pub threshold: f64,
}

/// A draft that passed review, with the rounds that led to it.
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub draft: Draft,
    pub verdict: ReviewVerdict,
    pub regenerations: u32,
    pub rounds: Vec<ReviewRound>,
}

/// A loop that ended without a passing draft.
///
/// `last_draft` is the most recent draft that was produced, so callers can
/// still surface it alongside the error.
#[derive(Debug)]
pub struct RefineFailure {
    pub error: PostforgeError,
    pub last_draft: Draft,
    pub rounds: Vec<ReviewRound>,
}

impl From<RefineFailure> for PostforgeError {
    fn from(failure: RefineFailure) -> Self {
        failure.error
    }
}

/// Review `request.post` and regenerate until it passes.
///
/// Fails with `MaxRetriesExceeded` once `max_regenerations` regenerations
/// have been reviewed without a pass. Stage errors end the loop immediately.
#[instrument(skip_all, fields(threshold = request.threshold, max_regenerations = max_regenerations))]
pub async fn refine_post(
    runner: &StageRunner,
    request: RefineRequest,
    max_regenerations: u32,
    cancel: &CancelFlag,
) -> std::result::Result<RefineOutcome, RefineFailure> {
    let mut draft = Draft {
        text: request.post.clone(),
        instructions: None,
    };
    let mut rounds = Vec::new();

    match run_rounds(runner, &request, max_regenerations, &mut draft, &mut rounds, cancel).await {
        Ok((verdict, regenerations)) => Ok(RefineOutcome {
            draft,
            verdict,
            regenerations,
            rounds,
        }),
        Err(error) => Err(RefineFailure {
            error,
            last_draft: draft,
            rounds,
        }),
    }
}

/// The loop body. `draft` and `rounds` always hold the latest state, including
/// when an error is returned.
async fn run_rounds(
    runner: &StageRunner,
    request: &RefineRequest,
    max_regenerations: u32,
    draft: &mut Draft,
    rounds: &mut Vec<ReviewRound>,
    cancel: &CancelFlag,
) -> Result<(ReviewVerdict, u32)> {
    validate_threshold(request.threshold)?;
    let mut regenerations = 0;

    loop {
        let verdict = runner
            .review_post(
                &ReviewRequest {
                    post: draft.text.clone(),
                    persona: request.persona.clone(),
                    threshold: request.threshold,
                },
                cancel,
            )
            .await?;

        rounds.push(ReviewRound {
            round: rounds.len() as u32 + 1,
            post: draft.text.clone(),
            score: verdict.score,
            passed: verdict.passed,
            instructions: verdict.instructions.clone(),
        });

        if verdict.passed {
            info!(regenerations, score = ?verdict.score, "draft passed review");
            return Ok((verdict, regenerations));
        }

        if regenerations >= max_regenerations {
            warn!(regenerations, score = ?verdict.score, "review loop exhausted");
            return Err(PostforgeError::MaxRetriesExceeded {
                regenerations,
                last_score: verdict.score,
            });
        }

        regenerations += 1;
        info!(regenerations, score = ?verdict.score, "regenerating draft");

        let summary = request
            .summary
            .clone()
            .unwrap_or_else(|| SummarySource::Text(draft.text.clone()));
        *draft = runner
            .draft_post(
                &DraftRequest {
                    summary: Some(summary),
                    persona: Some(request.persona.clone()),
                    instructions: verdict.instructions,
                    previous: Some(draft.text.clone()),
                },
                cancel,
            )
            .await?;
    }
}
