//! Pipeline orchestration and stage logic for Postforge.
//!
//! Ties the extractor and the model invoker together into the blog → summary
//! → persona → post workflow, and exposes it through transport-agnostic route
//! handlers in [`api`].

pub mod api;
pub mod cancel;
pub mod pipeline;
pub mod prompts;
pub mod review_loop;
pub mod stages;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use api::{ApiResponse, PreviousOutputs, Route, Service};
pub use cancel::CancelFlag;
pub use pipeline::{Orchestrator, PipelineMode, ProgressReporter, SilentProgress};
pub use postforge_shared::ReviewRound;
pub use review_loop::{RefineFailure, RefineOutcome, RefineRequest, refine_post};
pub use stages::{DraftRequest, PersonaInput, ReviewRequest, StageRunner, SummarySource};
