//! Shared types, error model, and configuration for Postforge.
//!
//! This crate is the foundation depended on by all other Postforge crates.
//! It provides:
//! - [`PostforgeError`]: the unified error type
//! - Domain types ([`Document`], [`Summary`], [`Persona`], [`Draft`],
//!   [`ReviewVerdict`], [`PipelineResult`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractorConfig, LLM_URL_ENV, LlmConfig, PORT_ENV, PersonaPolicy, PipelineConfig,
    ReviewConfig, ServerConfig, ValidationConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, missing_endpoint,
};
pub use error::{PostforgeError, Result};
pub use types::{
    Document, Draft, PLACEHOLDER_TEXT, PartialOutputs, Persona, PersonaProfile, PipelineResult,
    ReviewRound, ReviewVerdict, RunId, Summary,
};
