//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use postforge_core::{
    ApiResponse, CancelFlag, Orchestrator, ProgressReporter, Route, Service,
};
use postforge_shared::{AppConfig, PipelineResult, init_config, load_config, load_config_from};
use serde_json::{Value, json};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Postforge: turn a blog post into a LinkedIn post for its audience.
#[derive(Parser)]
#[command(
    name = "postforge",
    version,
    about = "Extract, summarize, and repurpose blog posts as persona-targeted LinkedIn drafts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.postforge/postforge.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline for a blog URL.
    Process {
        /// Blog post URL.
        url: String,

        /// Also draft a post and run it through the review loop.
        #[arg(long)]
        draft: bool,

        /// Review pass threshold (0-10); implies --draft.
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Extract the readable text of a blog post.
    Extract {
        /// Blog post URL.
        url: String,
    },

    /// Summarize text.
    Summarize(TextSource),

    /// Derive the audience persona from a summary (JSON) or plain text.
    Persona {
        #[arg(long)]
        summary_file: PathBuf,
    },

    /// Write a LinkedIn post for a persona.
    Draft {
        /// Summary JSON or blog text.
        #[arg(long)]
        blog_file: PathBuf,

        /// Persona JSON or free text.
        #[arg(long)]
        persona_file: PathBuf,
    },

    /// Review a post, regenerating until it passes.
    Review {
        #[arg(long)]
        post_file: PathBuf,

        #[arg(long)]
        persona_file: PathBuf,

        /// Pass threshold (0-10).
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Suggest subreddits where a topic is discussed.
    Subreddits {
        /// Topic to search for.
        #[arg(long)]
        topic: String,
    },

    /// Send a raw request body to a route, e.g. `call /summarizer`.
    Call {
        /// Route path.
        route: String,

        /// JSON body; read from stdin when omitted.
        #[arg(long)]
        body: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Inline text or a file to read it from.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub(crate) struct TextSource {
    #[arg(long)]
    text: Option<String>,

    #[arg(long)]
    file: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// the response envelope.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "postforge=info",
        1 => "postforge=debug",
        _ => "postforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
        Command::Process {
            url,
            draft,
            threshold,
        } => {
            let body = json!({"url": url, "draft": draft, "threshold": threshold});
            call_route(config_path.as_deref(), Route::ProcessBlog, body, true).await
        }
        Command::Extract { url } => {
            call_route(config_path.as_deref(), Route::ExtractContent, json!({"url": url}), false)
                .await
        }
        Command::Summarize(source) => {
            let content = match (source.text, source.file) {
                (Some(text), _) => text,
                (None, Some(file)) => read_file(&file)?,
                (None, None) => return Err(eyre!("one of --text or --file is required")),
            };
            call_route(config_path.as_deref(), Route::Summarize, json!({"content": content}), false)
                .await
        }
        Command::Persona { summary_file } => {
            let data = read_json_or_text(&summary_file)?;
            call_route(config_path.as_deref(), Route::GeneratePersona, json!({"data": data}), false)
                .await
        }
        Command::Draft {
            blog_file,
            persona_file,
        } => {
            let body = json!({
                "blog": read_json_or_text(&blog_file)?,
                "persona": read_json_or_text(&persona_file)?,
            });
            call_route(config_path.as_deref(), Route::GeneratePost, body, false).await
        }
        Command::Review {
            post_file,
            persona_file,
            threshold,
        } => {
            let body = json!({
                "post": read_file(&post_file)?,
                "persona": read_json_or_text(&persona_file)?,
                "threshold": threshold,
            });
            call_route(config_path.as_deref(), Route::ReviewPost, body, false).await
        }
        Command::Subreddits { topic } => {
            let body = json!({"topic": topic});
            call_route(config_path.as_deref(), Route::SuggestSubreddits, body, false).await
        }
        Command::Call { route, body } => {
            let body = match body {
                Some(body) => body,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .wrap_err("failed to read request body from stdin")?;
                    buf
                }
            };
            let body: Value = if body.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&body).wrap_err("request body is not valid JSON")?
            };
            let route = Route::from_path(&route).ok_or_else(|| eyre!("Route not found: {route}"))?;
            call_route(config_path.as_deref(), route, body, route == Route::ProcessBlog).await
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = load_config_from(path)?;
            config.apply_env()?;
            config
        }
        None => load_config()?,
    };
    Ok(config)
}

/// Dispatch one request and print the envelope. A failed envelope is still
/// printed before the command reports an error.
async fn call_route(
    config_path: Option<&Path>,
    route: Route,
    body: Value,
    show_progress: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let mut orchestrator = Orchestrator::from_config(&config)?;
    if show_progress {
        orchestrator = orchestrator.with_progress(Arc::new(CliProgress::new()));
    }
    let service = Service::new(Arc::new(orchestrator));

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    info!(route = route.path(), "dispatching request");
    let response: ApiResponse = service.handle(route, body, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.success {
        Ok(())
    } else {
        Err(eyre!(
            "{} failed: {}",
            route.path(),
            response.error.unwrap_or_default()
        ))
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

/// File contents as JSON when they parse, otherwise as a string.
fn read_json_or_text(path: &Path) -> Result<Value> {
    let content = read_file(path)?;
    Ok(parse_json_or_text(&content))
}

fn parse_json_or_text(content: &str) -> Value {
    serde_json::from_str::<Value>(content)
        .ok()
        .filter(|v| v.is_object())
        .unwrap_or_else(|| Value::String(content.trim().to_string()))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr showing the current stage.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, result: &PipelineResult, elapsed: Duration) {
        self.spinner.finish_and_clear();
        info!(
            run_id = %result.run_id,
            success = result.success,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
