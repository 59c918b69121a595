//! Postforge CLI: blog post in, persona-targeted LinkedIn draft out.
//!
//! Every route of the pipeline service is reachable as a subcommand; output
//! is the same JSON envelope a transport would return.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
