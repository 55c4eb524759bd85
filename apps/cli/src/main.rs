//! secfeed CLI: security knowledge collection and distribution.
//!
//! Collects security resources from GitHub, web search, and cheat-sheet
//! pages, persists them locally, and fans them out to subscriber channels.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // Credentials come from the environment; a local .env is a convenience.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
