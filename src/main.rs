use anyhow::Result;
use clap::Parser;

mod auth;
mod cli;
mod config;
mod handlers;
mod router;
mod schemas;
mod test_utils;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.run().await?;

    Ok(())
}
