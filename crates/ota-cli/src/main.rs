//! ota - apply OTA update packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ota_cli::cmd;
use ota_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            package,
            extracted,
            json,
        } => cmd::inspect::inspect(&package, extracted, json),
        Commands::Classify { package } => cmd::classify::classify(&package),
        Commands::Import { file, name, sha256 } => {
            cmd::import::import(&file, name.as_deref(), sha256.as_deref())
        }
        Commands::Apply {
            package,
            extract,
            engine,
        } => cmd::apply::apply(&package, extract, engine, cli.quiet).await,
    }
}
