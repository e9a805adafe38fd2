//! Adjudicator CLI
//!
//! Runs the HTTP server or answers a single query from the command line.

use adjudicator_server::cli::{Cli, Command};
use adjudicator_server::config::ServerConfig;
use adjudicator_server::{ask, start_server};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `ask` output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            eprintln!("Warning: No config file specified, using default configuration");
            eprintln!("Usage: adjudicator --config <path-to-config.toml> <COMMAND>");
            eprintln!();
            ServerConfig::default()
        }
    };

    match cli.command {
        Command::Serve => start_server(config).await?,
        Command::Ask(args) => {
            let report = ask(&config, &args.document, &args.query, args.top_k)
                .await
                .with_context(|| format!("Failed to answer query against {}", args.document.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
