//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Adjudicator - insurance policy question answering over uploaded documents.
#[derive(Debug, Parser)]
#[command(name = "adjudicator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ADJUDICATOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Index one document and answer one query against it
    Ask(AskArgs),
}

/// Arguments for the ask command.
#[derive(Debug, Parser)]
pub struct AskArgs {
    /// Policy document (PDF or DOCX)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Free-text query
    #[arg(short, long)]
    pub query: String,

    /// Number of clauses to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}
