//! Argument parsing for the `indexer` binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "indexer", about = "Maven repository indexing proxy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the ingestion proxy, serving the two Maven HTTP routes.
    Serve,
    /// Create catalog rows that are normally created out-of-band.
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand)]
pub enum SeedAction {
    /// Insert the default build types (stable, bleeding, unstable).
    BuildTypes,
    /// Register a project, its allowed build types, and an initial
    /// `master` branch.
    Project {
        #[arg(long)]
        group: String,
        #[arg(long)]
        artifact: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        plugin_id: Option<String>,
        #[arg(long)]
        github_owner: String,
        #[arg(long)]
        github_repo: String,
        #[arg(long)]
        use_snapshots: bool,
        #[arg(long)]
        use_semver: bool,
        #[arg(long, value_delimiter = ',')]
        build_types: Vec<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
