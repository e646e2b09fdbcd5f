use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "supportkb")]
#[command(version, about = "Resolve support queries against a curated knowledge base", long_about = None)]
pub struct Cli {
    /// Skip the semantic tier and answer from keywords only
    #[arg(long, global = true)]
    pub no_semantic: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Knowledge source (.csv or .json) overriding the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub kb: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a free-text query
    Resolve {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List knowledge entries sharing keywords with a query
    Similar {
        #[arg(required = true)]
        query: Vec<String>,

        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Show vector index status
    Stats,
    /// Rebuild the vector index from the knowledge base
    Rebuild,
    /// List loaded knowledge entries
    Kb,
}
