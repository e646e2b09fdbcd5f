use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use supportkb_core::config::Config;
use supportkb_core::ResolutionResult;
use supportkb_hybrid::{EngineStats, ResolutionEngine};

mod cli;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    if cli.no_semantic {
        config.search.enabled = false;
    }
    if let Some(kb) = &cli.kb {
        config.knowledge.source = Some(kb.clone());
    }

    let engine = ResolutionEngine::new(config);
    match cli.command {
        Command::Resolve { query } => {
            let result = engine.resolve_query(&query.join(" "));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Command::Similar { query, limit } => {
            let matches = engine.similar_entries(&query.join(" "), limit);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No similar entries.");
            } else {
                for m in matches {
                    println!("{:.3}  {:<28} {}", m.score, m.key, m.entry.problem);
                }
            }
        }
        Command::Stats => {
            let stats = engine.get_stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Command::Rebuild => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
            spinner.set_message("Rebuilding vector index...");
            spinner.enable_steady_tick(Duration::from_millis(120));
            let result = engine.rebuild_index();
            spinner.finish_and_clear();
            let count = result?;
            println!("Rebuilt vector index with {} documents", count);
        }
        Command::Kb => {
            let kb = engine.knowledge_base();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(kb.as_ref())?);
            } else {
                for (key, entry) in kb.iter() {
                    println!("{:<28} [{}] {}", key, entry.category, entry.problem);
                }
                let source = engine.knowledge_source().map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
                println!("{} entries ({})", kb.len(), source);
            }
        }
    }
    Ok(())
}

fn print_result(result: &ResolutionResult) {
    println!("Method:     {}", result.search_method);
    println!("Category:   {}", result.category);
    println!("Confidence: {:.3}", result.confidence);
    println!("Solved:     {}", result.solved);
    if let Some(key) = &result.kb_key {
        println!("Entry:      {}", key);
    }
    if !result.matched_keywords.is_empty() {
        println!("Keywords:   {}", result.matched_keywords.join(", "));
    }
    println!("Solutions:");
    for (i, s) in result.solutions.iter().enumerate() {
        println!("  {}. {}", i + 1, s);
    }
}

fn print_stats(stats: &EngineStats) {
    println!("Status:          {}", stats.index.status);
    println!("Model:           {}", stats.index.model_name);
    println!("Documents:       {}", stats.index.total_documents);
    println!("Index size:      {}", stats.index.index_size);
    println!("Dimension:       {}", stats.index.dimension);
    println!("Index path:      {}", stats.index.index_path.display());
    println!("Built:           {}", stats.index.created_at.as_deref().unwrap_or("-"));
    println!("Knowledge:       {} entries", stats.knowledge_entries);
    println!("Semantic search: {}", if stats.semantic_enabled { "enabled" } else { "disabled" });
    if stats.stale {
        println!("Index is stale: run `supportkb rebuild`");
    }
}
