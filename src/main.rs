//! # CivicMind CLI (`civi`)
//!
//! The `civi` binary is the primary interface for CivicMind. It runs
//! single queries, an interactive chat loop, store statistics, cache
//! maintenance, and the JSON HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! civi --config ./config/civicmind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `civi ask "<query>"` | Run one query through the pipeline |
//! | `civi chat` | Interactive chat loop over stdin |
//! | `civi stats` | Cache and knowledge-store overview |
//! | `civi cache clear` | Clear cached responses |
//! | `civi serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # One-off question
//! civi ask "Water supply issue in Adyar"
//!
//! # Pipe a batch of queries
//! cat queries.txt | civi chat
//!
//! # Drop cache entries older than two days
//! civi cache clear --older-than-hours 48
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

use civicmind::config;
use civicmind::pipeline::Pipeline;
use civicmind::server;
use civicmind::stats;

/// CivicMind CLI — a civic-assistant query core for Chennai.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. Without one, built-in defaults are used and the
/// bundled data files are expected under `./data/`.
#[derive(Parser)]
#[command(
    name = "civi",
    about = "CivicMind — a civic-assistant query core for Chennai",
    version,
    long_about = "CivicMind routes civic queries to the responsible department, caches \
    responses with a TTL, reasons over a static civic knowledge graph, and composes \
    answers through a pluggable generation provider with a deterministic fallback."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/civicmind.toml`; a missing file falls back
    /// to built-in defaults.
    #[arg(long, global = true, default_value = "./config/civicmind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run one query through the pipeline and print the response.
    Ask {
        /// The civic query, e.g. "Water supply issue in Adyar".
        query: String,
    },

    /// Interactive chat loop: reads one query per line from stdin.
    ///
    /// When stdin is a terminal a prompt is shown; when piped, queries
    /// are processed silently in order.
    Chat,

    /// Print cache and knowledge-store statistics.
    Stats,

    /// Cache maintenance.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Start the JSON HTTP server.
    Serve,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Delete cached responses, optionally only old ones.
    Clear {
        /// Only delete entries older than this many hours.
        #[arg(long)]
        older_than_hours: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ask { query } => {
            let mut pipeline = Pipeline::new(config);
            let result = pipeline.process(&query).await;
            print_result(&result);
        }
        Commands::Chat => {
            run_chat(config).await?;
        }
        Commands::Stats => {
            stats::run_stats(&config)?;
        }
        Commands::Cache { command } => match command {
            CacheCommands::Clear { older_than_hours } => {
                let mut pipeline = Pipeline::new(config);
                let removed = pipeline.clear_cache(older_than_hours);
                println!("Removed {} cached records", removed);
            }
        },
        Commands::Serve => {
            server::run_server(config).await?;
        }
    }

    Ok(())
}

/// Interactive loop: one query per stdin line until EOF.
async fn run_chat(config: config::Config) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let mut pipeline = Pipeline::new(config);

    if interactive {
        println!("CivicMind chat — ask about any civic issue in Chennai. Ctrl-D to exit.");
    }

    let stdin = std::io::stdin();
    loop {
        if interactive {
            print!("you> ");
            use std::io::Write;
            std::io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        let result = pipeline.process(query).await;
        print_result(&result);
        println!();
    }

    Ok(())
}

fn print_result(result: &civicmind::models::PipelineResult) {
    println!("{}", result.response);
    println!();
    println!(
        "[{} | {:.2}s | {}]",
        result.department,
        result.processing_time,
        if result.cache_hit { "cached" } else { "live" }
    );
    if !result.sources.is_empty() {
        println!("Sources: {}", result.sources.join("; "));
    }
}
