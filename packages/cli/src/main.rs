//! Tech Tree command-line tool
//!
//! # Usage
//!
//! ```bash
//! # Verify the graph store is reachable
//! techtree check
//!
//! # Migrate a document-store export (directory with nodes.json/edges.json,
//! # or a single {"nodes": [...], "edges": [...]} file)
//! techtree migrate ./export --concurrency 16
//! techtree migrate ./export.json --dry-run
//!
//! # Print the whole tech tree as JSON
//! techtree export > tree.json
//! ```
//!
//! # Environment Variables
//!
//! - `TECHTREE_DB_PATH`: Database location (default: `~/.techtree/database/techtree.db`)
//! - `TECHTREE_NAMESPACE` / `TECHTREE_DATABASE`: SurrealDB namespace and database
//! - `TECHTREE_RETRY_MAX_ATTEMPTS`, `TECHTREE_CALL_TIMEOUT_MS`: Store call retry bounds
//! - `TECHTREE_MIGRATION_CONCURRENCY`: Records in flight per migration phase
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//!
//! Logs go to stderr; JSON output goes to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use techtree_core::config::GraphConfig;
use techtree_core::db::{GraphStore, SurrealStore};
use techtree_core::services::{
    ConsistentGraph, GraphService, JsonExportSource, MigrationEngine, MigrationOptions,
    RetryPolicy,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Tech tree graph tools")]
struct Cli {
    #[arg(long, help = "Database path (overrides TECHTREE_DB_PATH)")]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the graph store answers a trivial query
    Check,

    /// Migrate a document-store export into the graph
    Migrate {
        #[arg(help = "Export directory or single JSON file")]
        source: PathBuf,

        #[arg(long, help = "Records in flight per phase")]
        concurrency: Option<usize>,

        #[arg(long, help = "Map and check records without writing")]
        dry_run: bool,
    },

    /// Print the whole tech tree as JSON
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = GraphConfig::from_env().context("Invalid TECHTREE_* environment")?;
    if let Some(path) = cli.db_path {
        config.database_path = path;
    }
    if let Command::Migrate {
        concurrency: Some(concurrency),
        ..
    } = &cli.command
    {
        config.migration.concurrency = *concurrency;
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!("Database: {}", config.database_path.display());

    let store = SurrealStore::open(&config).await.with_context(|| {
        format!(
            "Failed to open graph store at {}",
            config.database_path.display()
        )
    })?;
    let store: Arc<dyn GraphStore> = Arc::new(store);
    let graph = ConsistentGraph::new(store, RetryPolicy::from(&config.retry));

    // An unreachable store is fatal before any command runs
    graph
        .health_check()
        .await
        .context("Graph store health check failed")?;

    match cli.command {
        Command::Check => {
            tracing::info!("Graph store is reachable");
            println!("ok");
        }
        Command::Migrate {
            source, dry_run, ..
        } => {
            let engine = MigrationEngine::new(
                graph,
                MigrationOptions {
                    concurrency: config.migration.concurrency,
                    dry_run,
                },
            );
            let report = engine
                .run(&JsonExportSource::new(&source))
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;

            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.is_clean() {
                anyhow::bail!(
                    "{} node and {} edge record(s) failed",
                    report.counts.nodes_failed,
                    report.counts.edges_failed
                );
            }
        }
        Command::Export => {
            let view = GraphService::from_graph(graph)
                .tech_tree()
                .await
                .context("Failed to read tech tree")?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}
