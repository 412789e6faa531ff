mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod index;
mod memory;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use memory::types::{Caller, ListFilter, PrivacyLevel};

#[derive(Parser)]
#[command(name = "mnemo", version, about = "Semantic memory store for a personal AI assistant")]
struct Cli {
    /// Owner id attached to every operation
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    /// Act with the admin override for update/delete
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory
    Add {
        content: String,
        #[arg(long, default_value = "private")]
        privacy: PrivacyLevel,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        group: Option<String>,
    },
    /// Search memories by meaning
    Search {
        query: String,
        /// Result count (defaults to retrieval.default_k from config)
        #[arg(short, long)]
        k: Option<usize>,
        /// Similarity floor (defaults to retrieval.min_similarity from config)
        #[arg(long)]
        min_similarity: Option<f32>,
        #[arg(long)]
        group: Option<String>,
    },
    /// List visible memories, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page size (defaults to retrieval.list_page_limit from config)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        privacy: Option<PrivacyLevel>,
    },
    /// Delete a memory by id
    Forget { id: String },
    /// Delete unpinned memories older than a cutoff
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Show per-owner statistics
    Stats,
    /// Rebuild the vector index from stored embeddings
    Reindex,
    /// Export memories as JSON
    Export {
        #[arg(long, value_delimiter = ',')]
        privacy: Vec<PrivacyLevel>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import memories from a JSON export
    Import { input: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level and paths)
    let config = config::MnemoConfig::load()?;

    // Initialize tracing with the configured log level, writing to stderr.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let caller = if cli.admin {
        Caller::admin(cli.owner.clone())
    } else {
        Caller::user(cli.owner.clone())
    };

    match cli.command {
        Command::Add {
            content,
            privacy,
            tags,
            source,
            group,
        } => cli::add::add(
            &config,
            &caller,
            &content,
            privacy,
            &tags,
            source.as_deref(),
            group.as_deref(),
        ),
        Command::Search {
            query,
            k,
            min_similarity,
            group,
        } => cli::search::search(&config, &caller, &query, k, min_similarity, group.as_deref()),
        Command::List {
            page,
            limit,
            tag,
            source,
            group,
            privacy,
        } => {
            let filter = ListFilter {
                group_id: group,
                tag,
                source,
                privacy,
            };
            cli::list::list(&config, &caller, page, limit, &filter)
        }
        Command::Forget { id } => cli::forget::forget(&config, &caller, &id),
        Command::Cleanup { days } => cli::cleanup::cleanup(&config, days),
        Command::Stats => cli::stats::stats(&config, &caller.id),
        Command::Reindex => cli::reindex::reindex(&config),
        Command::Export { privacy, output } => {
            let levels = if privacy.is_empty() {
                None
            } else {
                Some(privacy.as_slice())
            };
            cli::export::export(&config, &caller, levels, output.as_deref())
        }
        Command::Import { input } => cli::import::import(&config, &caller, &input),
    }
}
