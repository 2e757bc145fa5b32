//! Noto command-line client
//!
//! ```bash
//! noto new --name "Groceries"
//! noto import <LIST_ID> notes.md
//! noto show <LIST_ID> --completed-first
//! noto show <LIST_ID> --json
//! noto prompt
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use uuid::Uuid;

use noto::import::LLM_PROMPT;
use noto::view::{group_views, ItemOrder, Progress};
use noto::{create_list, parse_markdown_todos, ImportSummary, ListStore, StoreError, DEFAULT_LIST_NAME};
use noto_backend::domain::DomainError;
use noto_backend::{AppState, BackendConfig, ConfigError, LocalDatastore};

#[derive(Parser)]
#[command(name = "noto")]
#[command(about = "Shared todo lists, addressed by link", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (overrides NOTO_DATABASE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Origin used for share links (overrides NOTO_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Directory for rolling log files (overrides NOTO_LOG_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new list and print its share link
    New {
        #[arg(long)]
        name: Option<String>,
    },

    /// Import checklist text into a list
    Import {
        #[arg(value_name = "LIST_ID")]
        list_id: String,

        /// File to read, or `-` for stdin
        #[arg(value_name = "FILE")]
        source: String,
    },

    /// Print a list with its groups and items
    Show {
        #[arg(value_name = "LIST_ID")]
        list_id: String,

        /// Show completed items before open ones
        #[arg(long)]
        completed_first: bool,

        /// Print the raw list, groups and items as JSON
        #[arg(long, conflicts_with = "completed_first")]
        json: bool,
    },

    /// Print instructions for formatting notes with an LLM
    Prompt,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Logger(#[from] rolling_logger::LoggerError),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid list id {0:?}")]
    InvalidListId(String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Prompt = cli.command {
        println!("{}", LLM_PROMPT);
        return Ok(());
    }

    let mut config = BackendConfig::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    init_logging(&config, cli.verbose)?;

    // Reject malformed ids before touching the database
    let target = match &cli.command {
        Commands::Import { list_id, .. } | Commands::Show { list_id, .. } => Some(parse_id(list_id)?),
        _ => None,
    };

    let state = AppState::init(config).await?;
    let result = match (cli.command, target) {
        (Commands::New { name }, _) => new_list(&state, name.as_deref()).await,
        (Commands::Import { source, .. }, Some(id)) => import(&state, id, &source).await,
        (Commands::Show { completed_first, json, .. }, Some(id)) => {
            show(&state, id, completed_first, json).await
        }
        _ => Ok(()),
    };
    state.db_state.close().await;
    result
}

fn init_logging(config: &BackendConfig, verbose: u8) -> Result<(), CliError> {
    if let Some(dir) = &config.log_dir {
        rolling_logger::init_logger(dir, "noto")?;
        return Ok(());
    }

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    if let Err(e) = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init()
    {
        eprintln!("Logging unavailable: {}", e);
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, CliError> {
    noto::share::parse_list_id(raw.trim()).ok_or_else(|| CliError::InvalidListId(raw.to_string()))
}

async fn new_list(state: &AppState, name: Option<&str>) -> Result<(), CliError> {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_LIST_NAME);
    let id = create_list(state.datastore.as_ref(), name).await?;
    println!("Created \"{}\"", name);
    println!("{}", state.share_url(id));
    Ok(())
}

fn read_source(source: &str) -> Result<String, CliError> {
    let read_err = |source_err: std::io::Error| CliError::Read {
        path: source.to_string(),
        source: source_err,
    };
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(read_err)?;
        Ok(text)
    } else {
        std::fs::read_to_string(source).map_err(read_err)
    }
}

async fn import(state: &AppState, list_id: Uuid, source: &str) -> Result<(), CliError> {
    let text = read_source(source)?;
    let parsed = parse_markdown_todos(&text);
    let preview = ImportSummary::of(&parsed);
    if preview.is_empty() {
        println!("Nothing to import");
        return Ok(());
    }
    println!("Found {}", preview);

    let store = ListStore::new(Arc::clone(&state.datastore), list_id);
    store.load_list(false).await?;
    let imported = store.import_groups(&parsed).await?;
    println!("Imported {}", imported);
    Ok(())
}

async fn show(state: &AppState, list_id: Uuid, completed_first: bool, json: bool) -> Result<(), CliError> {
    let store: ListStore<LocalDatastore> = ListStore::new(Arc::clone(&state.datastore), list_id);
    store.load_list(false).await?;
    let snapshot = store.snapshot().await;

    if json {
        let raw = serde_json::json!({
            "list": snapshot.list,
            "groups": snapshot.groups,
            "items": snapshot.items,
        });
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let name = snapshot.list.as_ref().map(|l| l.name.as_str()).unwrap_or(DEFAULT_LIST_NAME);
    let overall = Progress::of(&snapshot.items);
    println!("{} ({}/{} done)", name, overall.completed, overall.total);
    println!("{}", state.share_url(list_id));

    let order = if completed_first {
        ItemOrder::CompletedFirst
    } else {
        ItemOrder::Insertion
    };
    for view in group_views(&snapshot, order) {
        println!();
        println!("{}  {}/{}", view.group.name, view.progress.completed, view.progress.total);
        for item in view.items {
            println!("  {} {}", if item.done { "✓" } else { "○" }, item.text);
        }
    }
    Ok(())
}
