//! Folio Ingest
//!
//! Offline maintenance of the knowledge index:
//! 1. `reindex` rebuilds chunks for every published content row
//! 2. `resume` replaces the resume chunks from a PDF or text file
//! 3. `file` indexes a text or markdown file as a manual entry
//!
//! Each run prints its `IndexReport` as JSON on stdout.

mod errors;
mod extract;

use clap::{Parser, Subcommand};
use errors::IngestError;
use folio_common::{
    auth::hash_password,
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    embeddings::create_embedder,
    knowledge::{ChunkingConfig, IndexReport, Indexer, SourceDocument},
    Repository, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ingest", version, about = "Maintain the Folio knowledge index")]
struct Cli {
    /// Configuration file; defaults to the layered `config/` lookup
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild chunks for every published article, project, skill, story and experience
    Reindex,

    /// Replace the resume chunks
    Resume {
        /// Resume as .pdf, .txt or .md
        path: PathBuf,

        /// Display title used for citations
        #[arg(long, default_value = "Resume")]
        title: String,
    },

    /// Index a text or markdown file as a manual knowledge entry
    File {
        path: PathBuf,

        #[arg(long)]
        title: String,
    },

    /// Print an argon2 hash for `auth.admin_password_hash`
    HashPassword {
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let report = match cli.command {
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            return Ok(());
        }
        Command::Reindex => {
            let (indexer, owner_id) = connect(cli.config.as_deref()).await?;
            indexer.reindex_all(owner_id).await?
        }
        Command::Resume { path, title } => {
            let (indexer, owner_id) = connect(cli.config.as_deref()).await?;
            ingest_resume(&indexer, owner_id, &path, &title).await?
        }
        Command::File { path, title } => {
            let (indexer, owner_id) = connect(cli.config.as_deref()).await?;
            ingest_file(&indexer, owner_id, &path, &title).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.all_failed() {
        anyhow::bail!("none of the {} chunks could be indexed", report.chunks);
    }

    info!(
        inserted = report.inserted,
        failed = report.failed,
        "Ingest complete"
    );
    Ok(())
}

/// Load configuration, start logging and wire the indexer for the configured owner
async fn connect(config_path: Option<&Path>) -> anyhow::Result<(Indexer, Uuid)> {
    let config = match config_path {
        Some(path) => AppConfig::from_file(&path.to_string_lossy())?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.observability);

    info!("Starting Folio Ingest v{}", VERSION);

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let embedder = create_embedder(&config.embedding)?;
    let indexer = Indexer::new(
        Arc::new(Repository::new(db)),
        embedder,
        ChunkingConfig::from(&config.knowledge),
        config.embedding.batch_size,
    );

    Ok((indexer, config.owner_id()))
}

async fn ingest_resume(
    indexer: &Indexer,
    owner_id: Uuid,
    path: &Path,
    title: &str,
) -> Result<IndexReport, IngestError> {
    let text = extract::extract_text(path)?;
    info!(path = %path.display(), chars = text.chars().count(), "Resume text extracted");

    Ok(indexer.index_resume(owner_id, title, &text).await?)
}

async fn ingest_file(
    indexer: &Indexer,
    owner_id: Uuid,
    path: &Path,
    title: &str,
) -> Result<IndexReport, IngestError> {
    let text = extract::extract_text(path)?;
    let entry_id = Uuid::new_v4();
    let metadata = serde_json::json!({ "path": path.display().to_string() });

    info!(path = %path.display(), entry_id = %entry_id, "Indexing file as manual entry");

    let document = SourceDocument::manual(entry_id, title, text, Some(metadata));
    Ok(indexer.index_document(owner_id, &document).await?)
}

/// Logs go to stderr so stdout carries only the report
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
