//! `catalog-search`: catalog CLI with semantic search.
//!
//! # Usage
//!
//! ```text
//! catalog-search [--config <path>] [--log-level <level>] <command>
//!
//! Commands:
//!   add <record.json> [--image <path>]   save a record and index it
//!   get <id>                             print one record
//!   list                                 print every record
//!   delete <id>                          delete a record and its index entry
//!   search <query...> [--explain]        natural-language search
//!   reindex                              rebuild the index from the catalog
//! ```
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (`--config` or `config/default.toml`)
//!   3. Init logger (`--log-level` > `CATALOG_LOG_LEVEL` > config)
//!   4. Open the catalog store and vector index, build the LLM provider
//!   5. Run the command, print JSON to stdout

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use catalog_search::catalog::memory::MemoryCatalogStore;
use catalog_search::catalog::{CatalogRecord, CatalogStore, ImagePayload, RecordId};
use catalog_search::config::{self, Backend, Config};
use catalog_search::error::AppError;
use catalog_search::index::memory::MemoryVectorStore;
use catalog_search::index::{EmbeddingIndex, VectorStore, embedder};
use catalog_search::llm::{ProviderError, providers};
use catalog_search::logger;
use catalog_search::search::{CatalogService, ServiceError};

#[cfg(feature = "sqlite")]
use catalog_search::catalog::sqlite::SqliteCatalogStore;
#[cfg(feature = "sqlite")]
use catalog_search::index::sqlite::SqliteVectorStore;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_args();
    let Some(command) = args.command.as_deref() else {
        print_help();
        return Err(CliError::Usage("no command given".into()));
    };

    let config = match &args.config_path {
        Some(path) => config::load_path(path)?,
        None => config::load()?,
    };

    if let Some(level) = args.log_level.as_deref() {
        logger::parse_level(level)?;
    }
    let effective_log_level = args.log_level.as_deref().unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        service = %config.service_name,
        work_dir = %config.work_dir.display(),
        catalog_backend = ?config.catalog_backend,
        index_backend = ?config.index_backend,
        embedder = %config.embedding.provider,
        llm = %config.llm.provider,
        "config loaded"
    );

    let service = build_service(&config)?;

    match command {
        "add" => {
            let path = args.rest.first().ok_or_else(|| usage("add <record.json> [--image <path>]"))?;
            let record = read_record(Path::new(path))?;
            let image = args.image.as_deref().map(read_image).transpose()?;
            match service.save(record, image).await {
                Ok(saved) => print_json(&saved),
                Err(ServiceError::NotIndexed { record, reason }) => {
                    // The record is stored; report it before failing.
                    print_json(&record)?;
                    Err(ServiceError::NotIndexed { record, reason }.into())
                }
                Err(e) => Err(e.into()),
            }
        }
        "get" => {
            let id = parse_id(args.rest.first(), "get <id>")?;
            match service.get(id).await? {
                Some(record) => print_json(&record),
                None => Err(CliError::Usage(format!("record {id} not found"))),
            }
        }
        "list" => print_json(&service.list().await?),
        "delete" => {
            let id = parse_id(args.rest.first(), "delete <id>")?;
            let deleted = service.delete(id).await?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
        }
        "search" => {
            let query = args.rest.join(" ");
            if query.trim().is_empty() {
                return Err(usage("search <query...> [--explain]"));
            }
            if args.explain {
                print_json(&service.search_report(&query).await?)
            } else {
                print_json(&service.search(&query).await?)
            }
        }
        "reindex" => print_json(&service.reindex_all().await?),
        other => Err(CliError::Usage(format!(
            "unknown command: {other}\n  run 'catalog-search --help' for usage"
        ))),
    }
}

// ── wiring ─────────────────────────────────────────────────────────────────

fn build_service(config: &Config) -> Result<CatalogService<EmbeddingIndex>, CliError> {
    let catalog = open_catalog(config)?;
    let vectors = open_vectors(config)?;
    let embedder = embedder::build(&config.embedding, config.embedding_api_key.clone())?;
    let llm = providers::build(&config.llm, config.llm_api_key.clone())?;

    info!(
        catalog = catalog.backend(),
        index = vectors.backend(),
        embedder = embedder.name(),
        llm = llm.name(),
        "collaborators ready"
    );

    Ok(CatalogService::new(
        catalog,
        EmbeddingIndex::new(embedder, vectors),
        llm,
        config.prompt_template.clone(),
    ))
}

fn open_catalog(config: &Config) -> Result<Arc<dyn CatalogStore>, AppError> {
    match config.catalog_backend {
        Backend::Memory => Ok(Arc::new(MemoryCatalogStore::new())),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Arc::new(SqliteCatalogStore::open(&config.work_dir)?)),
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(sqlite_disabled("catalog")),
    }
}

fn open_vectors(config: &Config) -> Result<Arc<dyn VectorStore>, AppError> {
    match config.index_backend {
        Backend::Memory => Ok(Arc::new(MemoryVectorStore::new())),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Arc::new(SqliteVectorStore::open(&config.work_dir)?)),
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(sqlite_disabled("index")),
    }
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_disabled(section: &str) -> AppError {
    AppError::Config(format!(
        "[{section}] backend \"sqlite\" requires building with the `sqlite` feature"
    ))
}

// ── input / output ─────────────────────────────────────────────────────────

fn read_record(path: &Path) -> Result<CatalogRecord, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Usage(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

fn read_image(path: &Path) -> Result<ImagePayload, CliError> {
    let data = fs::read(path)
        .map_err(|e| CliError::Usage(format!("cannot read image {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImagePayload { content_type: content_type_for(path).to_string(), name, data })
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_id(arg: Option<&String>, usage_line: &str) -> Result<RecordId, CliError> {
    arg.and_then(|s| s.parse::<RecordId>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| usage(usage_line))
}

fn usage(line: &str) -> CliError {
    CliError::Usage(format!("usage: catalog-search {line}"))
}

// ── CLI arg parsing ────────────────────────────────────────────────────────

struct Args {
    config_path: Option<PathBuf>,
    log_level: Option<String>,
    image: Option<PathBuf>,
    explain: bool,
    command: Option<String>,
    rest: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        config_path: None,
        log_level: None,
        image: None,
        explain: false,
        command: None,
        rest: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => args.config_path = iter.next().map(PathBuf::from),
            "--log-level" => args.log_level = iter.next(),
            "--image" => args.image = iter.next().map(PathBuf::from),
            "--explain" => args.explain = true,
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--" => {
                args.rest.extend(iter);
                break;
            }
            _ if args.command.is_none() => args.command = Some(arg),
            _ => args.rest.push(arg),
        }
    }

    args
}

fn print_help() {
    eprintln!("usage: catalog-search [--config <path>] [--log-level <level>] <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  add <record.json> [--image <path>]   save a record and index it");
    eprintln!("  get <id>                             print one record");
    eprintln!("  list                                 print every record");
    eprintln!("  delete <id>                          delete a record and its index entry");
    eprintln!("  search <query...> [--explain]        natural-language search");
    eprintln!("  reindex                              rebuild the index from the catalog");
    eprintln!();
    eprintln!("flags:");
    eprintln!("  --config, -c <path>    config file (default: config/default.toml)");
    eprintln!("  --log-level <level>    override log level");
    eprintln!("  --help,   -h           print this help");
}
