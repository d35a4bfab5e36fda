use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use library_search_mcp::config::{Config, ServerMode};
use library_search_mcp::http::serve_http;
use library_search_mcp::mcp::run_stdio;
use library_search_mcp::search::SearchEngine;
use library_search_mcp::session_store::SqliteRequestLog;
use library_search_mcp::store::SqliteFileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout 留给 stdio MCP 协议，日志统一走 stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load_from_path(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };

    let db_path = &config.store.db_path;
    let files = SqliteFileStore::open(db_path)
        .with_context(|| format!("opening file store at {}", db_path.display()))?;
    let requests = SqliteRequestLog::open(db_path)
        .with_context(|| format!("opening request log at {}", db_path.display()))?;
    let engine = Arc::new(SearchEngine::from_config(
        Arc::new(files),
        Arc::new(requests),
        config.clone(),
    ));
    info!(
        mode = ?config.server.mode,
        db = %db_path.display(),
        "library search MCP server starting"
    );

    match config.server.mode {
        ServerMode::Stdio => run_stdio(engine).await?,
        ServerMode::Http => serve_http(engine, &config.server).await?,
        ServerMode::Both => {
            let server = config.server.clone();
            let http_engine = engine.clone();
            let http_task = tokio::spawn(async move { serve_http(http_engine, &server).await });
            let stdio_task = tokio::spawn(run_stdio(engine));
            http_task.await.context("http task panicked")??;
            stdio_task.await.context("stdio task panicked")??;
        }
    }

    Ok(())
}
