//! mcp-sw server entry point.
//!
//! Boots the service worker, runs install and activate once, then serves MCP
//! tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{AppConfig, CacheDb, ServiceWorker, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker_config = WorkerConfig::from_app(&config)?;

    tracing::info!(cache = %config.cache_name(), db = %config.db_path.display(), "Starting mcp-sw server on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app(&config))?;
    let worker = Arc::new(ServiceWorker::new(worker_config, cache, Arc::new(fetcher)));

    // Until activation succeeds every request passes straight through.
    match worker.lifecycle().install().await {
        Ok(()) => {
            if let Err(err) = worker.lifecycle().activate().await {
                tracing::error!("activation failed: {err}");
            }
        }
        Err(err) => tracing::error!("install failed: {err}"),
    }

    let handler = handler::McpSwServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
