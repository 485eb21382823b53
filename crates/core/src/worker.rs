//! Worker facade: the event entry points the host delivers.
//!
//! A fetch event is filtered (GET over http/https only), routed, served by
//! the selected strategy and followed by a detached bucket cleanup. When the
//! strategy fails, documents and images may still be answered with an offline
//! fallback from the precache bucket.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::CacheDb;
use crate::config::WorkerConfig;
use crate::fetch::{Destination, Fetcher, Request, Response, ResponseSource};
use crate::lifecycle::LifecycleController;
use crate::manager::CacheManager;
use crate::strategy::StrategyExecutor;

/// Messages a page may post to the worker. None of them expect a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Diagnostic timing data collected by the page.
    PerformanceLog {
        #[serde(default)]
        data: serde_json::Value,
    },
}

pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    cache: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    executor: StrategyExecutor,
    manager: CacheManager,
    lifecycle: LifecycleController,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, cache: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let config = Arc::new(config);
        Self {
            executor: StrategyExecutor::new(cache.clone(), Arc::clone(&fetcher)),
            manager: CacheManager::new(cache.clone(), config.app_name.clone()),
            lifecycle: LifecycleController::new(Arc::clone(&config), cache.clone(), Arc::clone(&fetcher)),
            config,
            cache,
            fetcher,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub fn manager(&self) -> &CacheManager {
        &self.manager
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Handle an intercepted request.
    ///
    /// Non-GET requests, non-http(s) URLs and every request made before
    /// activation go straight to the network.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, Error> {
        if !request.is_get() || !request.is_http() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return self.passthrough(&request).await;
        }

        if !self.lifecycle.is_active().await {
            tracing::debug!(url = %request.url, "worker not active, passing through");
            return self.passthrough(&request).await;
        }

        let route = self.config.router.resolve(&request.url);
        let routed = self.config.router.route(&request.url).is_some();

        match self.executor.execute(&request, &route.bucket, &route.strategy).await {
            Ok(response) => {
                self.manager.spawn_cleanup(&route.bucket, route.strategy.max_entries);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(url = %request.url, profile = %route.profile, "cache strategy failed: {err}");

                // Unrouted requests only fall back for documents.
                if (routed || request.destination == Destination::Document)
                    && let Some(fallback) = self.offline_fallback(request.destination).await
                {
                    return Ok(fallback);
                }
                Err(err)
            }
        }
    }

    async fn passthrough(&self, request: &Request) -> Result<Response, Error> {
        let mut response = self.fetcher.fetch(request).await?;
        response.source = ResponseSource::Passthrough;
        Ok(response)
    }

    /// The precached fallback for `destination`, if configured and stored.
    async fn offline_fallback(&self, destination: Destination) -> Option<Response> {
        let url = self.config.fallbacks.for_destination(destination)?;
        match self.cache.match_entry(&self.config.cache_name(), &Request::get(url.clone())).await {
            Ok(Some(entry)) => {
                tracing::debug!(%url, "serving offline fallback");
                let mut response = entry.into_response();
                response.source = ResponseSource::Fallback;
                Some(response)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%url, "offline fallback lookup failed: {err}");
                None
            }
        }
    }

    pub fn handle_message(&self, message: &WorkerMessage) {
        match message {
            WorkerMessage::PerformanceLog { data } => {
                tracing::info!(version = %self.config.version_tag, %data, "performance data");
            }
        }
    }

    /// Decode and handle a raw message. Returns whether it was recognized;
    /// unknown messages are ignored.
    pub fn handle_raw_message(&self, raw: serde_json::Value) -> bool {
        match serde_json::from_value::<WorkerMessage>(raw) {
            Ok(message) => {
                self.handle_message(&message);
                true
            }
            Err(e) => {
                tracing::debug!("ignoring unrecognized message: {e}");
                false
            }
        }
    }
}
