//! Caching strategies.
//!
//! ### CacheFirst
//! - Fresh cached entry: served, no network call.
//! - Stale or missing: fetch, store on success, serve the network response.
//! - Network failure: serve the stale entry if there is one.
//!
//! ### NetworkFirst
//! - Fetch, store on success, serve the network response.
//! - Network failure: serve any cached entry regardless of age.
//!
//! ### StaleWhileRevalidate
//! - Always revalidate in a detached task that stores on success.
//! - Cached entry: served without waiting on the revalidation.
//! - Nothing cached: wait for the revalidation and serve its result.
//!
//! Only responses with a 2xx status are stored. Nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::{CacheDb, CacheEntry};
use crate::fetch::{Fetcher, Request, Response};

/// The caching algorithm applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Parameters of one strategy profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(rename = "strategy")]
    pub kind: StrategyKind,
    /// Entries older than this are stale (only CacheFirst consults it).
    pub max_age_seconds: u64,
    /// Eviction ceiling for the bucket this profile writes to.
    pub max_entries: usize,
}

impl StrategyConfig {
    pub const fn new(kind: StrategyKind, max_age_seconds: u64, max_entries: usize) -> Self {
        Self { kind, max_age_seconds, max_entries }
    }
}

/// Runs strategies against the bucket store and the network.
#[derive(Clone)]
pub struct StrategyExecutor {
    cache: CacheDb,
    fetcher: Arc<dyn Fetcher>,
}

impl StrategyExecutor {
    pub fn new(cache: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Serve `request` from `bucket` using the algorithm named by `config`.
    pub async fn execute(&self, request: &Request, bucket: &str, config: &StrategyConfig) -> Result<Response, Error> {
        match config.kind {
            StrategyKind::CacheFirst => self.cache_first(request, bucket, config.max_age_seconds).await,
            StrategyKind::NetworkFirst => self.network_first(request, bucket).await,
            StrategyKind::StaleWhileRevalidate => self.stale_while_revalidate(request, bucket).await,
        }
    }

    async fn cache_first(&self, request: &Request, bucket: &str, max_age_seconds: u64) -> Result<Response, Error> {
        let cached = self.cache.match_entry(bucket, request).await?;

        if let Some(entry) = &cached
            && entry.is_fresh(max_age_seconds, Utc::now())
        {
            tracing::debug!(url = %request.url, bucket, "cache hit");
            return Ok(entry.clone().into_response());
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    store(&self.cache, bucket, request, &response).await;
                }
                Ok(response)
            }
            Err(err) => match cached {
                Some(entry) => {
                    tracing::debug!(url = %request.url, bucket, "network failed, serving stale entry: {err}");
                    Ok(entry.into_response())
                }
                None => Err(err),
            },
        }
    }

    async fn network_first(&self, request: &Request, bucket: &str) -> Result<Response, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    store(&self.cache, bucket, request, &response).await;
                }
                Ok(response)
            }
            Err(err) => match self.cache.match_entry(bucket, request).await? {
                Some(entry) => {
                    tracing::debug!(url = %request.url, bucket, "network failed, serving cached entry: {err}");
                    Ok(entry.into_response())
                }
                None => Err(err),
            },
        }
    }

    async fn stale_while_revalidate(&self, request: &Request, bucket: &str) -> Result<Response, Error> {
        let cached = self.cache.match_entry(bucket, request).await?;

        let revalidation = tokio::spawn(revalidate(
            self.cache.clone(),
            Arc::clone(&self.fetcher),
            request.clone(),
            bucket.to_string(),
        ));

        match cached {
            // Dropping the handle detaches the task; it logs its own failure.
            Some(entry) => {
                tracing::debug!(url = %request.url, bucket, "serving cached entry, revalidating in background");
                Ok(entry.into_response())
            }
            None => revalidation
                .await
                .map_err(|e| Error::Network(format!("revalidation task aborted: {e}")))?,
        }
    }
}

/// Fetch and store on success. Failures are logged here so a detached
/// revalidation never ends with an unobserved error.
async fn revalidate(
    cache: CacheDb, fetcher: Arc<dyn Fetcher>, request: Request, bucket: String,
) -> Result<Response, Error> {
    match fetcher.fetch(&request).await {
        Ok(response) => {
            if response.is_success() {
                store(&cache, &bucket, &request, &response).await;
            }
            Ok(response)
        }
        Err(err) => {
            tracing::debug!(url = %request.url, bucket = %bucket, "revalidation failed: {err}");
            Err(err)
        }
    }
}

/// Stamp and store a response. A failed write does not fail the request.
async fn store(cache: &CacheDb, bucket: &str, request: &Request, response: &Response) {
    let entry = CacheEntry::from_response(request, response, Utc::now());
    if let Err(err) = cache.put_entry(bucket, &entry).await {
        tracing::warn!(url = %request.url, bucket, "failed to store response: {err}");
    }
}
