//! cache_cleanup tool implementation.
//!
//! Trims a bucket to its newest `max_entries` entries.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, ServiceWorker};

use crate::tools::json_result;

/// Parameters for the cache_cleanup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheCleanupParams {
    /// Full bucket name, e.g. "zuzusport-v1-images".
    pub bucket: String,

    /// Keep only the newest N entries.
    pub max_entries: usize,
}

/// Output from the cache_cleanup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheCleanupOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Entries left in the bucket.
    pub remaining: u64,
}

/// Implementation of the cache_cleanup tool.
pub async fn cleanup_impl(worker: &ServiceWorker, params: CacheCleanupParams) -> Result<CallToolResult, McpError> {
    if params.max_entries == 0 {
        return Err(Error::InvalidInput("max_entries must be greater than 0".into()).into());
    }

    if !worker.cache().has_bucket(&params.bucket).await? {
        return Err(Error::CacheMiss(format!("no bucket named {}", params.bucket)).into());
    }

    let deleted = worker.manager().cleanup(&params.bucket, params.max_entries).await?;
    let remaining = worker.cache().count_entries(&params.bucket).await?;

    json_result(&CacheCleanupOutput { deleted, remaining })
}
