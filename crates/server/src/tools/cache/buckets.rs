//! cache_buckets tool implementation.
//!
//! Lists every bucket with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::ServiceWorker;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketInfo {
    pub name: String,
    pub entries: u64,
    /// Whether the bucket belongs to the running version.
    pub current: bool,
}

/// Output from the cache_buckets tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheBucketsOutput {
    pub buckets: Vec<BucketInfo>,
}

/// Implementation of the cache_buckets tool.
pub async fn buckets_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let cache_name = worker.config().cache_name();
    let runtime_prefix = format!("{cache_name}-");

    let buckets = worker
        .manager()
        .bucket_stats()
        .await?
        .into_iter()
        .map(|(name, entries)| {
            let current = name == cache_name || name.starts_with(&runtime_prefix);
            BucketInfo { name, entries, current }
        })
        .collect();

    json_result(&CacheBucketsOutput { buckets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_buckets_empty() {
        let worker = testing::worker(&[]).await;

        let output: CacheBucketsOutput = testing::output(&buckets_impl(&worker).await.unwrap());
        assert!(output.buckets.is_empty());
    }

    #[tokio::test]
    async fn test_buckets_after_install() {
        let worker = testing::worker(&[]).await;
        worker.lifecycle().install().await.unwrap();
        worker.cache().open_bucket("zuzusport-v0-images").await.unwrap();

        let output: CacheBucketsOutput = testing::output(&buckets_impl(&worker).await.unwrap());
        assert_eq!(output.buckets.len(), 2);

        let precache = output.buckets.iter().find(|b| b.name == "zuzusport-v1").unwrap();
        assert_eq!(precache.entries, 2);
        assert!(precache.current);

        let old = output.buckets.iter().find(|b| b.name == "zuzusport-v0-images").unwrap();
        assert_eq!(old.entries, 0);
        assert!(!old.current);
    }
}
