//! Bucket housekeeping: entry-count eviction and stale generation cleanup.

use crate::Error;
use crate::cache::CacheDb;

/// Enforces bucket ceilings and removes buckets of superseded versions.
#[derive(Clone, Debug)]
pub struct CacheManager {
    cache: CacheDb,
    app_name: String,
}

impl CacheManager {
    pub fn new(cache: CacheDb, app_name: impl Into<String>) -> Self {
        Self { cache, app_name: app_name.into() }
    }

    /// Evict the oldest entries until `bucket` holds at most `max_entries`.
    ///
    /// Works from a snapshot of the bucket taken up front, so entries stored
    /// while the pass runs are left for the next one. Returns the number of
    /// entries deleted.
    pub async fn cleanup(&self, bucket: &str, max_entries: usize) -> Result<u64, Error> {
        let mut entries = self.cache.entry_timestamps(bucket).await?;
        if entries.len() <= max_entries {
            return Ok(0);
        }

        entries.sort_by(|(ka, ta), (kb, tb)| ta.cmp(tb).then_with(|| ka.cmp(kb)));
        let excess = entries.len() - max_entries;

        let mut deleted = 0;
        for (key, _) in entries.into_iter().take(excess) {
            if self.cache.delete_entry(bucket, &key).await? {
                deleted += 1;
            }
        }

        tracing::info!(bucket, deleted, max_entries, "cleaned up bucket");
        Ok(deleted)
    }

    /// Run [`cleanup`](Self::cleanup) in a detached task; failures are
    /// logged and never reach the request that triggered it.
    pub fn spawn_cleanup(&self, bucket: &str, max_entries: usize) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let bucket = bucket.to_string();
        tokio::spawn(async move {
            if let Err(err) = manager.cleanup(&bucket, max_entries).await {
                tracing::warn!(bucket = %bucket, "bucket cleanup failed: {err}");
            }
        })
    }

    /// Delete every bucket owned by this app that belongs to a generation
    /// other than `current_tag`.
    ///
    /// Owned buckets are `<app>-<tag>` and `<app>-<tag>-<suffix>`. Buckets
    /// of other apps are left alone. Returns the deleted names.
    pub async fn clear_stale_buckets(&self, current_tag: &str) -> Result<Vec<String>, Error> {
        let prefix = format!("{}-", self.app_name);
        let current = format!("{}{}", prefix, current_tag);
        let current_children = format!("{current}-");

        let stale: Vec<String> = self
            .cache
            .list_buckets()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .filter(|name| *name != current && !name.starts_with(&current_children))
            .collect();

        for name in &stale {
            tracing::info!(bucket = %name, "deleting stale bucket");
            self.cache.delete_bucket(name).await?;
        }

        Ok(stale)
    }

    /// Entry counts per bucket.
    pub async fn bucket_stats(&self) -> Result<Vec<(String, u64)>, Error> {
        self.cache.bucket_counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::fetch::{Request, testing::ok};
    use chrono::{Duration, TimeZone, Utc};
    use url::Url;

    /// Store `n` entries with strictly increasing timestamps; entry `i` is
    /// `https://example.com/img/{i}.png`.
    async fn fill(db: &CacheDb, bucket: &str, n: usize) {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entries: Vec<_> = (0..n)
            .map(|i| {
                let url = format!("https://example.com/img/{i}.png");
                let request = Request::get(Url::parse(&url).unwrap());
                CacheEntry::from_response(&request, &ok(&url, "x"), base + Duration::seconds(i as i64))
            })
            .collect();
        db.put_entries(bucket, &entries).await.unwrap();
    }

    async fn has(db: &CacheDb, bucket: &str, i: usize) -> bool {
        let request = Request::get(Url::parse(&format!("https://example.com/img/{i}.png")).unwrap());
        db.match_entry(bucket, &request).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_cleanup_evicts_oldest_over_ceiling() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        fill(&db, "zuzusport-v1-images", 205).await;

        let deleted = manager.cleanup("zuzusport-v1-images", 200).await.unwrap();

        assert_eq!(deleted, 5);
        assert_eq!(db.count_entries("zuzusport-v1-images").await.unwrap(), 200);
        for i in 0..5 {
            assert!(!has(&db, "zuzusport-v1-images", i).await, "entry {i} should be evicted");
        }
        for i in 5..205 {
            assert!(has(&db, "zuzusport-v1-images", i).await, "entry {i} should remain");
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_most_recent_m() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        fill(&db, "b", 12).await;

        assert_eq!(manager.cleanup("b", 4).await.unwrap(), 8);
        assert_eq!(db.count_entries("b").await.unwrap(), 4);
        for i in 8..12 {
            assert!(has(&db, "b", i).await);
        }
    }

    #[tokio::test]
    async fn test_cleanup_idempotent_at_or_below_ceiling() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        fill(&db, "b", 10).await;

        assert_eq!(manager.cleanup("b", 10).await.unwrap(), 0);
        assert_eq!(manager.cleanup("b", 50).await.unwrap(), 0);
        assert_eq!(manager.cleanup("b", 6).await.unwrap(), 4);
        assert_eq!(manager.cleanup("b", 6).await.unwrap(), 0);
        assert_eq!(db.count_entries("b").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_cleanup_missing_bucket_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db, "zuzusport");
        assert_eq!(manager.cleanup("nope", 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_cleanup_runs_detached() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        fill(&db, "b", 3).await;

        manager.spawn_cleanup("b", 1).await.unwrap();
        assert_eq!(db.count_entries("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_stale_buckets_keeps_current_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        for name in [
            "zuzusport-v1",
            "zuzusport-v1-images",
            "zuzusport-v1-static-resources",
            "zuzusport-v2",
            "zuzusport-v2-images",
            "zuzusport-v2-default",
            "otherapp-v1",
        ] {
            db.open_bucket(name).await.unwrap();
        }

        let mut deleted = manager.clear_stale_buckets("v2").await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec!["zuzusport-v1", "zuzusport-v1-images", "zuzusport-v1-static-resources"]);
        let mut remaining = db.list_buckets().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["otherapp-v1", "zuzusport-v2", "zuzusport-v2-default", "zuzusport-v2-images"]);
    }

    #[tokio::test]
    async fn test_clear_stale_buckets_tag_prefix_is_not_a_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let manager = CacheManager::new(db.clone(), "zuzusport");
        db.open_bucket("zuzusport-v20-images").await.unwrap();

        let deleted = manager.clear_stale_buckets("v2").await.unwrap();
        assert_eq!(deleted, vec!["zuzusport-v20-images"]);
    }
}
