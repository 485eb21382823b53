//! Worker lifecycle: install (precache) and activate (cleanup).
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |                          |
//!               v                          v
//!           Redundant                  Installed (activate may be retried)
//! ```
//!
//! Install is all-or-nothing: every manifest resource is fetched before
//! anything is written, and the whole set lands in one transaction.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::cache::{CacheDb, CacheEntry};
use crate::config::WorkerConfig;
use crate::fetch::{Fetcher, Request};
use crate::manager::CacheManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never control pages.
    Redundant,
}

/// Point-in-time view of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    /// Set once install succeeds: the new version does not wait for old ones to close.
    pub skip_waiting: bool,
    /// Set once activate succeeds: already-open pages are now controlled.
    pub clients_claimed: bool,
}

pub struct LifecycleController {
    config: Arc<WorkerConfig>,
    cache: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    manager: CacheManager,
    status: RwLock<LifecycleStatus>,
}

impl LifecycleController {
    pub fn new(config: Arc<WorkerConfig>, cache: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let manager = CacheManager::new(cache.clone(), config.app_name.clone());
        Self {
            config,
            cache,
            fetcher,
            manager,
            status: RwLock::new(LifecycleStatus {
                state: LifecycleState::Parsed,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }

    pub async fn status(&self) -> LifecycleStatus {
        *self.status.read().await
    }

    pub async fn state(&self) -> LifecycleState {
        self.status.read().await.state
    }

    /// Whether fetches should go through the caching strategies.
    pub async fn is_active(&self) -> bool {
        self.state().await == LifecycleState::Activated
    }

    /// Precache the manifest into `<app>-<version>`.
    ///
    /// Allowed from `Parsed`, or from `Redundant` to retry a failed install.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any resource is unreachable or
    /// answers with a non-2xx status; nothing is stored in that case.
    pub async fn install(&self) -> Result<(), Error> {
        {
            let mut status = self.status.write().await;
            if !matches!(status.state, LifecycleState::Parsed | LifecycleState::Redundant) {
                return Err(Error::InvalidState(format!("cannot install from {:?}", status.state)));
            }
            status.state = LifecycleState::Installing;
        }

        tracing::info!(
            version = %self.config.version_tag,
            resources = self.config.precache.len(),
            "worker installing"
        );

        match self.precache().await {
            Ok(()) => {
                let mut status = self.status.write().await;
                status.state = LifecycleState::Installed;
                status.skip_waiting = true;
                tracing::info!(version = %self.config.version_tag, "worker installed");
                Ok(())
            }
            Err(err) => {
                self.status.write().await.state = LifecycleState::Redundant;
                tracing::error!(version = %self.config.version_tag, "worker installation failed: {err}");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<(), Error> {
        let stored_at = Utc::now();
        let fetches = self.config.precache.iter().map(|url| {
            let request = Request::get(url.clone());
            async move {
                let response = self
                    .fetcher
                    .fetch(&request)
                    .await
                    .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
                if !response.is_success() {
                    return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status)));
                }
                Ok(CacheEntry::from_response(&request, &response, stored_at))
            }
        });

        let entries = try_join_all(fetches).await?;

        self.cache
            .put_entries(&self.config.cache_name(), &entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("failed to store precache: {e}")))
    }

    /// Delete buckets of other versions and take control of open pages.
    ///
    /// Calling it again once activated is a no-op. Returns the deleted
    /// bucket names.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless installed, or the storage error
    /// that stopped cleanup (the state then reverts to `Installed`).
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        {
            let mut status = self.status.write().await;
            match status.state {
                LifecycleState::Activated => return Ok(Vec::new()),
                LifecycleState::Installed => status.state = LifecycleState::Activating,
                other => return Err(Error::InvalidState(format!("cannot activate from {other:?}"))),
            }
        }

        tracing::info!(version = %self.config.version_tag, "worker activating");

        match self.manager.clear_stale_buckets(&self.config.version_tag).await {
            Ok(deleted) => {
                let mut status = self.status.write().await;
                status.state = LifecycleState::Activated;
                status.clients_claimed = true;
                tracing::info!(version = %self.config.version_tag, deleted = deleted.len(), "worker activated");
                Ok(deleted)
            }
            Err(err) => {
                self.status.write().await.state = LifecycleState::Installed;
                tracing::error!(version = %self.config.version_tag, "worker activation failed: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::fetch::testing::{ScriptedFetcher, status};

    async fn setup(version_tag: &str) -> (CacheDb, Arc<ScriptedFetcher>, Arc<WorkerConfig>, LifecycleController) {
        let app = AppConfig { version_tag: version_tag.into(), ..Default::default() };
        let config = Arc::new(WorkerConfig::from_app(&app).unwrap());
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new());
        for url in &config.precache {
            fetcher.respond(url.as_str(), "asset");
        }
        let lifecycle = LifecycleController::new(config.clone(), db.clone(), fetcher.clone());
        (db, fetcher, config, lifecycle)
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let (db, fetcher, config, lifecycle) = setup("v1").await;

        lifecycle.install().await.unwrap();

        assert_eq!(fetcher.calls(), 8);
        assert_eq!(db.count_entries("zuzusport-v1").await.unwrap(), 8);
        let favicon = Request::get(config.precache[7].clone());
        assert!(db.match_entry("zuzusport-v1", &favicon).await.unwrap().is_some());

        let status = lifecycle.status().await;
        assert_eq!(status.state, LifecycleState::Installed);
        assert!(status.skip_waiting);
        assert!(!status.clients_claimed);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let (db, fetcher, config, lifecycle) = setup("v1").await;
        fetcher.fail(config.precache[4].as_str());

        let result = lifecycle.install().await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(db.count_entries("zuzusport-v1").await.unwrap(), 0);
        assert!(!db.has_bucket("zuzusport-v1").await.unwrap());
        assert_eq!(lifecycle.state().await, LifecycleState::Redundant);
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let (db, fetcher, config, lifecycle) = setup("v1").await;
        let url = config.precache[2].as_str();
        fetcher.respond_with(url, status(url, 404));

        assert!(lifecycle.install().await.is_err());
        assert_eq!(db.count_entries("zuzusport-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_install_blocks_activation() {
        let (_db, fetcher, config, lifecycle) = setup("v1").await;
        fetcher.fail(config.precache[0].as_str());
        let _ = lifecycle.install().await;

        let result = lifecycle.activate().await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(!lifecycle.is_active().await);
    }

    #[tokio::test]
    async fn test_install_retry_after_failure() {
        let (db, fetcher, config, lifecycle) = setup("v1").await;
        let url = config.precache[4].as_str();
        fetcher.fail(url);
        assert!(lifecycle.install().await.is_err());

        fetcher.respond(url, "asset");
        lifecycle.install().await.unwrap();
        assert_eq!(db.count_entries("zuzusport-v1").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (_db, _fetcher, _config, lifecycle) = setup("v1").await;
        assert!(matches!(lifecycle.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(lifecycle.state().await, LifecycleState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_clears_old_versions_and_claims() {
        let (db, _fetcher, _config, lifecycle) = setup("v2").await;
        for name in ["zuzusport-v1", "zuzusport-v1-images", "zuzusport-v2-images"] {
            db.open_bucket(name).await.unwrap();
        }

        lifecycle.install().await.unwrap();
        let mut deleted = lifecycle.activate().await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec!["zuzusport-v1", "zuzusport-v1-images"]);
        let mut remaining = db.list_buckets().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["zuzusport-v2", "zuzusport-v2-images"]);

        let status = lifecycle.status().await;
        assert_eq!(status.state, LifecycleState::Activated);
        assert!(status.clients_claimed);

        assert!(lifecycle.activate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let (_db, _fetcher, _config, lifecycle) = setup("v1").await;
        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::InvalidState(_))));
    }
}
