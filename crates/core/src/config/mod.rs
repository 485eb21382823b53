//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SW_CACHE_*)
//! 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! [`AppConfig`] is the loaded, serializable form. [`WorkerConfig`] is the
//! compiled, immutable form handed to the router, strategies and lifecycle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::strategy::{StrategyConfig, StrategyKind};

mod validation;
mod worker;

pub use validation::ConfigError;
pub use worker::{Fallbacks, WorkerConfig};

/// One entry of the routing table before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Regular expression tested against the full URL and the path.
    pub pattern: String,
    /// Name of a profile in [`AppConfig::strategies`].
    pub strategy: String,
    /// Bucket suffix; the stored name is `<app>-<version>-<bucket>`.
    pub bucket: String,
}

impl RouteConfig {
    fn new(pattern: &str, strategy: &str, bucket: &str) -> Self {
        Self { pattern: pattern.into(), strategy: strategy.into(), bucket: bucket.into() }
    }
}

/// Offline fallback resources, as paths relative to the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            document: Some("/offline.html".into()),
            image: Some("/resources/icon-192x192.png".into()),
            audio: None,
            video: None,
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SW_CACHE_*, nested keys split on `__`)
/// 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix shared by every bucket this worker owns.
    ///
    /// Set via SW_CACHE_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Cache generation. Buckets of any other generation are deleted on activate.
    ///
    /// Set via SW_CACHE_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Site origin that precache and fallback paths are resolved against.
    ///
    /// Set via SW_CACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite bucket store.
    ///
    /// Set via SW_CACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SW_CACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SW_CACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SW_CACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Resources stored into the version bucket on install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Named strategy profiles referenced by routes.
    #[serde(default = "default_strategies")]
    pub strategies: BTreeMap<String, StrategyConfig>,

    /// Routing table, first match wins.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,

    /// Profile applied to requests no route matches.
    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    #[serde(default)]
    pub fallbacks: FallbackConfig,
}

fn default_app_name() -> String {
    "zuzusport".into()
}

fn default_version_tag() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index-he.html",
        "/bundles/critical.css",
        "/bundles/main.js",
        "/resources/optimized/hero-kids.webp",
        "/resources/optimized/hero-kids.jpg",
        "/site.webmanifest",
        "/favicon.ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_strategies() -> BTreeMap<String, StrategyConfig> {
    BTreeMap::from([
        ("critical".into(), StrategyConfig::new(StrategyKind::CacheFirst, 2_592_000, 50)),
        ("static".into(), StrategyConfig::new(StrategyKind::StaleWhileRevalidate, 604_800, 100)),
        ("images".into(), StrategyConfig::new(StrategyKind::CacheFirst, 2_592_000, 200)),
        ("dynamic".into(), StrategyConfig::new(StrategyKind::NetworkFirst, 300, 50)),
    ])
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new(r"\.(?:png|jpg|jpeg|webp|avif|gif|svg)$", "images", "images"),
        RouteConfig::new(r"\.(?:js|css)$", "static", "static-resources"),
        RouteConfig::new(r"^https://fonts\.googleapis\.com", "static", "google-fonts-stylesheets"),
        RouteConfig::new(r"^https://fonts\.gstatic\.com", "critical", "google-fonts-webfonts"),
        RouteConfig::new(r"^https://cdn\.tailwindcss\.com", "static", "tailwind-css"),
    ]
}

fn default_strategy() -> String {
    "dynamic".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version_tag: default_version_tag(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            precache: default_precache(),
            strategies: default_strategies(),
            routes: default_routes(),
            default_strategy: default_strategy(),
            fallbacks: FallbackConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SW_CACHE_`
    /// 2. TOML file from `SW_CACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SW_CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("SW_CACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Extract and validate from an already assembled figment.
    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Full name of the precache bucket, `<app>-<version>`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.app_name, self.version_tag)
    }
}
