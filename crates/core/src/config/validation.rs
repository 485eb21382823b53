//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_name` or `version_tag` is empty or contains `-`
    /// - `origin` is not an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - a strategy profile has `max_entries` of 0
    /// - a route or `default_strategy` names an unknown profile
    /// - a route pattern is not a valid regular expression
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Bucket names are split on '-' when old generations are purged.
        for (field, value) in [("app_name", &self.app_name), ("version_tag", &self.version_tag)] {
            if value.is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
            if value.contains('-') {
                return Err(ConfigError::invalid(field, "must not contain '-'"));
            }
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
            }
            Err(e) => return Err(ConfigError::invalid("origin", e.to_string())),
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        for (name, profile) in &self.strategies {
            if profile.max_entries == 0 {
                return Err(ConfigError::invalid(format!("strategies.{name}.max_entries"), "must be greater than 0"));
            }
        }

        if !self.strategies.contains_key(&self.default_strategy) {
            return Err(ConfigError::invalid(
                "default_strategy",
                format!("unknown strategy profile: {}", self.default_strategy),
            ));
        }

        for (i, route) in self.routes.iter().enumerate() {
            if !self.strategies.contains_key(&route.strategy) {
                return Err(ConfigError::invalid(
                    format!("routes[{i}].strategy"),
                    format!("unknown strategy profile: {}", route.strategy),
                ));
            }
            if route.bucket.is_empty() {
                return Err(ConfigError::invalid(format!("routes[{i}].bucket"), "must not be empty"));
            }
            if let Err(e) = regex::Regex::new(&route.pattern) {
                return Err(ConfigError::invalid(format!("routes[{i}].pattern"), e.to_string()));
            }
        }

        if self.precache.is_empty() {
            tracing::warn!("precache manifest is empty; offline fallbacks will never be available");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::strategy::{StrategyConfig, StrategyKind};

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_version_tag_with_dash() {
        let config = AppConfig { version_tag: "v1-beta".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version_tag"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_zero_max_entries() {
        let mut config = AppConfig::default();
        config
            .strategies
            .insert("images".into(), StrategyConfig::new(StrategyKind::CacheFirst, 60, 0));
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "strategies.images.max_entries"));
    }

    #[test]
    fn test_validate_unknown_route_profile() {
        let mut config = AppConfig::default();
        config.routes.push(RouteConfig::new(r"\.mp4$", "video", "media"));
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "routes[5].strategy"));
    }

    #[test]
    fn test_validate_bad_pattern() {
        let mut config = AppConfig::default();
        config.routes[0].pattern = "(unclosed".into();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "routes[0].pattern"));
    }

    #[test]
    fn test_validate_unknown_default_strategy() {
        let config = AppConfig { default_strategy: "missing".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_strategy"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
