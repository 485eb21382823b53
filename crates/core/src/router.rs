//! URL routing table.
//!
//! Rules are tested in declaration order against the full URL and then the
//! path; the first match selects the strategy profile and bucket. Requests no
//! rule matches get the default route.

use regex::Regex;
use url::Url;

use crate::config::{AppConfig, ConfigError};
use crate::strategy::StrategyConfig;

/// A compiled routing rule.
#[derive(Debug, Clone)]
pub struct Route {
    /// `None` matches every URL; only the default route uses it.
    pub pattern: Option<Regex>,
    /// Name of the strategy profile, kept for logs and diagnostics.
    pub profile: String,
    pub strategy: StrategyConfig,
    /// Full bucket name, `<app>-<version>-<suffix>`.
    pub bucket: String,
}

impl Route {
    pub fn matches(&self, url: &Url) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(url.as_str()) || pattern.is_match(url.path()),
            None => true,
        }
    }
}

/// Ordered routing table plus the default route.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    routes: Vec<Route>,
    default_route: Route,
}

impl RequestRouter {
    pub fn new(routes: Vec<Route>, default_route: Route) -> Self {
        Self { routes, default_route }
    }

    /// Compile the routing table of a validated config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown profile or a pattern
    /// that does not compile.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let profile = |name: &str, field: String| {
            config.strategies.get(name).copied().ok_or_else(|| ConfigError::Invalid {
                field,
                reason: format!("unknown strategy profile: {name}"),
            })
        };
        let bucket = |suffix: &str| format!("{}-{}", config.cache_name(), suffix);

        let routes = config
            .routes
            .iter()
            .enumerate()
            .map(|(i, rule)| -> Result<Route, ConfigError> {
                let pattern = Regex::new(&rule.pattern).map_err(|e| ConfigError::Invalid {
                    field: format!("routes[{i}].pattern"),
                    reason: e.to_string(),
                })?;
                Ok(Route {
                    pattern: Some(pattern),
                    profile: rule.strategy.clone(),
                    strategy: profile(&rule.strategy, format!("routes[{i}].strategy"))?,
                    bucket: bucket(&rule.bucket),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let default_route = Route {
            pattern: None,
            profile: config.default_strategy.clone(),
            strategy: profile(&config.default_strategy, "default_strategy".into())?,
            bucket: bucket("default"),
        };

        Ok(Self::new(routes, default_route))
    }

    /// First rule matching `url`, if any.
    pub fn route(&self, url: &Url) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(url))
    }

    /// The route to apply: the first match or the default route.
    pub fn resolve(&self, url: &Url) -> &Route {
        self.route(url).unwrap_or(&self.default_route)
    }

    pub fn default_route(&self) -> &Route {
        &self.default_route
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
