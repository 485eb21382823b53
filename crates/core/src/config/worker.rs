//! Compiled worker configuration.

use url::Url;

use super::{AppConfig, ConfigError};
use crate::fetch::Destination;
use crate::router::RequestRouter;

/// Offline fallback resources resolved against the origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallbacks {
    pub document: Option<Url>,
    pub image: Option<Url>,
    pub audio: Option<Url>,
    pub video: Option<Url>,
}

impl Fallbacks {
    pub fn for_destination(&self, destination: Destination) -> Option<&Url> {
        match destination {
            Destination::Document => self.document.as_ref(),
            Destination::Image => self.image.as_ref(),
            Destination::Audio => self.audio.as_ref(),
            Destination::Video => self.video.as_ref(),
            _ => None,
        }
    }
}

/// Everything the worker needs, fixed for the lifetime of one version.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub app_name: String,
    pub version_tag: String,
    pub origin: Url,
    pub precache: Vec<Url>,
    pub router: RequestRouter,
    pub fallbacks: Fallbacks,
}

impl WorkerConfig {
    /// Compile a loaded config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if validation fails or a precache or
    /// fallback path cannot be resolved against the origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let origin = Url::parse(&config.origin).map_err(|e| ConfigError::Invalid {
            field: "origin".into(),
            reason: e.to_string(),
        })?;
        let resolve = |field: &str, path: &str| {
            origin.join(path).map_err(|e| ConfigError::Invalid {
                field: field.to_string(),
                reason: format!("{path}: {e}"),
            })
        };
        let resolve_opt = |field: &str, path: &Option<String>| path.as_deref().map(|p| resolve(field, p)).transpose();

        let precache = config
            .precache
            .iter()
            .map(|path| resolve("precache", path))
            .collect::<Result<Vec<_>, _>>()?;

        let fallbacks = Fallbacks {
            document: resolve_opt("fallbacks.document", &config.fallbacks.document)?,
            image: resolve_opt("fallbacks.image", &config.fallbacks.image)?,
            audio: resolve_opt("fallbacks.audio", &config.fallbacks.audio)?,
            video: resolve_opt("fallbacks.video", &config.fallbacks.video)?,
        };

        Ok(Self {
            app_name: config.app_name.clone(),
            version_tag: config.version_tag.clone(),
            router: RequestRouter::from_config(config)?,
            origin,
            precache,
            fallbacks,
        })
    }

    /// Name of the precache bucket, `<app>-<version>`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.app_name, self.version_tag)
    }
}
