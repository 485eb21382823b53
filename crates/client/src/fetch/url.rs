//! Request URL canonicalization.
//!
//! URLs handed to the worker from outside may be absolute, scheme-less or
//! origin-relative. They are normalized here so the same resource always
//! maps to the same cache key.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("relative URL without an origin: {0}")]
    NoOrigin(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve `/path` against `origin`
/// 3. Default scheme to https:// if missing
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, origin: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        let origin = origin.ok_or_else(|| UrlError::NoOrigin(trimmed.to_string()))?;
        origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    } else if trimmed.contains("://") {
        Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    } else {
        let rest = trimmed.trim_start_matches('/');
        Url::parse(&format!("https://{rest}")).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
