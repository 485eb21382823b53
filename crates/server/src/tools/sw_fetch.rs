//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker and reports how it was answered.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{UrlError, canonicalize};
use swcache_core::{Destination, Error, Request, ResponseSource, ServiceWorker};
use url::Url;

use super::json_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    /// Non-http(s) URLs pass through uncached.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// What the page will use the response for (document, image, ...).
    #[serde(default)]
    pub destination: Destination,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The canonical request URL.
    pub url: String,
    /// URL of the response (after redirects, or the fallback's URL).
    pub response_url: String,
    pub status: u16,
    /// Where the bytes came from: network, cache, fallback or passthrough.
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_len: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    // Other schemes are never cached; the worker hands them to the network as is.
    let url = match canonicalize(&params.url, Some(&worker.config().origin)) {
        Ok(url) => url,
        Err(UrlError::UnsupportedScheme(_)) => {
            Url::parse(params.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(Error::InvalidUrl(e.to_string()).into()),
    };
    let request = Request::new(params.method.trim(), url, params.destination);
    let requested = request.url.to_string();

    let response = worker.handle_fetch(request).await?;

    let output = SwFetchOutput {
        url: requested,
        content_type: response.content_type().map(str::to_string),
        body_len: response.body.len(),
        response_url: response.url,
        status: response.status,
        source: response.source,
        headers: response.headers,
        body: String::from_utf8(response.body).ok(),
    };

    json_result(&output)
}
