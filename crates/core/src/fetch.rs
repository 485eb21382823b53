//! Request/response types and the network seam.
//!
//! The worker never talks to the network directly. Everything goes through
//! a [`Fetcher`], which `swcache-client` implements with reqwest and tests
//! replace with scripted doubles.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Name of the synthetic header carrying the time an entry was stored.
pub const CACHE_DATE_HEADER: &str = "sw-cache-date";

/// The kind of resource a request is for, as reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Audio,
    Video,
    Script,
    Style,
    Font,
    #[default]
    Other,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// Build a request; the method is normalized to upper case.
    pub fn new(method: &str, url: Url, destination: Destination) -> Self {
        Self { method: method.to_ascii_uppercase(), url, destination }
    }

    /// Shorthand for a GET request with no particular destination.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, Destination::Other)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Only http and https requests are eligible for caching.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }
}

/// Where a response's bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
    Passthrough,
}

/// A response returned to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    /// Header names are lower case.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Performs network fetches on behalf of the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the request from the network.
    ///
    /// Any HTTP status is a successful fetch; `Err` means the request never
    /// produced a response.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
