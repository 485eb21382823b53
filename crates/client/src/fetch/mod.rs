//! HTTP fetch pipeline used by the worker.
//!
//! ### Behavior
//! - Any HTTP status is a successful fetch; strategies decide what to store.
//! - Transport failures map to `NETWORK_ERROR`, timeouts to `FETCH_TIMEOUT`.
//! - Bodies over `max_bytes` fail with `FETCH_TOO_LARGE`.
//! - Max redirects: 5; gzip, brotli and deflate are decoded.

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

pub use self::url::{UrlError, canonicalize};

use swcache_core::{AppConfig, Error, Fetcher, Request, Response, ResponseSource};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &::url::Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

/// Flatten a header map; repeated headers are joined with ", ".
fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { url: final_url, status: status.as_u16(), headers, body: body.to_vec(), source: ResponseSource::Network })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_core::Destination;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig { max_bytes: 64, timeout: Duration::from_millis(500), ..Default::default() })
            .unwrap()
    }

    fn get(server: &MockServer, p: &str) -> Request {
        Request::get(::url::Url::parse(&format!("{}{}", server.uri(), p)).unwrap())
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "zuzusport-sw/1.0".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, "zuzusport-sw/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut headers = header::HeaderMap::new();
        headers.append("vary", "accept".parse().unwrap());
        headers.append("vary", "origin".parse().unwrap());
        headers.insert("content-type", "text/css".parse().unwrap());

        let out = collect_headers(&headers);
        assert_eq!(out["vary"], "accept, origin");
        assert_eq!(out["content-type"], "text/css");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bundles/main.js"))
            .and(header_is("user-agent", "swcache/0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("console.log(1)", "application/javascript"))
            .mount(&server)
            .await;

        let response = fetcher().fetch(&get(&server, "/bundles/main.js")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"console.log(1)");
        assert_eq!(response.content_type(), Some("application/javascript"));
        assert_eq!(response.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = fetcher().fetch(&get(&server, "/missing.png")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_method_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/contact"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let url = ::url::Url::parse(&format!("{}/api/contact", server.uri())).unwrap();
        let request = Request::new("POST", url, Destination::Other);
        assert_eq!(fetcher().fetch(&request).await.unwrap().status, 201);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 1024]))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&get(&server, "/big")).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&get(&server, "/slow")).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let request = Request::get(::url::Url::parse(&format!("http://127.0.0.1:{port}/gone")).unwrap());

        let result = fetcher().fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
