//! Transport seam between the Yahoo adapter and the network.
//!
//! Everything the dashboard fetches is a GET returning JSON (or a bare crumb
//! string), so the request type only knows about query parameters, headers
//! and a timeout. Tests swap in a scripted [`HttpClient`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Browser-like agent string; the quote aggregator rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36 tickerdash/0.1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Full URL including the encoded query string.
    pub url: String,
    /// Lower-case header names.
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends `name=value`, percent-encoding the value.
    pub fn query(mut self, name: &str, value: impl AsRef<str>) -> Self {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url.push(separator);
        self.url.push_str(name);
        self.url.push('=');
        self.url.push_str(&urlencoding::encode(value.as_ref()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(existing, _)| *existing != name);
        self.headers.push((name, value.into()));
        self
    }

    /// Sends an explicit cookie, overriding the transport's jar.
    pub fn cookie(self, cookie: Option<&str>) -> Self {
        match cookie {
            Some(cookie) => self.header("cookie", cookie),
            None => self,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Yahoo sometimes answers a throttled call with 200 and a plain-text
    /// "Too Many Requests" body.
    pub fn looks_rate_limited(&self) -> bool {
        self.status == 429 || self.body.to_ascii_lowercase().contains("too many requests")
    }

    /// Consent and error pages come back as HTML instead of JSON.
    pub fn is_html(&self) -> bool {
        let head = self.body.trim_start();
        head.starts_with('<') && (head.contains("<html") || head.contains("<!DOCTYPE"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Transfer(String),
    /// Failures a retry cannot fix.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl HttpError {
    pub const fn retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

    /// Offline transports switch adapters into synthetic mode.
    fn is_mock(&self) -> bool {
        false
    }
}

/// Placeholder transport for offline runs; never touches the network.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute<'a>(
        &'a self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async { Ok(HttpResponse::ok_json("{}")) })
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// reqwest transport with a cookie jar, so the Yahoo session cookie set by
/// the crumb handshake rides along on later calls.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "falling back to a default http client");
                reqwest::Client::new()
            });
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(error: &reqwest::Error) -> HttpError {
    let text = error.to_string();
    if error.is_timeout() {
        HttpError::Timeout(text)
    } else if error.is_connect() {
        HttpError::Connect(text)
    } else if error.is_builder() {
        HttpError::Rejected(text)
    } else {
        HttpError::Transfer(text)
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let builder = request
                .headers
                .iter()
                .fold(self.client.get(&request.url), |builder, (name, value)| {
                    builder.header(name.as_str(), value.as_str())
                })
                .timeout(request.timeout);

            let response = builder.send().await.map_err(|error| classify(&error))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|error| classify(&error))?;
            Ok(HttpResponse { status, body })
        })
    }
}
