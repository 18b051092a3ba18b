//! HTTP client with slot-based rate limiting and per-request timeouts.

mod response;
mod user_agent;

pub use response::{format_status, FetchedPage, HttpResponse};
pub use user_agent::{
    random_accept_language, random_user_agent, resolve_user_agent, ACCEPT_LANGUAGES,
    IMPERSONATE_USER_AGENTS, USER_AGENT,
};

use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::rate_limiter::RateLimiter;

/// Errors from a single fetch. All of them are retryable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to read body: {0}")]
    Body(reqwest::Error),

    #[error("Failed to create HTTP client: {0}")]
    Build(String),
}

/// HTTP client shared by all workers of a run.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::with_user_agent(timeout, None)
    }

    /// Create a new HTTP client with custom user agent configuration.
    /// - None: Use default ipacquire user agent
    /// - Some("impersonate"): Use random real browser user agent
    /// - Some(custom): Use custom user agent string
    pub fn with_user_agent(
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Build(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: timeout,
            rate_limiter: None,
        })
    }

    /// Acquire a slot from `rate_limiter` before every request.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Make a GET request with extra headers.
    pub async fn get_with_headers(
        &self,
        url: &str,
        extra_headers: &[(&str, String)],
    ) -> Result<HttpResponse, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let mut request = self.client.get(url);
        for (name, value) in extra_headers {
            request = request.header(*name, value);
        }

        let start = Instant::now();
        let response = tokio::time::timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| FetchError::Timeout(self.request_timeout))??;
        let elapsed = start.elapsed();

        debug!("GET {} -> {} in {:?}", url, response.status(), elapsed);

        Ok(HttpResponse {
            status: response.status(),
            elapsed,
            response,
        })
    }

    /// GET and read the whole body, whatever the status code.
    ///
    /// Sending and reading together race a single `request_timeout`.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let request = self.client.get(url);

        let start = Instant::now();
        let fetch = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await.map_err(FetchError::Body)?;
            Ok::<_, FetchError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.request_timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout(self.request_timeout))??;

        Ok(FetchedPage {
            status,
            body,
            elapsed: start.elapsed(),
        })
    }
}
