//! Fetching: HTTP client, request pacing, response validation and browser rendering.

pub mod browser;
pub mod http_client;
pub mod rate_limiter;
pub mod validate;

pub use browser::{BrowserEngineConfig, BrowserFetcher, SessionCookies};
pub use http_client::{FetchError, FetchedPage, HttpClient, HttpResponse};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use validate::ValidationPolicy;
