//! HTTP response wrappers.

use std::time::Duration;

use reqwest::{Response, StatusCode};

/// HTTP response wrapper.
pub struct HttpResponse {
    pub status: StatusCode,
    /// Time until response headers arrived.
    pub elapsed: Duration,
    pub(crate) response: Response,
}

impl HttpResponse {
    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get response body as text.
    pub async fn text(self) -> Result<String, reqwest::Error> {
        self.response.text().await
    }
}

/// A fully read page: status line plus body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
    /// Time from send to the end of the body.
    pub elapsed: Duration,
}

impl FetchedPage {
    /// `"200 - OK"` style status text for logs.
    pub fn status_line(&self) -> String {
        format_status(self.status)
    }

    pub fn is_error_status(&self) -> bool {
        self.status.as_u16() >= 400
    }
}

/// `"{code} - {reason}"`, with an empty reason for unknown codes.
pub fn format_status(status: StatusCode) -> String {
    format!(
        "{} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}
