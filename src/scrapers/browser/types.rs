//! Browser fetch response types.

use std::time::Duration;

/// Response from browser fetch.
#[derive(Debug, Clone)]
pub struct BrowserFetchResponse {
    pub url: String,
    pub content: String,
    /// Whether `wait_for_selector` appeared before the timeout.
    pub selector_found: bool,
    pub elapsed: Duration,
}
