//! Response body classification.
//!
//! The portal sometimes returns usable record data with a 5xx status and
//! sometimes an error banner with 200, so usability is judged from content.

use serde::{Deserialize, Serialize};

/// Minimum trimmed body length for a usable page.
pub const MIN_BODY_CHARS: usize = 100;

/// Structural markers required before a page counts as usable.
pub const MIN_INDICATORS: usize = 3;

/// Banners that make a page unusable regardless of other content.
pub const CRITICAL_ERRORS: &[&str] = &[
    "HTTP ERROR 404",
    "HTTP ERROR 502",
    "HTTP ERROR 503",
    "Gateway Timeout",
    "Service Temporarily Unavailable",
    "Connection refused",
    "ECONNREFUSED",
    "<title>Error</title>",
    "<h1>Internal Server Error</h1>",
];

/// Markers of the detail-page template.
pub const DETAIL_INDICATORS: &[&str] = &[
    ".product-form-details",
    ".product-form-label",
    "#accordion-1a",
    "#accordion-2a",
    "#accordion-3a",
    "Số đơn và Ngày nộp đơn",
    "Chủ đơn/Chủ bằng",
    "Tác giả",
    "Đại diện SHCN",
    "class=\"row\"",
    "col-md-",
];

/// Error strings checked by the legacy policy.
pub const LEGACY_ERRORS: &[&str] = &[
    "An unexpected server error has occurred",
    "${appltype}",
    "HTTP ERROR 404",
    "HTTP ERROR 500",
    "HTTP ERROR 502",
    "HTTP ERROR 503",
    "Gateway Timeout",
    "Service Temporarily Unavailable",
];

/// How fetched bodies are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Positive evidence: long enough, no critical banner, enough template markers.
    #[default]
    Content,
    /// Negative evidence only: reject bodies containing a known error string.
    ErrorStrings,
}

impl ValidationPolicy {
    pub fn is_usable(&self, body: &str) -> bool {
        match self {
            ValidationPolicy::Content => has_usable_data(body),
            ValidationPolicy::ErrorStrings => !is_error_text(body),
        }
    }
}

/// Content heuristic for detail pages.
pub fn has_usable_data(body: &str) -> bool {
    if body.trim().chars().count() < MIN_BODY_CHARS {
        return false;
    }
    if CRITICAL_ERRORS.iter().any(|e| body.contains(e)) {
        return false;
    }
    indicator_count(body) >= MIN_INDICATORS
}

/// Number of distinct template markers present in `body`.
pub fn indicator_count(body: &str) -> usize {
    DETAIL_INDICATORS
        .iter()
        .filter(|marker| body.contains(*marker))
        .count()
}

/// Legacy check: empty bodies and known error strings are errors.
pub fn is_error_text(body: &str) -> bool {
    body.trim().is_empty() || LEGACY_ERRORS.iter().any(|e| body.contains(e))
}
