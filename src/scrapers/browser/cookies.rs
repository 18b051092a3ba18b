//! Session cookies exported from a real browser.
//!
//! The cookie file is a JSON object keyed by site, for example:
//!
//! ```json
//! {"VIETNAM_TRADEMARK": {"cookies": [{"name": "cf_clearance", "value": "..."}], "userAgent": "..."}}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
#[cfg(feature = "browser")]
use chromiumoxide::Page;

/// Site key used in the cookie file for vietnamtrademark.net.
pub const VIETNAM_TRADEMARK_KEY: &str = "VIETNAM_TRADEMARK";

/// A single name/value cookie. Extra fields in the file are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
struct SiteEntry {
    #[serde(default)]
    cookies: Vec<SessionCookie>,
    #[serde(default, rename = "userAgent")]
    user_agent: Option<String>,
}

/// Cookies and the user agent they were issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub cookies: Vec<SessionCookie>,
    pub user_agent: Option<String>,
}

impl SessionCookies {
    /// Load the entry for `site` from `path`.
    ///
    /// A missing or malformed file yields an empty set.
    pub fn load(path: &Path, site: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No cookie file at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&content, site).unwrap_or_else(|e| {
            warn!("Ignoring malformed cookie file {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Parse the cookie file contents. A file without `site` yields an empty set.
    pub fn parse(content: &str, site: &str) -> Result<Self, serde_json::Error> {
        let mut sites: std::collections::HashMap<String, SiteEntry> =
            serde_json::from_str(content)?;
        let entry = sites.remove(site).unwrap_or_default();
        Ok(Self {
            cookies: entry
                .cookies
                .into_iter()
                .filter(|c| !c.name.is_empty())
                .collect(),
            user_agent: entry.user_agent.filter(|ua| !ua.is_empty()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `name=value; name2=value2` for a `Cookie` request header.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Install the cookies on `page` for `domain`.
    #[cfg(feature = "browser")]
    pub(crate) async fn apply_to_page(&self, page: &Page, domain: &str) {
        for cookie in &self.cookies {
            let cookie_param = CookieParam::builder()
                .name(cookie.name.as_str())
                .value(cookie.value.as_str())
                .domain(domain)
                .build();

            match cookie_param {
                Ok(param) => {
                    if let Err(e) = page.set_cookie(param).await {
                        warn!("Failed to set cookie {}: {}", cookie.name, e);
                    }
                }
                Err(e) => {
                    warn!("Failed to build cookie {}: {}", cookie.name, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_site_entry() {
        let json = r#"{"VIETNAM_TRADEMARK": {"cookies": [
            {"name": "a", "value": "1", "domain": ".vietnamtrademark.net"},
            {"name": "b", "value": "2"}
        ], "userAgent": "UA/1"}}"#;
        let jar = SessionCookies::parse(json, VIETNAM_TRADEMARK_KEY).unwrap();
        assert_eq!(jar.cookies.len(), 2);
        assert_eq!(jar.user_agent.as_deref(), Some("UA/1"));
        assert_eq!(jar.header_value().as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn test_missing_site_is_empty() {
        let jar = SessionCookies::parse(r#"{"OTHER": {"cookies": []}}"#, VIETNAM_TRADEMARK_KEY)
            .unwrap();
        assert!(jar.is_empty());
        assert_eq!(jar.header_value(), None);
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(SessionCookies::load(&path, VIETNAM_TRADEMARK_KEY).is_empty());
        assert!(SessionCookies::load(&dir.path().join("missing.json"), VIETNAM_TRADEMARK_KEY)
            .is_empty());
    }
}
