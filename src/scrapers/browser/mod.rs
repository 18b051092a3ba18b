//! Browser-based fetcher for pages that need JavaScript rendering.
//!
//! Uses chromiumoxide (CDP) with the usual automation flags disabled.
//! Without the `browser` feature a stub is compiled whose `fetch` always fails.

mod config;
mod cookies;
mod types;

pub use config::BrowserEngineConfig;
pub use cookies::{SessionCookie, SessionCookies, VIETNAM_TRADEMARK_KEY};
pub use types::BrowserFetchResponse;

#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::{Duration, Instant};

#[cfg(feature = "browser")]
use anyhow::Context;
use anyhow::Result;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;

/// Whether this build can render pages.
pub const fn is_available() -> bool {
    cfg!(feature = "browser")
}

/// Browser-based fetcher.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    pub(crate) config: BrowserEngineConfig,
    pub(crate) browser: Option<Arc<Mutex<Browser>>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Windows
        "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
        "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
    ];

    /// Create a new browser fetcher. The browser starts lazily on first fetch.
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
        }
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Please install it:\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or download from: https://www.google.com/chrome/"
        ))
    }

    /// Launch or connect to browser if not already running.
    pub async fn ensure_browser(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        if let Some(remote_url) = self.config.remote_url.clone() {
            return self.connect_remote(&remote_url).await;
        }

        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--window-size=1280,800");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(Arc::new(Mutex::new(browser)));

        Ok(())
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&mut self, url: &str) -> Result<()> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(Arc::new(Mutex::new(browser)));

        Ok(())
    }

    /// Render `url` and return the resulting HTML.
    ///
    /// Cookies are installed for the URL's host before navigation. A missing
    /// `wait_for_selector` is not an error; the page is returned as rendered.
    pub async fn fetch(
        &mut self,
        url: &str,
        user_agent: &str,
        cookies: &SessionCookies,
    ) -> Result<BrowserFetchResponse> {
        self.ensure_browser().await?;
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Browser not initialized"))?
            .clone();

        let start = Instant::now();
        let page = {
            let browser = browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .context("Failed to open page")?
        };

        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .context("Failed to set user agent")?;

        if let Some(domain) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
        {
            cookies.apply_to_page(&page, &domain).await;
        }

        let nav = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid navigation params: {}", e))?;

        tokio::time::timeout(Duration::from_secs(self.config.timeout), page.execute(nav))
            .await
            .map_err(|_| anyhow::anyhow!("Navigation timed out after {}s", self.config.timeout))?
            .context("Navigation failed")?;

        let selector_found = match &self.config.wait_for_selector {
            Some(selector) => {
                let wait = Duration::from_millis(self.config.selector_wait_ms);
                let found = tokio::time::timeout(wait, async {
                    loop {
                        if page.find_element(selector.as_str()).await.is_ok() {
                            return;
                        }
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                })
                .await
                .is_ok();
                if !found {
                    debug!("Selector {} not found on {}", selector, url);
                }
                found
            }
            None => true,
        };

        let content = page.content().await.context("Failed to read page content")?;
        let _ = page.close().await;

        Ok(BrowserFetchResponse {
            url: url.to_string(),
            content,
            selector_found,
            elapsed: start.elapsed(),
        })
    }

    /// Close the browser.
    pub async fn close(&mut self) {
        self.browser = None;
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub async fn fetch(
        &mut self,
        _url: &str,
        _user_agent: &str,
        _cookies: &SessionCookies,
    ) -> Result<BrowserFetchResponse> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }

    pub async fn close(&mut self) {}
}
