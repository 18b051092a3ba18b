//! vietnamtrademark.net search scraper.
//!
//! Sequential by design: one search at a time with irregular pacing,
//! rotating headers and an occasional browser-rendered fetch.

mod pacing;
mod parse;

pub use pacing::Pacer;
pub use parse::{
    absolutize, empty_fields, escape_tsv, extract_representative, find_result_row,
    parse_row_fields, parse_search_page, search_header, SearchRow, SEARCH_COLUMNS,
};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{Settings, VntmSettings};
use crate::output::{
    copy_input, load_ids, scan_scraped_ids, JobLog, LoadedIds, RecordFile, RunLayout,
    TrackingFile,
};
use crate::scrapers::browser::{self, BrowserFetcher, SessionCookies, VIETNAM_TRADEMARK_KEY};
use crate::scrapers::http_client::{random_accept_language, random_user_agent};
use crate::scrapers::HttpClient;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// How a page is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Http,
    Render,
}

impl FetchMode {
    pub fn other(self) -> Self {
        match self {
            FetchMode::Http => FetchMode::Render,
            FetchMode::Render => FetchMode::Http,
        }
    }
}

/// Result of one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found,
    NotFound,
    Error(String),
}

impl SearchOutcome {
    /// Log form: `OK`, `NOT_FOUND` or `ERROR <message>`.
    pub fn label(&self) -> String {
        match self {
            SearchOutcome::Found => "OK".to_string(),
            SearchOutcome::NotFound => "NOT_FOUND".to_string(),
            SearchOutcome::Error(msg) => format!("ERROR {}", msg),
        }
    }
}

/// Events emitted while searching.
#[derive(Debug, Clone)]
pub enum VntmEvent {
    Searched {
        index: usize,
        total: usize,
        id: String,
        outcome: SearchOutcome,
        elapsed: Duration,
    },
    Pausing {
        duration: Duration,
    },
}

/// Input summary produced by [`VntmService::prepare`].
#[derive(Debug, Clone)]
pub struct VntmPrepared {
    pub loaded: LoadedIds,
    pub already_scraped: usize,
    /// Identifiers still to search, shuffled.
    pub pending: Vec<String>,
}

/// Result of a search run.
#[derive(Debug, Clone)]
pub struct VntmResult {
    pub found: usize,
    pub missing_or_error: usize,
    pub output_path: PathBuf,
}

/// Search scraper service.
pub struct VntmService {
    settings: VntmSettings,
    client: HttpClient,
    browser: BrowserFetcher,
    cookies: SessionCookies,
    layout: RunLayout,
    log: JobLog,
    tracking_file: Option<PathBuf>,
}

impl VntmService {
    pub fn new(settings: &Settings, layout: RunLayout) -> anyhow::Result<Self> {
        let vntm = settings.vntm.clone();
        let client = HttpClient::with_user_agent(
            Duration::from_secs(vntm.request_timeout),
            Some("impersonate"),
        )?;

        let cookies = match &vntm.cookies_file {
            Some(path) => SessionCookies::load(path, VIETNAM_TRADEMARK_KEY),
            None => SessionCookies::default(),
        };
        if cookies.is_empty() {
            info!("No session cookies loaded");
        } else {
            info!("Loaded {} session cookies", cookies.cookies.len());
        }

        Ok(Self {
            browser: BrowserFetcher::new(vntm.browser.clone()),
            log: JobLog::new(layout.log_file()),
            tracking_file: settings.vntm_tracking_file(),
            settings: vntm,
            client,
            cookies,
            layout,
        })
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Load the input, drop identifiers already in today's output and
    /// shuffle the rest.
    pub fn prepare(&self, input: &Path) -> anyhow::Result<VntmPrepared> {
        self.layout.ensure()?;
        let loaded = load_ids(input)?;

        let already = scan_scraped_ids(&[self.layout.vntm_file()]);
        let mut pending: Vec<String> = loaded
            .ids
            .iter()
            .filter(|id| !already.contains(*id))
            .cloned()
            .collect();
        let already_scraped = loaded.ids.len() - pending.len();
        fastrand::shuffle(&mut pending);

        if !pending.is_empty() {
            copy_input(input, &self.layout.vntm_original_ids())?;
        }

        info!(
            "Total IDs: {}, duplicates removed: {}, already scraped: {}, remaining: {}",
            loaded.total,
            loaded.duplicates,
            already_scraped,
            pending.len()
        );

        Ok(VntmPrepared {
            loaded,
            already_scraped,
            pending,
        })
    }

    pub fn search_url(&self, id: &str) -> String {
        format!("{}/search?q={}", self.settings.base_url, urlencoding::encode(id))
    }

    /// Search every identifier in order, pacing between requests.
    pub async fn run(
        &mut self,
        pending: Vec<String>,
        event_tx: mpsc::Sender<VntmEvent>,
    ) -> anyhow::Result<VntmResult> {
        let output = RecordFile::open(self.layout.vntm_file(), &search_header())?;
        let tracking = match &self.tracking_file {
            Some(path) => {
                let header: Vec<&str> = std::iter::once("Run_Date")
                    .chain(search_header())
                    .collect();
                Some(TrackingFile::open(path.clone(), &header, self.layout.date())?)
            }
            None => None,
        };

        let mut pacer = Pacer::new(&self.settings);
        let mut written: HashSet<String> = HashSet::new();
        let mut found = 0;
        let mut missing_or_error = 0;
        let total = pending.len();

        for (index, id) in pending.iter().enumerate() {
            if !written.insert(id.clone()) {
                debug!("Skipping duplicate ID: {}", id);
                continue;
            }

            let start = Instant::now();
            let outcome = match self.search(id).await {
                Ok(Some(row)) => {
                    let fields = row.to_fields(id);
                    output.append(&format!("{}\n", fields.join("\t")))?;
                    if let Some(tracking) = &tracking {
                        tracking.record(&fields)?;
                    }
                    if row.is_found() {
                        SearchOutcome::Found
                    } else {
                        SearchOutcome::NotFound
                    }
                }
                Ok(None) => {
                    output.append(&format!("{}\n", empty_fields(id).join("\t")))?;
                    SearchOutcome::NotFound
                }
                Err(e) => {
                    warn!("Search failed for {}: {:#}", id, e);
                    output.append(&format!("{}\n", empty_fields(id).join("\t")))?;
                    SearchOutcome::Error(e.to_string())
                }
            };
            let elapsed = start.elapsed();

            match outcome {
                SearchOutcome::Found => found += 1,
                _ => missing_or_error += 1,
            }

            self.log_line(&format!(
                "{} -> {} in {}ms",
                id,
                outcome.label(),
                elapsed.as_millis()
            ));
            let _ = event_tx
                .send(VntmEvent::Searched {
                    index,
                    total,
                    id: id.clone(),
                    outcome,
                    elapsed,
                })
                .await;

            if index + 1 < total {
                let wait = pacer.after_request();
                if wait.as_millis() as u64 > self.settings.max_delay_ms {
                    let _ = event_tx.send(VntmEvent::Pausing { duration: wait }).await;
                }
                tokio::time::sleep(wait).await;
            }
        }

        self.browser.close().await;

        Ok(VntmResult {
            found,
            missing_or_error,
            output_path: output.path().to_path_buf(),
        })
    }

    fn log_line(&self, message: &str) {
        if let Err(e) = self
            .log
            .write(&format!("[{}] {}", Utc::now().to_rfc3339(), message))
        {
            warn!("Failed to write log line: {}", e);
        }
    }

    /// Search `id`, retrying once with the other fetch mode when no row is
    /// found, and fill a missing representative from the detail page.
    async fn search(&mut self, id: &str) -> anyhow::Result<Option<SearchRow>> {
        let url = self.search_url(id);
        let first = if fastrand::f64() < self.settings.render_probability {
            FetchMode::Render
        } else {
            FetchMode::Http
        };

        let html = self.fetch(&url, first).await?;
        let mut row = parse_search_page(&html, id);

        if !row.as_ref().is_some_and(SearchRow::is_found) {
            match self.fetch(&url, first.other()).await {
                Ok(html) => {
                    if let Some(second) = parse_search_page(&html, id) {
                        row = Some(second);
                    }
                }
                Err(e) => self.log_line(&format!("{} -> SECOND_TRY_FAIL {}", id, e)),
            }
        }

        if let Some(row) = row.as_mut() {
            if row.representative.is_empty() {
                self.fill_representative(id, row).await;
            }
        }

        Ok(row)
    }

    async fn fill_representative(&mut self, id: &str, row: &mut SearchRow) {
        let detail_url = absolutize(&row.detail_href, &self.settings.base_url);
        if detail_url.is_empty() {
            return;
        }

        let mode = if fastrand::bool() {
            FetchMode::Http
        } else {
            FetchMode::Render
        };

        let mut representative = match self.fetch(&detail_url, mode).await {
            Ok(html) => extract_representative(&html),
            Err(e) => {
                self.log_line(&format!("{} -> DETAIL_FAIL {}", id, e));
                return;
            }
        };

        if representative.is_empty() {
            if let Ok(html) = self.fetch(&detail_url, mode.other()).await {
                representative = extract_representative(&html);
            }
        }

        if !representative.is_empty() {
            row.representative = representative;
        }
    }

    /// Headers of a plain request, rotated per call.
    fn request_headers(&self) -> Vec<(&'static str, String)> {
        let base = &self.settings.base_url;
        let letter = char::from(b'a' + fastrand::u8(..26));
        let referers = [
            format!("{}/", base),
            format!("{}/search", base),
            format!("{}/search?q={}", base, letter),
        ];

        let mut headers = vec![
            ("User-Agent", self.user_agent()),
            ("Accept", ACCEPT.to_string()),
            ("Accept-Language", random_accept_language().to_string()),
            ("Cache-Control", "no-cache".to_string()),
            ("Pragma", "no-cache".to_string()),
            ("Referer", referers[fastrand::usize(..referers.len())].clone()),
        ];
        if let Some(cookie) = self.cookies.header_value() {
            headers.push(("Cookie", cookie));
        }
        headers
    }

    fn user_agent(&self) -> String {
        self.cookies
            .user_agent
            .clone()
            .unwrap_or_else(|| random_user_agent().to_string())
    }

    /// Fetch `url` in `mode`. Rendering falls back to HTTP when the build has
    /// no browser support or the browser fails.
    async fn fetch(&mut self, url: &str, mode: FetchMode) -> anyhow::Result<String> {
        if mode == FetchMode::Render && browser::is_available() {
            let user_agent = self.user_agent();
            match self.browser.fetch(url, &user_agent, &self.cookies).await {
                Ok(page) => {
                    debug!(
                        "Rendered {} in {:?} (selector found: {})",
                        url, page.elapsed, page.selector_found
                    );
                    return Ok(page.content);
                }
                Err(e) => warn!("Rendering {} failed, using HTTP: {:#}", url, e),
            }
        }

        let headers = self.request_headers();
        let response = self.client.get_with_headers(url, &headers).await?;
        if !response.is_success() {
            anyhow::bail!(
                "HTTP {} {}",
                response.status.as_u16(),
                response.status.canonical_reason().unwrap_or_default()
            );
        }
        Ok(response.text().await?)
    }
}
