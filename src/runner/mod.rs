//! Detail-page scraping service.
//!
//! Workers share one HTTP client (and its slot limiter) and one
//! [`RunContext`]. Progress is reported through [`ScrapeEvent`]s so the
//! service stays free of UI concerns.

mod retry;
mod tracker;

pub use retry::RetryPolicy;
pub use tracker::{AttemptOutcome, Tracker, TrackerStats};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::extract::{extract, header_for, ExtractError};
use crate::models::{BaseUrls, RecordType, Row};
use crate::output::{
    append_line, archive_old_runs, copy_input, load_ids, scan_scraped_ids, FailedEntry, JobLog,
    LoadedIds, OutputError, RecordFile, Report, ReportConfig, RunLayout, TrackingFile,
};
use crate::scrapers::{
    FetchError, HttpClient, RateLimitConfig, RateLimiter, ValidationPolicy,
};

/// Header of the cross-run tracking file.
pub const TRACKING_HEADER: &[&str] = &["Run_Date", "ID", "Type", "Data"];

/// Body prefix logged when a usable page cannot be parsed.
const SNIPPET_CHARS: usize = 500;

/// Events emitted while scraping.
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// A fetch for `id` is about to be made.
    Started {
        worker_id: usize,
        id: String,
        reattempt: u32,
    },
    /// A row was written for `id`.
    Completed {
        worker_id: usize,
        id: String,
        record_type: RecordType,
    },
    /// The attempt failed and `id` will be fetched again after `delay`.
    Retrying {
        worker_id: usize,
        id: String,
        reattempt: u32,
        delay: Duration,
        reason: String,
    },
    /// Local re-attempts exhausted; `id` waits for the next global pass.
    Queued { worker_id: usize, id: String },
    /// `id` failed permanently (unparseable page).
    Failed {
        worker_id: usize,
        id: String,
        error: String,
    },
    /// A global retry pass over `ids` identifiers starts after `pause`.
    PassStarted {
        pass: u32,
        ids: usize,
        pause: Duration,
    },
}

/// Configuration for the scrape service.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub threads: usize,
    pub validation: ValidationPolicy,
    pub base_urls: BaseUrls,
    pub retry: RetryPolicy,
    pub failed_ids_path: Option<PathBuf>,
    pub tracking_file: Option<PathBuf>,
    pub keep_runs: usize,
    pub request_delay_ms: u64,
    /// Page-to-row extraction applied to usable bodies.
    pub extractor: fn(&str, RecordType) -> Result<Row, ExtractError>,
}

impl ScrapeConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            threads: settings.threads.max(1),
            validation: settings.validation,
            base_urls: settings.base_urls.clone(),
            retry: RetryPolicy::from_settings(settings),
            failed_ids_path: settings.failed_ids_path.clone(),
            tracking_file: settings.wipo_tracking_file(),
            keep_runs: settings.keep_runs,
            request_delay_ms: settings.request_delay_ms,
            extractor: extract,
        }
    }
}

/// Input summary produced by [`ScrapeService::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub loaded: LoadedIds,
    pub already_scraped: usize,
    /// Identifiers still to fetch, in input order.
    pub pending: Vec<String>,
}

/// Result of a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub completed: usize,
    pub failed: Vec<FailedEntry>,
    pub passes: u32,
    pub report_path: PathBuf,
}

/// Mutable run state, guarded by one lock.
struct RunState {
    tracker: Tracker,
    scraped: HashSet<String>,
    files: HashMap<RecordType, RecordFile>,
    tracking: Option<TrackingFile>,
}

/// State shared by all workers of a run.
pub struct RunContext {
    config: ScrapeConfig,
    client: HttpClient,
    layout: RunLayout,
    log: JobLog,
    state: Mutex<RunState>,
}

impl RunContext {
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn log(&self) -> &JobLog {
        &self.log
    }

    pub async fn stats(&self) -> TrackerStats {
        self.state.lock().await.tracker.stats()
    }

    fn log_fetch(&self, id: &str, status: &str, elapsed: Duration, reattempt: u32, retry: u32) {
        let reattempt = (reattempt > 0).then_some((reattempt, self.config.retry.max_reattempts));
        let retry = (retry > 0).then_some(retry);
        if let Err(e) = self
            .log
            .fetch(id, status, elapsed.as_millis(), reattempt, retry)
        {
            warn!("Failed to write log line: {}", e);
        }
    }

    fn log_error(&self, id: &str, error: &FetchError) {
        if let Err(e) = self.log.error(id, &error.to_string()) {
            warn!("Failed to write log line: {}", e);
        }
    }

    /// Append the row unless `id` already has one in this run's output.
    async fn record_success(
        &self,
        id: &str,
        record_type: RecordType,
        row: &Row,
    ) -> Result<(), OutputError> {
        let mut state = self.state.lock().await;
        if state.scraped.insert(id.to_string()) {
            if let Some(file) = state.files.get(&record_type) {
                file.append(&row.to_line(id, record_type))?;
            }
            if let Some(tracking) = &state.tracking {
                tracking.record(&[id, record_type.as_str(), row.to_tsv().as_str()])?;
            }
        } else {
            debug!("{} already written this run, skipping", id);
        }
        if let Some(took) = state.tracker.complete(id) {
            debug!("{} completed in {:?}", id, took);
        }
        Ok(())
    }
}

/// Service that fetches, validates and extracts detail pages.
pub struct ScrapeService {
    context: Arc<RunContext>,
}

impl ScrapeService {
    /// Create a service writing into `layout`, opening the per-type output
    /// files (and writing their headers) up front.
    pub fn new(
        config: ScrapeConfig,
        client: HttpClient,
        layout: RunLayout,
    ) -> Result<Self, OutputError> {
        layout.ensure()?;

        let mut files = HashMap::new();
        for record_type in RecordType::ALL {
            let file = RecordFile::open(layout.record_file(record_type), &header_for(record_type))?;
            files.insert(record_type, file);
        }

        let tracking = match &config.tracking_file {
            Some(path) => Some(TrackingFile::open(
                path.clone(),
                TRACKING_HEADER,
                layout.date(),
            )?),
            None => None,
        };

        let log = JobLog::new(layout.log_file());
        Ok(Self {
            context: Arc::new(RunContext {
                config,
                client,
                layout,
                log,
                state: Mutex::new(RunState {
                    tracker: Tracker::new(0),
                    scraped: HashSet::new(),
                    files,
                    tracking,
                }),
            }),
        })
    }

    /// Build the client and service from resolved settings.
    pub fn from_settings(settings: &Settings, layout: RunLayout) -> anyhow::Result<Self> {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            delay: Duration::from_millis(settings.request_delay_ms),
            jitter: settings.jitter,
        });
        let client = HttpClient::with_user_agent(
            Duration::from_secs(settings.request_timeout),
            settings.user_agent.as_deref(),
        )?
        .with_rate_limiter(limiter);

        Ok(Self::new(ScrapeConfig::from_settings(settings), client, layout)?)
    }

    /// Shared run state, e.g. for an interrupt summary.
    pub fn context(&self) -> Arc<RunContext> {
        self.context.clone()
    }

    /// Archive old runs, load the input and drop identifiers that already
    /// have output.
    pub async fn prepare(&self, input: &Path) -> anyhow::Result<PreparedRun> {
        let ctx = &self.context;

        let archived = archive_old_runs(ctx.layout.root(), ctx.config.keep_runs)?;
        if archived > 0 {
            info!("Archived {} old run directories", archived);
        }

        let loaded = load_ids(input)?;
        copy_input(input, &ctx.layout.original_ids())?;

        let already = scan_scraped_ids(&ctx.layout.record_files());
        let pending: Vec<String> = loaded
            .ids
            .iter()
            .filter(|id| !already.contains(*id))
            .cloned()
            .collect();
        let already_scraped = loaded.ids.len() - pending.len();

        info!(
            "Total IDs: {}, duplicates removed: {}, already scraped: {}, remaining: {}",
            loaded.total, loaded.duplicates, already_scraped, pending.len()
        );

        {
            let mut state = ctx.state.lock().await;
            state.tracker = Tracker::new(pending.len());
            state.scraped = already;
        }

        Ok(PreparedRun {
            loaded,
            already_scraped,
            pending,
        })
    }

    /// Scrape `pending`, run the global retry passes and write the
    /// failure lists and report.
    pub async fn run(
        &self,
        pending: Vec<String>,
        event_tx: mpsc::Sender<ScrapeEvent>,
    ) -> anyhow::Result<ScrapeResult> {
        let ctx = self.context.clone();
        {
            let mut state = ctx.state.lock().await;
            if state.tracker.total_pending() != pending.len() {
                state.tracker = Tracker::new(pending.len());
            }
        }

        let mut ids = pending;
        let mut pass = 0;
        loop {
            run_pass(ctx.clone(), Arc::new(ids), event_tx.clone()).await?;

            let queued = ctx.state.lock().await.tracker.failed_queue_len();
            if queued == 0 || pass >= ctx.config.retry.passes {
                break;
            }

            pass += 1;
            let pause = ctx.config.retry.pass_pause(pass);
            info!(
                "Global retry pass {}/{}: {} IDs after {:?}",
                pass, ctx.config.retry.passes, queued, pause
            );
            let _ = event_tx
                .send(ScrapeEvent::PassStarted {
                    pass,
                    ids: queued,
                    pause,
                })
                .await;
            tokio::time::sleep(pause).await;

            ids = ctx.state.lock().await.tracker.take_failed_queue();
        }

        let result = finalize(&ctx, pass).await?;
        Ok(result)
    }
}

/// Run one pass: worker `w` handles indices `w, w + n, w + 2n, ...`.
async fn run_pass(
    ctx: Arc<RunContext>,
    ids: Arc<Vec<String>>,
    event_tx: mpsc::Sender<ScrapeEvent>,
) -> anyhow::Result<()> {
    let workers = ctx.config.threads.min(ids.len()).max(1);
    let mut handles = Vec::with_capacity(workers);

    for worker_id in 0..workers {
        let ctx = ctx.clone();
        let ids = ids.clone();
        let event_tx = event_tx.clone();

        handles.push(tokio::spawn(async move {
            for id in ids.iter().skip(worker_id).step_by(workers) {
                process_id(&ctx, worker_id, id, &event_tx).await?;
            }
            Ok::<_, OutputError>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }
    Ok(())
}

/// Fetch `id` until it yields a row, fails permanently or is queued.
async fn process_id(
    ctx: &RunContext,
    worker_id: usize,
    id: &str,
    event_tx: &mpsc::Sender<ScrapeEvent>,
) -> Result<(), OutputError> {
    let record_type = RecordType::classify(id);
    let url = ctx.config.base_urls.build_url(id, record_type);

    let retry = {
        let mut state = ctx.state.lock().await;
        if state.tracker.is_completed(id) {
            return Ok(());
        }
        state.tracker.start(id);
        state.tracker.global_retries(id)
    };

    loop {
        let reattempt = ctx.state.lock().await.tracker.reattempts(id);
        let _ = event_tx
            .send(ScrapeEvent::Started {
                worker_id,
                id: id.to_string(),
                reattempt,
            })
            .await;

        let reason = match ctx.client.fetch_page(&url).await {
            Ok(page) => {
                ctx.log_fetch(id, &page.status_line(), page.elapsed, reattempt, retry);
                if ctx.config.validation.is_usable(&page.body) {
                    match (ctx.config.extractor)(&page.body, record_type) {
                        Ok(row) => {
                            ctx.record_success(id, record_type, &row).await?;
                            let _ = event_tx
                                .send(ScrapeEvent::Completed {
                                    worker_id,
                                    id: id.to_string(),
                                    record_type,
                                })
                                .await;
                        }
                        Err(e) => {
                            let snippet: String = page.body.chars().take(SNIPPET_CHARS).collect();
                            warn!("Extraction failed for {}: {}\n{}", id, e, snippet);
                            ctx.state.lock().await.tracker.fail(id);
                            let _ = event_tx
                                .send(ScrapeEvent::Failed {
                                    worker_id,
                                    id: id.to_string(),
                                    error: e.to_string(),
                                })
                                .await;
                        }
                    }
                    return Ok(());
                }
                format!("unusable response ({})", page.status_line())
            }
            Err(e) => {
                ctx.log_error(id, &e);
                e.to_string()
            }
        };

        let outcome = ctx
            .state
            .lock()
            .await
            .tracker
            .record_failure(id, ctx.config.retry.max_reattempts);

        match outcome {
            AttemptOutcome::Retry(n) => {
                let delay = ctx.config.retry.backoff(n);
                debug!("{}: {}; re-attempt {} in {:?}", id, reason, n, delay);
                let _ = event_tx
                    .send(ScrapeEvent::Retrying {
                        worker_id,
                        id: id.to_string(),
                        reattempt: n,
                        delay,
                        reason,
                    })
                    .await;
                tokio::time::sleep(delay).await;
            }
            AttemptOutcome::Queued | AttemptOutcome::AlreadyQueued => {
                debug!("{}: {}; queued for the next global pass", id, reason);
                let _ = event_tx
                    .send(ScrapeEvent::Queued {
                        worker_id,
                        id: id.to_string(),
                    })
                    .await;
                return Ok(());
            }
        }
    }
}

/// Write placeholder rows, failure lists and the report.
async fn finalize(ctx: &RunContext, passes: u32) -> anyhow::Result<ScrapeResult> {
    let mut state = ctx.state.lock().await;
    state.tracker.fail_queued();
    if !state.tracker.is_complete() {
        let stats = state.tracker.stats();
        warn!(
            "Run ended with {} of {} IDs unresolved",
            stats.total - stats.completed - stats.failed,
            stats.total
        );
    }

    let failed_list = ctx
        .config
        .failed_ids_path
        .clone()
        .unwrap_or_else(|| ctx.layout.failed_ids());
    let fail_id = ctx.layout.fail_ids();

    let mut failed = Vec::new();
    for id in state.tracker.failed_ids() {
        let retries = state.tracker.global_retries(id);
        let record_type = RecordType::classify(id);
        if let Some(file) = state.files.get(&record_type) {
            file.append(&format!(
                "{}\tNo data available after {} retries\n",
                id, retries
            ))?;
        }
        append_line(&failed_list, &format!("{}\n", id))?;
        append_line(&fail_id, &format!("{}\n", id))?;
        warn!("{} permanently failed after {} retries", id, retries);
        failed.push(FailedEntry {
            id: id.clone(),
            retries,
        });
    }

    let completed = state.tracker.stats().completed;
    drop(state);

    let report = Report {
        generated: Utc::now(),
        succeeded: completed,
        failed: failed.clone(),
        config: ReportConfig {
            threads: ctx.config.threads,
            max_reattempts: ctx.config.retry.max_reattempts,
            retry_passes: ctx.config.retry.passes,
            request_delay_ms: ctx.config.request_delay_ms,
        },
    };
    let report_path = ctx.layout.report();
    report.write(&report_path)?;

    Ok(ScrapeResult {
        completed,
        failed,
        passes,
        report_path,
    })
}
