//! Configuration management for ipacquire.
//!
//! Settings are resolved in layers: built-in defaults, then a config file
//! (TOML, YAML or JSON), then environment variables, then CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::BaseUrls;
use crate::scrapers::{BrowserEngineConfig, ValidationPolicy};

/// Application name used for config discovery.
pub const APP_NAME: &str = "ipacquire";

/// File names probed next to the working directory and in the user config dir.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_ROOT: &str = "Output";

/// Global tracking file for the detail scraper, next to the output root.
pub const WIPO_TRACKING_FILE: &str = "WIPO_Global_Tracking.txt";

/// Global tracking file for the search scraper, next to the output root.
pub const VNTM_TRACKING_FILE: &str = "VNTM_Global_Tracking.txt";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Settings for the vietnamtrademark.net search scraper.
#[derive(Debug, Clone, Serialize)]
pub struct VntmSettings {
    /// Site root; searches go to `{base_url}/search?q=`.
    pub base_url: String,
    /// Random delay between identifiers, lower bound in milliseconds.
    pub min_delay_ms: u64,
    /// Random delay between identifiers, upper bound in milliseconds.
    pub max_delay_ms: u64,
    pub long_pause_min_ms: u64,
    pub long_pause_max_ms: u64,
    /// A long pause is taken every N requests, N drawn from this range.
    pub long_pause_every_min: u32,
    pub long_pause_every_max: u32,
    /// Share of searches rendered in the browser (0.0 - 1.0).
    pub render_probability: f64,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Cookie file exported from a browser session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies_file: Option<PathBuf>,
    pub browser: BrowserEngineConfig,
}

impl Default for VntmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://vietnamtrademark.net".to_string(),
            min_delay_ms: 800,
            max_delay_ms: 2500,
            long_pause_min_ms: 5000,
            long_pause_max_ms: 15000,
            long_pause_every_min: 5,
            long_pause_every_max: 12,
            render_probability: 0.2,
            request_timeout: 30,
            cookies_file: Some(PathBuf::from("cookies.json")),
            browser: BrowserEngineConfig {
                wait_for_selector: Some("table.list-nhanhieu tbody tr".to_string()),
                ..Default::default()
            },
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Directory holding one sub-directory per run date.
    pub output_root: PathBuf,
    /// Number of concurrent workers.
    pub threads: usize,
    /// Spacing between request slots in milliseconds.
    pub request_delay_ms: u64,
    /// Extra random spacing as a fraction of `request_delay_ms`.
    pub jitter: f64,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Local re-attempts per identifier before it joins the failed queue.
    pub max_reattempts: u32,
    pub retry_base_ms: u64,
    pub retry_multiplier: f64,
    pub retry_jitter_ms: u64,
    /// Global passes over the failed queue.
    pub retry_passes: u32,
    pub pass_pause_base_ms: u64,
    pub pass_pause_max_ms: u64,
    /// How fetched bodies are judged usable.
    pub validation: ValidationPolicy,
    /// User agent: unset for the default, "impersonate" for a browser UA, or a literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Append successes to the global tracking file.
    pub global_tracking: bool,
    /// Override for the tracking file location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_tracking_path: Option<PathBuf>,
    /// Override for `failed_ids.txt` (defaults to the run directory).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_ids_path: Option<PathBuf>,
    /// Run directories kept in the output root; older ones move to `Old/`. 0 disables.
    pub keep_runs: usize,
    pub base_urls: BaseUrls,
    pub vntm: VntmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            threads: 12,
            request_delay_ms: 500,
            jitter: 0.1,
            request_timeout: 30,
            max_reattempts: 20,
            retry_base_ms: 400,
            retry_multiplier: 1.5,
            retry_jitter_ms: 1000,
            retry_passes: 10,
            pass_pause_base_ms: 5000,
            pass_pause_max_ms: 30000,
            validation: ValidationPolicy::default(),
            user_agent: None,
            global_tracking: true,
            global_tracking_path: None,
            failed_ids_path: None,
            keep_runs: 5,
            base_urls: BaseUrls::default(),
            vntm: VntmSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings writing below a custom output root.
    pub fn with_output_root(output_root: PathBuf) -> Self {
        Self {
            output_root,
            ..Default::default()
        }
    }

    /// Directory that holds the output root (tracking files live here).
    fn output_parent(&self) -> PathBuf {
        self.output_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Tracking file for detail-scraper successes, if enabled.
    pub fn wipo_tracking_file(&self) -> Option<PathBuf> {
        if !self.global_tracking {
            return None;
        }
        Some(
            self.global_tracking_path
                .clone()
                .unwrap_or_else(|| self.output_parent().join(WIPO_TRACKING_FILE)),
        )
    }

    /// Tracking file for search-scraper successes, if enabled.
    pub fn vntm_tracking_file(&self) -> Option<PathBuf> {
        self.global_tracking
            .then(|| self.output_parent().join(VNTM_TRACKING_FILE))
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Search-scraper section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VntmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_pause_min_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_pause_max_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_pause_every_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_pause_every_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output root directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Delay between request slots in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reattempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_jitter_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_passes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_pause_base_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_pause_max_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_tracking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_tracking_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_ids_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_runs: Option<usize>,
    /// Portal host, e.g. a mirror or a local test server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vntm: Option<VntmConfig>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// The format is picked from the file extension; anything unknown is read as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.output_dir {
            settings.output_root = self.resolve_path(dir, base_dir);
        }
        if let Some(threads) = self.threads {
            settings.threads = threads.max(1);
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(jitter) = self.jitter {
            settings.jitter = jitter.max(0.0);
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(n) = self.max_reattempts {
            settings.max_reattempts = n;
        }
        if let Some(ms) = self.retry_base_ms {
            settings.retry_base_ms = ms;
        }
        if let Some(m) = self.retry_multiplier {
            settings.retry_multiplier = m;
        }
        if let Some(ms) = self.retry_jitter_ms {
            settings.retry_jitter_ms = ms;
        }
        if let Some(n) = self.retry_passes {
            settings.retry_passes = n;
        }
        if let Some(ms) = self.pass_pause_base_ms {
            settings.pass_pause_base_ms = ms;
        }
        if let Some(ms) = self.pass_pause_max_ms {
            settings.pass_pause_max_ms = ms;
        }
        if let Some(policy) = self.validation {
            settings.validation = policy;
        }
        if let Some(ref ua) = self.user_agent {
            settings.user_agent = Some(ua.clone());
        }
        if let Some(enabled) = self.global_tracking {
            settings.global_tracking = enabled;
        }
        if let Some(ref path) = self.global_tracking_path {
            settings.global_tracking_path = Some(self.resolve_path(path, base_dir));
        }
        if let Some(ref path) = self.failed_ids_path {
            settings.failed_ids_path = Some(self.resolve_path(path, base_dir));
        }
        if let Some(keep) = self.keep_runs {
            settings.keep_runs = keep;
        }
        if let Some(ref host) = self.portal_host {
            let country_code = settings.base_urls.country_code.clone();
            settings.base_urls = BaseUrls::with_host(host);
            settings.base_urls.country_code = country_code;
        }
        if let Some(ref cc) = self.country_code {
            settings.base_urls.country_code = cc.clone();
        }
        if let Some(ref vntm) = self.vntm {
            self.apply_vntm(vntm, &mut settings.vntm, base_dir);
        }
    }

    fn apply_vntm(&self, vntm: &VntmConfig, settings: &mut VntmSettings, base_dir: &Path) {
        if let Some(ref url) = vntm.base_url {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = vntm.min_delay_ms {
            settings.min_delay_ms = ms;
        }
        if let Some(ms) = vntm.max_delay_ms {
            settings.max_delay_ms = ms;
        }
        if let Some(ms) = vntm.long_pause_min_ms {
            settings.long_pause_min_ms = ms;
        }
        if let Some(ms) = vntm.long_pause_max_ms {
            settings.long_pause_max_ms = ms;
        }
        if let Some(n) = vntm.long_pause_every_min {
            settings.long_pause_every_min = n;
        }
        if let Some(n) = vntm.long_pause_every_max {
            settings.long_pause_every_max = n;
        }
        if let Some(p) = vntm.render_probability {
            settings.render_probability = p.clamp(0.0, 1.0);
        }
        if let Some(t) = vntm.request_timeout {
            settings.request_timeout = t;
        }
        if let Some(ref path) = vntm.cookies_file {
            settings.cookies_file = Some(self.resolve_path(path, base_dir));
        }
        if let Some(ref browser) = vntm.browser {
            settings.browser = browser.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Find a config file: `./ipacquire.*` first, then the user config directory.
pub fn discover_config_path() -> Option<PathBuf> {
    let local = CONFIG_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{}.{}", APP_NAME, ext)));
    let user = dirs::config_dir().into_iter().flat_map(|dir| {
        CONFIG_EXTENSIONS
            .iter()
            .map(move |ext| dir.join(APP_NAME).join(format!("config.{}", ext)))
    });

    local.chain(user).find(|p| p.exists())
}

/// Apply `IPACQUIRE_*` environment overrides.
fn apply_env_overrides(settings: &mut Settings) -> Result<(), ConfigError> {
    if let Some(threads) = std::env::var("IPACQUIRE_THREADS")
        .ok()
        .filter(|s| !s.is_empty())
    {
        let n: usize = threads.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "IPACQUIRE_THREADS",
            value: threads.clone(),
        })?;
        tracing::debug!("Using IPACQUIRE_THREADS from environment: {}", n);
        settings.threads = n.max(1);
    }

    if let Some(dir) = std::env::var("IPACQUIRE_OUTPUT_DIR")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using IPACQUIRE_OUTPUT_DIR from environment: {}", dir);
        settings.output_root = PathBuf::from(shellexpand::tilde(&dir).as_ref());
    }

    Ok(())
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path.or_else(discover_config_path) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Config::load_from_path(&path).await?
        }
        None => Config::default(),
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings)?;

    Ok((settings, config))
}
