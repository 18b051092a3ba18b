//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod classify;
mod config_cmd;
mod scrape;
mod vntm;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions, Settings};
use crate::scrapers::ValidationPolicy;

#[derive(Parser)]
#[command(name = "ipacquire")]
#[command(about = "IP Vietnam WIPO Publish detail scraper")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check for the verbose flag before the parser runs, so logging can be
/// initialised first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape detail pages for every identifier in a file
    #[command(alias = "run")]
    Scrape {
        /// File with one application number per line
        input: PathBuf,

        #[command(flatten)]
        overrides: ScrapeOverrides,
    },

    /// Search vietnamtrademark.net for every identifier in a file
    Vntm {
        /// File with one application number per line
        input: PathBuf,

        /// Output root directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Cookie file exported from a browser session
        #[arg(long)]
        cookies: Option<PathBuf>,

        /// Probability of rendering a search with the browser (0.0 - 1.0)
        #[arg(long)]
        render_probability: Option<f64>,
    },

    /// Show the record type and detail URL of identifiers
    Classify {
        /// Application numbers
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Command-line overrides for the detail scraper.
#[derive(Args, Debug, Default)]
struct ScrapeOverrides {
    /// Number of concurrent workers
    #[arg(short = 'w', long)]
    threads: Option<usize>,

    /// Minimum delay between requests in milliseconds
    #[arg(short, long)]
    delay_ms: Option<u64>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Local re-attempts per identifier before queueing for a global pass
    #[arg(long)]
    max_reattempts: Option<u32>,

    /// Number of global retry passes over queued identifiers
    #[arg(long)]
    retry_passes: Option<u32>,

    /// Output root directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// How fetched pages are judged usable
    #[arg(long, value_enum)]
    validation: Option<ValidationPolicy>,
}

impl ScrapeOverrides {
    fn apply(self, settings: &mut Settings) {
        if let Some(threads) = self.threads {
            settings.threads = threads.max(1);
        }
        if let Some(delay) = self.delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout = timeout;
        }
        if let Some(max) = self.max_reattempts {
            settings.max_reattempts = max;
        }
        if let Some(passes) = self.retry_passes {
            settings.retry_passes = passes;
        }
        if let Some(dir) = self.output_dir {
            settings.output_root = dir;
        }
        if let Some(validation) = self.validation {
            settings.validation = validation;
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (mut settings, _config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Scrape { input, overrides } => {
            overrides.apply(&mut settings);
            scrape::cmd_scrape(&settings, &input).await
        }
        Commands::Vntm {
            input,
            output_dir,
            cookies,
            render_probability,
        } => {
            if let Some(dir) = output_dir {
                settings.output_root = dir;
            }
            if let Some(path) = cookies {
                settings.vntm.cookies_file = Some(path);
            }
            if let Some(p) = render_probability {
                settings.vntm.render_probability = p.clamp(0.0, 1.0);
            }
            vntm::cmd_vntm(&settings, &input).await
        }
        Commands::Classify { ids } => classify::cmd_classify(&settings, &ids),
        Commands::Config => config_cmd::cmd_config_show(&settings),
    }
}
