//! Nuri Crawler CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
#[cfg(feature = "browser")]
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use nuri_crawler::{
    error::{AppError, Result},
    models::{CrawlConfig, Paths, run_id_at},
    services::extract_fields,
    storage::{PAGE_CHECKPOINT, StateStore},
    utils::http,
};
#[cfg(feature = "browser")]
use clap::ValueEnum;
#[cfg(feature = "browser")]
use nuri_crawler::{
    models::{CancelToken, RunOptions},
    pipeline,
};

/// Nuri - Procurement Bid Notice Crawler
#[derive(Parser, Debug)]
#[command(name = "nuri", version, about = "Resumable crawler for Nuri bid notices")]
struct Cli {
    /// Workspace root for data/ and state/
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Site config (default: {root}/configs/nuri.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "browser")]
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Once,
    Interval,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the bid list and its detail pages
    #[cfg(feature = "browser")]
    Crawl {
        #[arg(long, value_enum, default_value_t = Mode::Once)]
        mode: Mode,

        /// Minutes between runs in interval mode
        #[arg(long, default_value_t = 60)]
        interval_min: u64,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Delay before each browser action, headed only
        #[arg(long, default_value_t = 0)]
        slowmo_ms: u64,

        #[arg(long, default_value_t = 1)]
        max_pages: u32,

        #[arg(long, default_value_t = 30)]
        max_items: usize,

        /// Write list rows only, skip detail pages
        #[arg(long)]
        list_only: bool,

        /// Keep rows containing this keyword (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Raw list file name under data/raw/
        #[arg(long)]
        raw_name: Option<String>,

        /// Normalized file name under data/normalized/
        #[arg(long)]
        normalized_name: Option<String>,
    },

    /// Check that the portal answers over HTTP
    Check,

    /// Extract detail fields from a saved HTML page
    Detail {
        #[arg(long)]
        html: PathBuf,
    },

    /// Validate the site config
    Validate,

    /// Show the stored checkpoint and notice counts
    Info {
        #[arg(long)]
        normalized_name: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(root: &Path, path: Option<PathBuf>) -> Result<CrawlConfig> {
    let path = path.unwrap_or_else(|| root.join("configs").join("nuri.toml"));
    let config = CrawlConfig::load_or_default(&path);
    config.validate()?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.root, cli.config)?;

    match cli.command {
        #[cfg(feature = "browser")]
        Command::Crawl {
            mode,
            interval_min,
            headed,
            slowmo_ms,
            max_pages,
            max_items,
            list_only,
            keywords,
            raw_name,
            normalized_name,
        } => {
            let cancel = CancelToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupt received; stopping after the current step");
                    on_signal.cancel();
                }
            });

            let keywords = config.filters.merged_keywords(&keywords);
            let options_for = |run_id: String| {
                let paths = Paths::with_names(
                    &cli.root,
                    &run_id,
                    raw_name.as_deref(),
                    normalized_name.as_deref(),
                );
                let mut options = RunOptions::new(run_id, &paths);
                options.max_pages = max_pages;
                options.max_items = max_items;
                options.list_only = list_only;
                options.keywords = keywords.clone();
                options.headless = !headed;
                options.slow_mo_ms = slowmo_ms;
                options.cancel = cancel.clone();
                options
            };

            match mode {
                Mode::Once => {
                    let options = options_for(run_id_at(Utc::now()));
                    pipeline::run_crawl_in_browser(&config, &options).await?;
                }
                Mode::Interval => {
                    let interval = Duration::from_secs(interval_min.saturating_mul(60));
                    pipeline::run_every(interval, &cancel, |_| {
                        let options = options_for(run_id_at(Utc::now()));
                        let config = &config;
                        async move { pipeline::run_crawl_in_browser(config, &options).await }
                    })
                    .await;
                }
            }
        }

        Command::Check => {
            let health = http::check_url(&config.base_url).await?;
            if !health.is_ok() {
                return Err(AppError::navigation(format!(
                    "{} answered HTTP {}",
                    config.base_url, health.status
                )));
            }
            log::info!("✓ {} is reachable (HTTP {})", config.base_url, health.status);
        }

        Command::Detail { html } => {
            let content = std::fs::read_to_string(&html)?;
            let fields = extract_fields(&content, &config.detail)?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }

        Command::Validate => {
            log::info!("✓ Config OK ({} detail sections)", config.detail.sections.len());
        }

        Command::Info { normalized_name } => {
            let paths = Paths::with_names(
                &cli.root,
                &run_id_at(Utc::now()),
                None,
                normalized_name.as_deref(),
            );
            if !paths.state_db.exists() {
                log::info!("No state yet at {}", paths.state_db.display());
                return Ok(());
            }
            let state = StateStore::open(&paths.state_db)?;
            log::info!("State: {}", paths.state_db.display());
            log::info!(
                "Checkpoint {}: {}",
                PAGE_CHECKPOINT,
                state
                    .get_checkpoint(PAGE_CHECKPOINT)?
                    .unwrap_or_else(|| "-".to_string())
            );
            for (status, count) in state.status_counts()? {
                log::info!("  {}: {}", status, count);
            }
        }
    }

    Ok(())
}
