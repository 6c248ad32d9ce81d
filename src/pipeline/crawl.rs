// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! One run drives one page strictly in sequence:
//! navigate → { list → filter → record → details → paginate }.
//! Page and item counters live in this loop only; everything that must
//! survive the run goes through the state store.

use crate::browser::PageDriver;
use crate::error::{AppError, Result};
use crate::models::{CrawlConfig, DetailRecord, ListItem, NoticeStatus, RunOptions};
use crate::services::{
    DetailExtractor, ListExtractor, Navigator, PageTurn, Paginator, filter_by_keywords, timing,
};
use crate::storage::{JsonlWriter, PAGE_CHECKPOINT, StateStore, save_evidence};
use crate::utils::log as run_log;
use crate::utils::{sha256_hex, utc_now_iso};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    MaxPages,
    MaxItems,
    EndOfList,
    Cancelled,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub run_id: String,
    pub first_page: u32,
    pub last_page: u32,
    pub pages_visited: u32,
    /// Rows written to the raw stream
    pub listed: usize,
    /// Notices counted against the item budget
    pub processed: usize,
    /// Notices already `ok` from an earlier run
    pub skipped: usize,
    pub failed: usize,
    pub stop: StopReason,
}

/// Run one crawl against an open page.
///
/// Only per-notice failures are absorbed (status `error` plus evidence);
/// navigation, recovery and storage errors end the run. Output and state
/// written before a failure stay on disk.
pub async fn run_crawl(
    config: &CrawlConfig,
    options: &RunOptions,
    driver: &mut dyn PageDriver,
) -> Result<CrawlSummary> {
    run_log::header(&format!("Nuri crawl {}", options.run_id));

    let state = StateStore::open(&options.state_db)?;
    let raw_writer = JsonlWriter::new(&options.out_raw_list);
    let norm_writer = JsonlWriter::new(&options.out_normalized);

    let navigator = Navigator::new(config);
    let lister = ListExtractor::new(config);
    let details = DetailExtractor::new(config);
    let paginator = Paginator::new(config, &navigator);

    navigator.navigate(driver).await?;

    let start_page = state
        .get_checkpoint(PAGE_CHECKPOINT)?
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let resumable = start_page > 1 && start_page <= options.max_pages;
    if resumable && !paginator.seek(driver, start_page).await? {
        log::warn!(
            "Page {} is not linked from the first page; counting from it anyway",
            start_page
        );
    }

    let mut summary = CrawlSummary {
        run_id: options.run_id.clone(),
        first_page: start_page,
        last_page: start_page,
        ..CrawlSummary::default()
    };
    let mut current_page = start_page;
    log::info!(
        "Start: page={}, processed=0/{}",
        current_page,
        options.max_items
    );

    loop {
        if current_page > options.max_pages {
            summary.stop = StopReason::MaxPages;
            break;
        }
        if summary.processed >= options.max_items {
            summary.stop = StopReason::MaxItems;
            break;
        }
        if options.cancel.is_cancelled() {
            summary.stop = StopReason::Cancelled;
            break;
        }

        run_log::step(current_page as usize, options.max_pages as usize, "List page");
        state.set_checkpoint(PAGE_CHECKPOINT, &current_page.to_string())?;
        summary.pages_visited += 1;
        summary.last_page = current_page;

        let remaining = options.max_items - summary.processed;
        let items = match lister.extract(driver, remaining).await {
            Ok(items) => items,
            Err(e) if !e.is_fatal() => {
                log::warn!("Page {}: {}", current_page, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        if items.is_empty() {
            log::warn!("No items extracted on page {}", current_page);
        }
        let items = filter_by_keywords(items, &options.keywords);

        for item in &items {
            raw_writer.write_one(item).await?;
            state.mark_seen(&item.notice_id, &utc_now_iso())?;
        }
        summary.listed += items.len();

        if options.list_only {
            summary.processed += items.len();
        } else {
            for item in &items {
                if summary.processed >= options.max_items || options.cancel.is_cancelled() {
                    break;
                }
                if state.is_processed(&item.notice_id)? {
                    summary.skipped += 1;
                    continue;
                }

                let outcome = process_item(
                    driver,
                    &details,
                    &state,
                    &norm_writer,
                    options,
                    item,
                )
                .await;
                match outcome {
                    Ok(()) => summary.processed += 1,
                    Err(e) if !e.is_fatal() => {
                        log::error!("{}", e);
                        state.upsert_processed(
                            &item.notice_id,
                            NoticeStatus::Error,
                            &utc_now_iso(),
                            None,
                        )?;
                        save_evidence(&options.errors_dir, &item.notice_id, driver, &e).await;
                        summary.failed += 1;
                    }
                    Err(e) => return Err(e),
                }

                if return_to_list(driver, &navigator).await? {
                    paginator.restore(driver, current_page).await?;
                }
            }
        }

        if options.cancel.is_cancelled() {
            summary.stop = StopReason::Cancelled;
            break;
        }
        if summary.processed >= options.max_items {
            summary.stop = StopReason::MaxItems;
            break;
        }
        if current_page >= options.max_pages {
            summary.stop = StopReason::MaxPages;
            break;
        }

        match paginator.advance(driver, current_page).await? {
            PageTurn::Advanced { .. } => current_page += 1,
            PageTurn::EndOfList => {
                summary.stop = StopReason::EndOfList;
                break;
            }
        }
    }

    run_log::summary(
        "Crawl",
        &[
            ("raw", options.out_raw_list.display().to_string()),
            ("normalized", options.out_normalized.display().to_string()),
            (
                "pages",
                format!("{}..{}", summary.first_page, summary.last_page),
            ),
            ("listed", summary.listed.to_string()),
            ("processed", summary.processed.to_string()),
            ("skipped", summary.skipped.to_string()),
            ("failed", summary.failed.to_string()),
            ("stop", format!("{:?}", summary.stop)),
        ],
    );
    Ok(summary)
}

/// Extract one notice and persist it.
///
/// Browser-side failures come back as [`AppError::DetailItem`]; state and
/// output failures are returned unchanged. The notice only becomes `ok`
/// after its record is on disk.
async fn process_item(
    driver: &mut dyn PageDriver,
    details: &DetailExtractor<'_>,
    state: &StateStore,
    writer: &JsonlWriter,
    options: &RunOptions,
    item: &ListItem,
) -> Result<()> {
    let fetched = match details.open(driver, item).await {
        Ok(()) => details.extract(driver).await,
        Err(e) => Err(e),
    };
    let detail = fetched.map_err(|e| AppError::detail_item(&item.notice_id, e))?;

    if detail.fields.is_empty() {
        log::warn!("No fields extracted for {}", item.notice_id);
    }

    let html_hash = sha256_hex(&detail.html);
    let previous = state.get_content_hash(&item.notice_id)?;
    let updated = previous.is_some_and(|prev| prev != html_hash);
    let record = DetailRecord::new(
        &options.run_id,
        utc_now_iso(),
        item,
        detail.url,
        detail.fields,
        html_hash,
        updated,
    );
    writer.write_one(&record).await?;
    state.upsert_processed(
        &item.notice_id,
        NoticeStatus::Ok,
        &utc_now_iso(),
        Some(&record.raw.html_sha256),
    )?;
    log::info!("Detail ok: {} ({})", item.notice_id, item.title);
    Ok(())
}

/// Go back to the list, re-navigating when history does not get there.
///
/// Returns `true` when the list was reloaded onto its first page.
async fn return_to_list(driver: &mut dyn PageDriver, navigator: &Navigator<'_>) -> Result<bool> {
    let back = match driver.go_back(timing::GO_BACK).await {
        Ok(()) => navigator.recover(driver).await,
        Err(e) => Err(e),
    };
    match back {
        Ok(reloaded) => Ok(reloaded),
        Err(e) => {
            log::warn!("Return to list failed: {}; navigating again", e);
            navigator
                .navigate(driver)
                .await
                .map_err(|e| AppError::recovery(format!("bid list lost: {e}")))?;
            Ok(true)
        }
    }
}

/// Launch Chromium, run one crawl and close the browser.
#[cfg(feature = "browser")]
pub async fn run_crawl_in_browser(
    config: &CrawlConfig,
    options: &RunOptions,
) -> Result<CrawlSummary> {
    use crate::browser::{ChromiumPage, LaunchOptions};

    let launch = LaunchOptions {
        headless: options.headless,
        slow_mo: std::time::Duration::from_millis(options.slow_mo_ms),
        ..LaunchOptions::default()
    };
    let mut page = ChromiumPage::launch(&launch).await?;
    let result = run_crawl(config, options, &mut page).await;
    if let Err(e) = page.close().await {
        log::warn!("Browser close failed: {}", e);
    }
    result
}
