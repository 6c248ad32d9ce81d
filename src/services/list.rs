// src/services/list.rs

//! Bid list row extraction.

use indexmap::IndexMap;

use crate::browser::{Locator, PageDriver, PageScript, RowSnapshot};
use crate::error::{AppError, Result};
use crate::models::{CrawlConfig, ListItem, RowLocator};
use crate::services::probe::first_ready;
use crate::services::timing;
use crate::utils::notice_id;

/// Columns mapped positionally from the start of a row.
const LEADING_COLUMNS: usize = 10;
/// Columns mapped from the end of a row when the schema is wide enough.
const TRAILING_COLUMNS: usize = 3;

const TITLE_KEYS: &[&str] = &["입찰공고명", "공고명", "title"];
const ORGANIZATION_KEYS: &[&str] = &["기관명", "공고기관", "org", "organization"];
const POSTED_KEYS: &[&str] = &["공고게시일시", "게시일시", "posted", "posted_at"];
const DEADLINE_KEYS: &[&str] = &["입찰마감일시", "마감일시", "deadline", "deadline_at"];

/// Reads list rows from the current page.
pub struct ListExtractor<'a> {
    config: &'a CrawlConfig,
}

impl<'a> ListExtractor<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self { config }
    }

    /// Extract at most `limit` rows in one in-page read.
    pub async fn extract(
        &self,
        driver: &mut dyn PageDriver,
        limit: usize,
    ) -> Result<Vec<ListItem>> {
        let candidates = &self.config.list.row_selector_candidates;
        let row_selector = first_ready(driver, candidates, timing::ROW_PROBE)
            .await
            .ok_or_else(|| {
                AppError::extraction(format!("no row selector matched: {candidates:?}"))
            })?;

        let count = driver.count(&Locator::css(&row_selector)).await?;
        let n = count.min(limit);
        log::info!(
            "Found {} list rows (selector={}, limit={})",
            count,
            row_selector,
            n
        );
        if n == 0 {
            return Ok(Vec::new());
        }

        let script = PageScript::ListRows {
            selector: row_selector.clone(),
            link_selectors: self.config.list.link_selector_candidates.clone(),
            limit: n,
        };
        let rows: Vec<RowSnapshot> = serde_json::from_value(driver.evaluate(&script).await?)?;

        Ok(rows
            .into_iter()
            .map(|row| parse_row(&self.config.list.columns, &row_selector, row))
            .collect())
    }
}

/// Split row text into trimmed, non-empty cell tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(['\t', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map row tokens onto the configured columns.
///
/// The first ten tokens map in order. With thirteen or more columns the
/// last three tokens also map onto columns 11 to 13, since the middle of a
/// row can hold a variable number of cells.
pub fn map_columns(columns: &[String], parts: &[String]) -> IndexMap<String, String> {
    let mut parsed = IndexMap::new();
    if columns.is_empty() || parts.is_empty() {
        return parsed;
    }
    for (name, part) in columns.iter().take(LEADING_COLUMNS).zip(parts) {
        parsed.insert(name.clone(), part.clone());
    }
    if columns.len() >= LEADING_COLUMNS + TRAILING_COLUMNS && parts.len() >= TRAILING_COLUMNS {
        let tail = &parts[parts.len() - TRAILING_COLUMNS..];
        for (name, part) in columns[LEADING_COLUMNS..LEADING_COLUMNS + TRAILING_COLUMNS]
            .iter()
            .zip(tail)
        {
            parsed.insert(name.clone(), part.clone());
        }
    }
    parsed
}

fn lookup(parsed: &IndexMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| parsed.get(*k))
        .find(|v| !v.is_empty())
        .cloned()
}

/// Build a list item from one row snapshot.
pub fn parse_row(columns: &[String], row_selector: &str, row: RowSnapshot) -> ListItem {
    let parts = tokenize(&row.text);
    let parsed = map_columns(columns, &parts);

    let title = lookup(&parsed, TITLE_KEYS)
        .or_else(|| parts.get(2).cloned())
        .unwrap_or_else(|| row.text.lines().next().unwrap_or_default().trim().to_string());

    let detail_url = row.href.filter(|h| !h.trim().is_empty());

    ListItem {
        notice_id: notice_id(detail_url.as_deref(), &row.text),
        title,
        organization: lookup(&parsed, ORGANIZATION_KEYS),
        posted_at: lookup(&parsed, POSTED_KEYS),
        deadline_at: lookup(&parsed, DEADLINE_KEYS),
        detail_url,
        raw_text: row.text,
        raw: RowLocator {
            row_selector: row_selector.to_string(),
            row_index: row.index,
            parsed,
        },
    }
}

/// Keep items whose title or row text contains any keyword.
pub fn filter_by_keywords(items: Vec<ListItem>, keywords: &[String]) -> Vec<ListItem> {
    if keywords.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            keywords
                .iter()
                .any(|k| item.title.contains(k.as_str()) || item.raw_text.contains(k.as_str()))
        })
        .collect()
}
