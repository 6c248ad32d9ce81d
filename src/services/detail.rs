// src/services/detail.rs

//! Detail page extraction.
//!
//! Runs in three steps over the rendered markup:
//!
//! 1. **Harvest**: ordered `(key, value)` pairs from `th`/`td` rows and
//!    `dt`/`dd` lists, plus header-led tables.
//! 2. **Sectioning**: a fold over the pairs that carries the current
//!    section and files each field under it.
//! 3. **Tables**: header-led tables are matched to table-sections by their
//!    column sets.
//!
//! Steps 1-3 are pure functions of the HTML and the config, so a saved
//! page gives the same record every time.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::browser::{PageDriver, PageScript};
use crate::error::{AppError, Result};
use crate::models::{CrawlConfig, DetailConfig, DetailFields, DetailSection, ListItem};
use crate::services::probe::first_ready;
use crate::services::timing;
use crate::utils::{is_navigable_url, normalize_key, resolve_url};

/// Section that keeps fields no other section declares.
pub const CATCH_ALL_SECTION: &str = "공고일반";

/// Header aliases seen on re-bid tables.
const COLUMN_ALIASES: &[(&str, &str)] = &[("번호", "재입찰번호"), ("공고", "공고명")];

/// A table introduced by a header-only row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything harvested from one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDetail {
    /// Key/value pairs; table rows first, then definition lists
    pub ordered: Vec<(String, String)>,
    pub tables: Vec<RawTable>,
}

/// A successfully extracted detail page.
#[derive(Debug, Clone)]
pub struct ExtractedDetail {
    pub fields: DetailFields,
    pub html: String,
    pub url: String,
}

/// Opens detail pages and extracts them.
pub struct DetailExtractor<'a> {
    config: &'a CrawlConfig,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self { config }
    }

    /// Open the detail view of `item`: by URL when it has a real link,
    /// otherwise by clicking the link inside its list row.
    pub async fn open(&self, driver: &mut dyn PageDriver, item: &ListItem) -> Result<()> {
        if let Some(href) = item.detail_url.as_deref().filter(|h| is_navigable_url(Some(*h))) {
            let base = Url::parse(&self.config.base_url)?;
            let url = resolve_url(&base, href.trim());
            match driver.goto(&url, timing::GOTO).await {
                Ok(()) => return Ok(()),
                Err(e) => log::debug!("Detail goto failed for {}: {}", item.notice_id, e),
            }
        }

        let script = PageScript::ClickRowLink {
            selector: item.raw.row_selector.clone(),
            index: item.raw.row_index,
        };
        if driver.evaluate(&script).await?.as_bool() == Some(true) {
            driver.settle(timing::AFTER_ROW_CLICK).await;
            return Ok(());
        }
        Err(AppError::extraction(format!(
            "no detail link in row {} of '{}'",
            item.raw.row_index, item.raw.row_selector
        )))
    }

    /// Wait for the detail page and extract it.
    pub async fn extract(&self, driver: &mut dyn PageDriver) -> Result<ExtractedDetail> {
        let candidates = &self.config.detail.ready_selectors;
        first_ready(driver, candidates, timing::DETAIL_READY)
            .await
            .ok_or_else(|| {
                AppError::extraction(format!("detail page not ready: {candidates:?}"))
            })?;
        driver.settle(timing::DETAIL_SETTLE).await;

        let html = driver.content().await?;
        let fields = extract_fields(&html, &self.config.detail)?;
        let url = driver.current_url().await?;
        Ok(ExtractedDetail { fields, html, url })
    }
}

/// Harvest and section a detail page.
pub fn extract_fields(html: &str, detail: &DetailConfig) -> Result<DetailFields> {
    let raw = harvest(html)?;
    Ok(assign_sections(&raw, detail))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Collect key/value pairs and header-led tables.
///
/// Table rows are read in document order: a row with both `th` and `td`
/// cells yields pairs position by position, a row of two or more `th`
/// starts a table, a `td`-only row extends the last table, and a single
/// `th` yields a key with an empty value (section titles look like that).
pub fn harvest(html: &str) -> Result<RawDetail> {
    let document = Html::parse_document(html);
    let tr = parse_selector("table tr")?;
    let th = parse_selector("th")?;
    let td = parse_selector("td")?;
    let dl = parse_selector("dl")?;
    let dt = parse_selector("dt")?;
    let dd = parse_selector("dd")?;

    let mut raw = RawDetail::default();
    for row in document.select(&tr) {
        let ths: Vec<String> = row.select(&th).map(cell_text).collect();
        let tds: Vec<String> = row.select(&td).map(cell_text).collect();
        match (ths.len(), tds.len()) {
            (h, d) if h >= 1 && d >= 1 => raw.ordered.extend(ths.into_iter().zip(tds)),
            (h, 0) if h >= 2 => raw.tables.push(RawTable {
                headers: ths,
                rows: Vec::new(),
            }),
            (0, d) if d >= 1 => {
                if let Some(table) = raw.tables.last_mut() {
                    table.rows.push(tds);
                }
            }
            (1, 0) => {
                if let Some(key) = ths.into_iter().next() {
                    raw.ordered.push((key, String::new()));
                }
            }
            _ => {}
        }
    }

    for list in document.select(&dl) {
        let dts = list.select(&dt).map(cell_text);
        let dds = list.select(&dd).map(cell_text);
        raw.ordered.extend(dts.zip(dds));
    }
    Ok(raw)
}

/// Lookups derived from the section schema.
struct Schema<'a> {
    detail: &'a DetailConfig,
    order: HashMap<&'a str, usize>,
    tables: HashSet<&'a str>,
    /// Normalized field name to the non-table sections declaring it
    field_owners: HashMap<String, Vec<&'a str>>,
}

impl<'a> Schema<'a> {
    fn new(detail: &'a DetailConfig) -> Self {
        let tables: HashSet<&str> = detail.table_sections.iter().map(String::as_str).collect();
        let order = detail
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut field_owners: HashMap<String, Vec<&str>> = HashMap::new();
        for section in detail.sections.iter().filter(|s| !tables.contains(s.as_str())) {
            for field in detail.field_sections.get(section).into_iter().flatten() {
                let key = normalize_key(field);
                if !key.is_empty() {
                    field_owners.entry(key).or_default().push(section.as_str());
                }
            }
        }

        Self {
            detail,
            order,
            tables,
            field_owners,
        }
    }

    fn is_section(&self, name: &str) -> bool {
        self.order.contains_key(name)
    }

    fn is_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    fn declared_fields(&self, section: Option<&str>) -> HashSet<String> {
        section
            .and_then(|s| self.detail.field_sections.get(s))
            .into_iter()
            .flatten()
            .map(|f| normalize_key(f))
            .collect()
    }

    /// First section declaring `key` that comes after `current`.
    fn next_owner(&self, key: &str, current: Option<&str>) -> Option<&'a str> {
        let owners = self.field_owners.get(key)?;
        let current_index = current.and_then(|c| self.order.get(c)).copied();
        owners.iter().copied().find(|owner| {
            let index = self.order.get(owner).copied();
            match (index, current_index) {
                (Some(i), Some(c)) => i > c,
                (Some(_), None) => true,
                _ => false,
            }
        })
    }
}

/// Fold state: the section being filled and everything filed so far.
#[derive(Debug, Default)]
struct Cursor {
    current: Option<String>,
    out: IndexMap<String, DetailSection>,
}

impl Cursor {
    fn start(schema: &Schema<'_>) -> Self {
        let mut cursor = Self::default();
        if let Some(first) = schema.detail.sections.first() {
            if !schema.is_table(first) {
                cursor
                    .out
                    .insert(first.clone(), DetailSection::Fields(IndexMap::new()));
            }
            cursor.current = Some(first.clone());
        }
        cursor
    }

    fn fields_of(&self, section: &str) -> Option<&IndexMap<String, String>> {
        self.out.get(section).and_then(DetailSection::as_fields)
    }

    fn step(mut self, schema: &Schema<'_>, key: &str, value: &str) -> Self {
        let nk = normalize_key(key);
        if nk.is_empty() {
            return self;
        }

        if schema.is_section(&nk) {
            let is_table = schema.is_table(&nk);
            let section = self.out.entry(nk.clone()).or_insert_with(|| {
                if is_table {
                    DetailSection::Rows(Vec::new())
                } else {
                    DetailSection::Fields(IndexMap::new())
                }
            });
            if !value.is_empty() && !is_table {
                if let DetailSection::Fields(fields) = section {
                    fields.insert(key.to_string(), value.to_string());
                }
            }
            self.current = Some(nk);
            return self;
        }

        let current = self.current.as_deref();
        let declared_here = schema.declared_fields(current);
        let in_current = declared_here.contains(&nk);
        let already_recorded = in_current
            && current
                .and_then(|c| self.fields_of(c))
                .is_some_and(|fields| fields.keys().any(|k| normalize_key(k) == nk));

        if let Some(target) = schema.next_owner(&nk, current) {
            if !schema.is_table(target) && (!in_current || already_recorded) {
                self.out
                    .entry(target.to_string())
                    .or_insert_with(|| DetailSection::Fields(IndexMap::new()));
                self.current = Some(target.to_string());
            }
        }

        let Some(current) = self.current.clone() else {
            return self;
        };
        let declared = schema.declared_fields(Some(&current));
        if !declared.is_empty() && !declared.contains(&nk) && current != CATCH_ALL_SECTION {
            return self;
        }
        if let Some(DetailSection::Fields(fields)) = self.out.get_mut(&current) {
            fields.insert(key.to_string(), value.to_string());
        }
        self
    }
}

/// File harvested pairs and tables under the configured sections.
///
/// Without any section schema the pairs are returned flat, last write
/// wins. Otherwise a section-name key moves the cursor, a field declared
/// by a later section moves it forward, and a field the current section
/// does not declare is dropped unless the cursor is on the catch-all
/// section. A field declared only by earlier sections is dropped.
pub fn assign_sections(raw: &RawDetail, detail: &DetailConfig) -> DetailFields {
    if detail.sections.is_empty() && detail.field_sections.is_empty() {
        let flat = raw
            .ordered
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        return DetailFields::Flat(flat);
    }

    let schema = Schema::new(detail);
    let cursor = raw
        .ordered
        .iter()
        .fold(Cursor::start(&schema), |cursor, (k, v)| cursor.step(&schema, k, v));

    let mut out = cursor.out;
    assign_tables(&raw.tables, detail, &mut out);
    DetailFields::Sections(out)
}

fn alias(header: &str) -> Option<&'static str> {
    COLUMN_ALIASES
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| *to)
}

/// Whether a table with `headers` fits a section expecting `want`: all
/// expected columns present, or at least `max(2, |want| - 1)` of them.
pub fn table_matches(want: &HashSet<String>, headers: &HashSet<String>) -> bool {
    if want.is_empty() {
        return false;
    }
    let overlap = want.intersection(headers).count();
    overlap == want.len() || overlap >= 2.max(want.len().saturating_sub(1))
}

fn assign_tables(
    tables: &[RawTable],
    detail: &DetailConfig,
    out: &mut IndexMap<String, DetailSection>,
) {
    for table in tables {
        let headers: Vec<String> = table.headers.iter().map(|h| normalize_key(h)).collect();
        let canonical: Vec<String> = headers
            .iter()
            .map(|h| normalize_key(alias(h).unwrap_or(h.as_str())))
            .collect();
        let available: HashSet<String> = canonical.iter().cloned().collect();

        for (section, columns) in &detail.table_columns {
            let filled = out
                .get(section)
                .and_then(DetailSection::as_rows)
                .is_some_and(|rows| !rows.is_empty());
            if filled {
                continue;
            }

            let want: HashSet<String> = columns.iter().map(|c| normalize_key(c)).collect();
            if !table_matches(&want, &available) {
                continue;
            }
            let original: HashMap<String, &String> =
                columns.iter().map(|c| (normalize_key(c), c)).collect();

            let records: Vec<IndexMap<String, String>> = table
                .rows
                .iter()
                .filter_map(|row| {
                    let mut record = IndexMap::new();
                    for (i, (header, canon)) in headers.iter().zip(&canonical).enumerate() {
                        let Some(cell) = row.get(i) else { continue };
                        if !want.contains(canon) {
                            continue;
                        }
                        let key = original
                            .get(canon)
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| {
                                alias(header).unwrap_or(header.as_str()).to_string()
                            });
                        record.insert(key, cell.trim().to_string());
                    }
                    record.values().any(|v| !v.is_empty()).then_some(record)
                })
                .collect();

            if !records.is_empty() {
                out.insert(section.clone(), DetailSection::Rows(records));
            }
            break;
        }
    }

    for section in &detail.table_sections {
        out.entry(section.clone())
            .or_insert_with(|| DetailSection::Rows(Vec::new()));
    }
}
