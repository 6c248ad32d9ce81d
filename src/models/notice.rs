//! Bid notice data structures.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Site identifier written into every normalized record.
pub const SITE: &str = "nuri.g2b.go.kr";

/// One row of the bid list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListItem {
    /// Stable identifier derived from the detail URL or the row text
    pub notice_id: String,

    pub title: String,

    #[serde(default)]
    pub organization: Option<String>,

    #[serde(default)]
    pub posted_at: Option<String>,

    #[serde(default)]
    pub deadline_at: Option<String>,

    /// Raw `href` of the row's first anchor
    #[serde(default)]
    pub detail_url: Option<String>,

    /// Trimmed visible text of the row
    pub raw_text: String,

    /// Data needed to re-locate the row on the list page
    pub raw: RowLocator,
}

/// Where a list row lives on the page, plus its positional parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RowLocator {
    pub row_selector: String,
    pub row_index: usize,
    pub parsed: IndexMap<String, String>,
}

/// Content of one detail section.
///
/// Serialized untagged so a section is a JSON object or a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DetailSection {
    /// Key/value fields in document order
    Fields(IndexMap<String, String>),
    /// Table rows keyed by column name
    Rows(Vec<IndexMap<String, String>>),
}

impl DetailSection {
    pub fn as_fields(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Rows(_) => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[IndexMap<String, String>]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Fields(_) => None,
        }
    }
}

/// Extracted detail page content.
///
/// `Flat` is produced when no section schema is configured; both forms
/// serialize as a plain JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DetailFields {
    /// Section name to section content, in encounter order
    Sections(IndexMap<String, DetailSection>),
    /// Raw key to value, last write wins
    Flat(IndexMap<String, String>),
}

impl DetailFields {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Sections(sections) => sections.is_empty(),
            Self::Flat(fields) => fields.is_empty(),
        }
    }
}

impl Default for DetailFields {
    fn default() -> Self {
        Self::Sections(IndexMap::new())
    }
}

/// Provenance of a normalized record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceMeta {
    pub site: String,
    pub collected_at_utc: String,
    pub run_id: String,
}

/// The notice body of a normalized record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeBody {
    pub notice_id: String,
    pub title: String,
    /// URL of the rendered detail page
    pub detail_url: String,
    pub list_parsed: IndexMap<String, String>,
    pub detail_fields: DetailFields,
    /// True when a previous run stored a different page hash
    pub updated: bool,
}

/// Audit snapshot carried alongside the normalized notice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawSnapshot {
    pub list_item: ListItem,
    pub html_sha256: String,
}

/// Fully extracted document for one notice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailRecord {
    pub source: SourceMeta,
    pub notice: NoticeBody,
    pub raw: RawSnapshot,
}

impl DetailRecord {
    /// Assemble the record for a successfully extracted notice.
    pub fn new(
        run_id: &str,
        collected_at_utc: String,
        item: &ListItem,
        detail_url: String,
        detail_fields: DetailFields,
        html_sha256: String,
        updated: bool,
    ) -> Self {
        Self {
            source: SourceMeta {
                site: SITE.to_string(),
                collected_at_utc,
                run_id: run_id.to_string(),
            },
            notice: NoticeBody {
                notice_id: item.notice_id.clone(),
                title: item.title.clone(),
                detail_url,
                list_parsed: item.raw.parsed.clone(),
                detail_fields,
                updated,
            },
            raw: RawSnapshot {
                list_item: item.clone(),
                html_sha256,
            },
        }
    }
}

/// Processing status of a notice in the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeStatus {
    /// Listed but not yet extracted
    Seen,
    /// Detail extracted and written
    Ok,
    /// Detail extraction failed; retried on a later run
    Error,
}

impl NoticeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seen => "seen",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "seen" => Some(Self::Seen),
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}
