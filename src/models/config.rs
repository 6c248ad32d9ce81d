//! Site configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root crawl configuration for the bid-notice portal.
///
/// Built once per run from a TOML (or JSON) document and read-only after
/// that. Every selector list is an ordered set of candidates; the first
/// one that matches the live page wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Portal entry URL
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Menu, search and list-readiness settings
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Bid list grid settings
    #[serde(default)]
    pub list: ListConfig,

    /// Detail page settings
    #[serde(default)]
    pub detail: DetailConfig,

    /// Keyword filters applied to list rows
    #[serde(default)]
    pub filters: FilterConfig,
}

impl CrawlConfig {
    /// Load configuration from a TOML file, or JSON when the extension is `.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate the section schema and the required navigation settings.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::config("base_url is empty"));
        }
        url::Url::parse(&self.base_url)?;

        if self.navigation.bid_list_ready_selectors.is_empty() {
            return Err(AppError::config(
                "navigation.bid_list_ready_selectors is empty",
            ));
        }
        if self.list.row_selector_candidates.is_empty() {
            return Err(AppError::config("list.row_selector_candidates is empty"));
        }
        if self.detail.ready_selectors.is_empty() {
            return Err(AppError::config("detail.ready_selectors is empty"));
        }

        let sections: HashSet<&str> = self.detail.sections.iter().map(String::as_str).collect();
        for name in &self.detail.table_sections {
            if !sections.contains(name.as_str()) {
                return Err(AppError::config(format!(
                    "detail.table_sections entry '{name}' is not a declared section"
                )));
            }
        }
        for name in self.detail.field_sections.keys() {
            if !sections.contains(name.as_str()) {
                return Err(AppError::config(format!(
                    "detail.field_sections key '{name}' is not a declared section"
                )));
            }
        }
        for name in self.detail.table_columns.keys() {
            if !sections.contains(name.as_str()) {
                return Err(AppError::config(format!(
                    "detail.table_columns key '{name}' is not a declared section"
                )));
            }
        }
        Ok(())
    }

    /// Mega-menu settings, required because the bid list is only reachable
    /// through the site menu.
    pub fn mega_menu(&self) -> Result<&MegaMenu> {
        self.navigation
            .mega_menu
            .as_ref()
            .ok_or_else(|| AppError::config("navigation requires mega_menu config"))
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            navigation: NavigationConfig::default(),
            list: ListConfig::default(),
            detail: DetailConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

/// Navigation from the landing page to the bid list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Visible label of the search button in the filter box
    #[serde(default)]
    pub search_button_text: Option<String>,

    /// CSS selector of the search button (tried before the label)
    #[serde(default)]
    pub search_button_selector: Option<String>,

    /// Selectors that indicate the bid list grid is rendered
    #[serde(default = "defaults::bid_list_ready_selectors")]
    pub bid_list_ready_selectors: Vec<String>,

    /// Hover/click menu path to the bid list
    #[serde(default)]
    pub mega_menu: Option<MegaMenu>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            search_button_text: None,
            search_button_selector: None,
            bid_list_ready_selectors: defaults::bid_list_ready_selectors(),
            mega_menu: None,
        }
    }
}

/// Two-level menu: hover a top entry to reveal the sub entry, then click it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MegaMenu {
    #[serde(default = "defaults::depth1_selector")]
    pub depth1_selector: String,

    #[serde(default = "defaults::depth3_selector")]
    pub depth3_selector: String,

    #[serde(default)]
    pub hover_text: String,

    #[serde(default)]
    pub click_text: String,
}

/// Bid list grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// Column names in on-screen order, used for positional parsing
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default = "defaults::row_selector_candidates")]
    pub row_selector_candidates: Vec<String>,

    #[serde(default = "defaults::link_selector_candidates")]
    pub link_selector_candidates: Vec<String>,

    #[serde(default = "defaults::next_button_name_candidates")]
    pub next_button_name_candidates: Vec<String>,

    #[serde(default)]
    pub next_button_selector_candidates: Vec<String>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            row_selector_candidates: defaults::row_selector_candidates(),
            link_selector_candidates: defaults::link_selector_candidates(),
            next_button_name_candidates: defaults::next_button_name_candidates(),
            next_button_selector_candidates: Vec::new(),
        }
    }
}

/// Detail page settings and the section schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailConfig {
    #[serde(default = "defaults::detail_ready_selectors")]
    pub ready_selectors: Vec<String>,

    /// Section names in precedence order
    #[serde(default)]
    pub sections: Vec<String>,

    /// Sections emitted as row lists rather than key/value maps
    #[serde(default)]
    pub table_sections: Vec<String>,

    /// Expected field names per section
    #[serde(default)]
    pub field_sections: IndexMap<String, Vec<String>>,

    /// Expected column names per table section
    #[serde(default)]
    pub table_columns: IndexMap<String, Vec<String>>,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            ready_selectors: defaults::detail_ready_selectors(),
            sections: Vec::new(),
            table_sections: Vec::new(),
            field_sections: IndexMap::new(),
            table_columns: IndexMap::new(),
        }
    }
}

/// Keyword filter; an empty list keeps every row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl FilterConfig {
    /// Configured keywords followed by `extra`, trimmed, blanks and
    /// duplicates removed.
    pub fn merged_keywords(&self, extra: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .chain(extra)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty() && seen.insert(k.to_string()))
            .map(str::to_string)
            .collect()
    }
}

mod defaults {
    pub fn base_url() -> String {
        "https://nuri.g2b.go.kr/".into()
    }
    pub fn bid_list_ready_selectors() -> Vec<String> {
        vec!["tbody tr".into()]
    }
    pub fn depth1_selector() -> String {
        "a.depth1".into()
    }
    pub fn depth3_selector() -> String {
        "a.depth3".into()
    }
    pub fn row_selector_candidates() -> Vec<String> {
        vec!["tbody tr".into()]
    }
    pub fn link_selector_candidates() -> Vec<String> {
        vec!["a".into()]
    }
    pub fn next_button_name_candidates() -> Vec<String> {
        vec!["다음".into(), ">".into()]
    }
    pub fn detail_ready_selectors() -> Vec<String> {
        vec!["body".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
base_url = "https://nuri.g2b.go.kr/"

[navigation]
search_button_text = "검색"
bid_list_ready_selectors = ["tr.grid_body_row", "tbody tr"]

[navigation.mega_menu]
hover_text = "입찰공고"
click_text = "입찰공고목록"

[list]
columns = ["title", "org", "deadline"]
next_button_selector_candidates = [".w2pageList_control_next"]

[detail]
sections = ["공고일반", "입찰자격", "재입찰"]
table_sections = ["재입찰"]

[detail.field_sections]
"공고일반" = ["입찰공고번호", "공고명"]
"입찰자격" = ["지역제한"]

[detail.table_columns]
"재입찰" = ["재입찰번호", "공고명", "개찰일시"]

[filters]
keywords = ["용역"]
"#;

    #[test]
    fn test_parse_nested_toml() {
        let config: CrawlConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.navigation.search_button_text.as_deref(), Some("검색"));
        assert_eq!(config.navigation.bid_list_ready_selectors.len(), 2);
        assert_eq!(config.mega_menu().unwrap().depth1_selector, "a.depth1");
        assert_eq!(config.list.columns, vec!["title", "org", "deadline"]);
        assert_eq!(config.list.next_button_name_candidates, vec!["다음", ">"]);
        assert_eq!(config.detail.table_sections, vec!["재입찰"]);
        assert_eq!(config.filters.keywords, vec!["용역"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_site() {
        let config = CrawlConfig::default();
        assert_eq!(config.base_url, "https://nuri.g2b.go.kr/");
        assert_eq!(config.list.row_selector_candidates, vec!["tbody tr"]);
        assert_eq!(config.detail.ready_selectors, vec!["body"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_mega_menu_is_config_error() {
        let config = CrawlConfig::default();
        assert!(matches!(config.mega_menu(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_undeclared_table_section() {
        let mut config: CrawlConfig = toml::from_str(SAMPLE).unwrap();
        config.detail.table_sections.push("없는섹션".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undeclared_field_section() {
        let mut config: CrawlConfig = toml::from_str(SAMPLE).unwrap();
        config
            .detail
            .field_sections
            .insert("기타".to_string(), vec!["비고".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("default.json");
        std::fs::write(
            &path,
            r#"{"base_url": "https://example.com/", "list": {"columns": ["a", "b"]}}"#,
        )
        .unwrap();

        let config = CrawlConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://example.com/");
        assert_eq!(config.list.columns, vec!["a", "b"]);
    }

    #[test]
    fn test_merged_keywords_keep_order() {
        let filters = FilterConfig {
            keywords: vec!["용역".to_string(), " 공사 ".to_string()],
        };
        let merged = filters.merged_keywords(&["공사".to_string(), "".to_string(), "청소".to_string()]);
        assert_eq!(merged, vec!["용역", "공사", "청소"]);
    }

    #[test]
    fn test_bundled_site_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/nuri.toml");
        let config = CrawlConfig::load(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.list.columns.len(), 13);
        assert!(config.mega_menu().is_ok());
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = CrawlConfig::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.base_url, "https://nuri.g2b.go.kr/");
    }
}
