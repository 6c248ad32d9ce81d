//! Browser capability boundary.
//!
//! The crawl core drives a page only through [`PageDriver`]. The Chromium
//! backend lives in `chromium` behind the `browser` feature; tests use
//! the scripted `mock` page.

#[cfg(feature = "browser")]
mod chromium;
#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumPage, LaunchOptions};

/// Accessible role used by role-based locators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Button,
    Link,
}

impl Role {
    /// CSS matching elements that expose this role.
    pub fn css(&self) -> &'static str {
        match self {
            Self::Button => {
                "button, [role=button], input[type=button], input[type=submit], input[type=image]"
            }
            Self::Link => "a[href], [role=link]",
        }
    }
}

/// How to find one element on the page. The first match is always used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Plain CSS selector
    Css(String),
    /// CSS selector filtered to elements whose text contains `text`
    CssWithText { selector: String, text: String },
    /// Element with an accessible role whose name contains `name`
    Role { role: Role, name: String },
    /// Element whose own trimmed text equals (or contains) `text`
    Text { text: String, exact: bool },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn css_with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Self::Role {
            role,
            name: name.into(),
        }
    }

    pub fn text(text: impl Into<String>, exact: bool) -> Self {
        Self::Text {
            text: text.into(),
            exact,
        }
    }

    /// JavaScript expression evaluating to the array of matching elements.
    pub fn finder_js(&self) -> String {
        match self {
            Self::Css(selector) => {
                format!("Array.from(document.querySelectorAll({}))", js_str(selector))
            }
            Self::CssWithText { selector, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(e => (e.textContent || '').includes({}))",
                js_str(selector),
                js_str(text)
            ),
            Self::Role { role, name } => format!(
                "Array.from(document.querySelectorAll({})).filter(e => {{ \
                 const n = (e.getAttribute('aria-label') || e.value || e.textContent || '').trim().toLowerCase(); \
                 return n.includes({}); }})",
                js_str(role.css()),
                js_str(&name.to_lowercase())
            ),
            Self::Text { text, exact } => format!(
                "Array.from(document.querySelectorAll('body *')).filter(e => {{ \
                 const t = (e.innerText || e.textContent || '').trim(); \
                 return {} && !Array.from(e.children).some(c => (c.innerText || c.textContent || '').trim() === t); }})",
                if *exact {
                    format!("t === {}", js_str(text))
                } else {
                    format!("t.includes({})", js_str(text))
                }
            ),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css={selector}"),
            Self::CssWithText { selector, text } => write!(f, "css={selector} has-text={text}"),
            Self::Role { role, name } => write!(f, "role={role:?} name={name}"),
            Self::Text { text, exact } => write!(f, "text={text} exact={exact}"),
        }
    }
}

/// Scripts evaluated inside the page in one round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// Read text and link of the first `limit` rows matching `selector`.
    /// Evaluates to a JSON array of [`RowSnapshot`].
    ListRows {
        selector: String,
        link_selectors: Vec<String>,
        limit: usize,
    },
    /// Click the first link in row `index` of `selector`.
    /// Evaluates to `true` when a link was clicked.
    ClickRowLink { selector: String, index: usize },
}

impl PageScript {
    /// JavaScript source of the script.
    pub fn source(&self) -> String {
        match self {
            Self::ListRows {
                selector,
                link_selectors,
                limit,
            } => format!(
                r#"(() => {{
    const rows = document.querySelectorAll({selector});
    const links = {links};
    const n = Math.min(rows.length, {limit});
    const result = [];
    for (let i = 0; i < n; i++) {{
        const row = rows[i];
        const text = (row.innerText || row.textContent || '').trim();
        let href = null;
        for (const sel of links) {{
            const a = row.querySelector(sel);
            if (a) {{ href = a.getAttribute('href'); break; }}
        }}
        result.push({{ text, href, index: i }});
    }}
    return result;
}})()"#,
                selector = js_str(selector),
                links = serde_json::to_string(link_selectors).unwrap_or_else(|_| "[]".into()),
                limit = limit
            ),
            Self::ClickRowLink { selector, index } => format!(
                r#"(() => {{
    const row = document.querySelectorAll({selector})[{index}];
    if (!row) return false;
    const a = row.querySelector('a');
    if (!a) return false;
    a.click();
    return true;
}})()"#,
                selector = js_str(selector),
                index = index
            ),
        }
    }
}

/// One list row as read by [`PageScript::ListRows`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowSnapshot {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: Option<String>,
    pub index: usize,
}

/// Quote a string as a JavaScript literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// The set of page operations the crawler needs from a browser engine.
///
/// One driver wraps one page; `&mut self` keeps every call strictly
/// sequential.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate and wait for the DOM to load.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until `selector` matches at least one element.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of elements the locator currently matches.
    async fn count(&mut self, locator: &Locator) -> Result<usize>;

    /// Click the first match, waiting up to `timeout` for it to appear.
    async fn click(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Move the mouse over the first match.
    async fn hover(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Evaluate a script and return its JSON result.
    async fn evaluate(&mut self, script: &PageScript) -> Result<Value>;

    /// Go one step back in history.
    async fn go_back(&mut self, timeout: Duration) -> Result<()>;

    /// Rendered markup of the whole document.
    async fn content(&mut self) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    async fn current_url(&mut self) -> Result<String>;

    /// Fixed wait for asynchronous rendering.
    async fn settle(&mut self, delay: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"input[value="검색"]"#), r#""input[value=\"검색\"]""#);
    }

    #[test]
    fn test_list_rows_script_embeds_arguments() {
        let script = PageScript::ListRows {
            selector: "tr.grid_body_row".to_string(),
            link_selectors: vec!["a".to_string()],
            limit: 7,
        };
        let source = script.source();
        assert!(source.contains(r#"document.querySelectorAll("tr.grid_body_row")"#));
        assert!(source.contains(r#"const links = ["a"];"#));
        assert!(source.contains("Math.min(rows.length, 7)"));
    }

    #[test]
    fn test_row_snapshot_accepts_null_href() {
        let rows: Vec<RowSnapshot> =
            serde_json::from_str(r#"[{"text": "a", "href": null, "index": 0}]"#).unwrap();
        assert_eq!(rows[0].href, None);
    }

    #[test]
    fn test_role_finder_lowercases_name() {
        let js = Locator::role(Role::Button, "Next").finder_js();
        assert!(js.contains(r#"n.includes("next")"#));
        assert!(js.contains("[role=button]"));
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(
            Locator::css_with_text("a.depth1", "입찰공고").to_string(),
            "css=a.depth1 has-text=입찰공고"
        );
    }
}
