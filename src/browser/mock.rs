//! Scripted in-memory page for tests.
//!
//! Simulates the portal closely enough for the crawl loop: a landing page
//! with a hover menu, a paged list grid, detail pages reached by URL or by
//! clicking a row, and pages that break after a number of detail opens.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Locator, PageDriver, PageScript};
use crate::error::{AppError, Result};

pub const LIST_SELECTOR: &str = "tr.grid_body_row";
pub const DETAIL_SELECTOR: &str = "div.detail";

#[derive(Debug, Clone)]
pub struct MockRow {
    pub text: String,
    pub href: Option<String>,
    pub detail_html: String,
}

impl MockRow {
    pub fn new(text: &str, href: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            href: href.map(str::to_string),
            detail_html: format!(
                "<html><body><div class=\"detail\"><table>\
                 <tr><th>공고명</th><td>{}</td></tr></table></div></body></html>",
                text.split('\t').next().unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    Home,
    List,
    Detail { row: usize, broken: bool },
}

pub struct MockPage {
    pub base_url: String,
    pub pages: Vec<Vec<MockRow>>,
    /// Detail opens from this 1-based count onward render a broken page
    pub fail_detail_from: Option<usize>,
    pub screenshot_fails: bool,
    /// History navigation errors out and leaves the page where it was
    pub go_back_fails: bool,
    /// Loading the portal fails once it has been visited this many times
    pub home_fails_after: Option<usize>,
    /// Whether the numbered pager is rendered
    pub page_links: bool,
    /// Extra control that moves the grid one page forward
    pub next_control: Option<Locator>,
    /// Every detail open, as the row's first text token
    pub detail_opens: Vec<String>,
    /// Navigations to the base URL
    pub home_visits: usize,
    view: View,
    list_page: usize,
    menu_open: bool,
}

impl MockPage {
    pub fn new(base_url: &str, pages: Vec<Vec<MockRow>>) -> Self {
        Self {
            base_url: base_url.to_string(),
            pages,
            fail_detail_from: None,
            screenshot_fails: false,
            go_back_fails: false,
            home_fails_after: None,
            page_links: true,
            next_control: None,
            detail_opens: Vec::new(),
            home_visits: 0,
            view: View::Blank,
            list_page: 0,
            menu_open: false,
        }
    }

    /// One page of `n` rows with navigable detail links.
    pub fn with_rows(base_url: &str, n: usize) -> Self {
        let rows = (1..=n)
            .map(|i| {
                MockRow::new(
                    &format!("공고{i}\t기관{i}\t2026-01-0{}", i % 9 + 1),
                    Some(&format!("{base_url}detail?no={i}")),
                )
            })
            .collect();
        Self::new(base_url, vec![rows])
    }

    fn rows(&self) -> &[MockRow] {
        self.pages
            .get(self.list_page)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn open_detail(&mut self, row: usize) {
        let label = self.rows()[row]
            .text
            .split('\t')
            .next()
            .unwrap_or_default()
            .to_string();
        self.detail_opens.push(label);
        let broken = self
            .fail_detail_from
            .is_some_and(|from| self.detail_opens.len() >= from);
        self.view = View::Detail { row, broken };
    }

    fn page_link_index(&self, selector: &str) -> Option<usize> {
        if !self.page_links {
            return None;
        }
        let rest = selector.strip_prefix("a[id*='pagelist_page_'][index='")?;
        rest.strip_suffix("']")?.parse().ok()
    }

    fn is_next_control(&self, locator: &Locator) -> bool {
        self.view == View::List
            && self.next_control.as_ref() == Some(locator)
            && self.list_page + 1 < self.pages.len()
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        if url == self.base_url {
            if self
                .home_fails_after
                .is_some_and(|limit| self.home_visits >= limit)
            {
                return Err(AppError::browser(format!("net::ERR_CONNECTION_RESET {url}")));
            }
            self.home_visits += 1;
            self.view = View::Home;
            self.menu_open = false;
            self.list_page = 0;
            return Ok(());
        }
        let row = self
            .rows()
            .iter()
            .position(|r| r.href.as_deref() == Some(url));
        match row {
            Some(row) => {
                self.open_detail(row);
                Ok(())
            }
            None => Err(AppError::browser(format!("net::ERR_ABORTED {url}"))),
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let ready = match self.view {
            View::List => selector == LIST_SELECTOR && !self.rows().is_empty(),
            View::Detail { broken, .. } => {
                !broken && (selector == DETAIL_SELECTOR || selector == "body")
            }
            View::Home | View::Blank => false,
        };
        if ready {
            Ok(())
        } else {
            Err(AppError::browser(format!(
                "timed out after {timeout:?} waiting for '{selector}'"
            )))
        }
    }

    async fn count(&mut self, locator: &Locator) -> Result<usize> {
        if self.view != View::List {
            return Ok(0);
        }
        if self.is_next_control(locator) {
            return Ok(1);
        }
        let n = match locator {
            Locator::Css(selector) if selector == LIST_SELECTOR => self.rows().len(),
            Locator::Css(selector) => match self.page_link_index(selector) {
                Some(index) if index >= 1 && index <= self.pages.len() => 1,
                _ => 0,
            },
            _ => 0,
        };
        Ok(n)
    }

    async fn click(&mut self, locator: &Locator, _timeout: Duration) -> Result<()> {
        if self.is_next_control(locator) {
            self.list_page += 1;
            return Ok(());
        }
        match (self.view, locator) {
            (View::Home, Locator::CssWithText { selector, .. })
                if self.menu_open && selector == "a.depth3" =>
            {
                self.view = View::List;
                self.list_page = 0;
                Ok(())
            }
            (View::List, Locator::Css(selector)) => match self.page_link_index(selector) {
                Some(index) if index >= 1 && index <= self.pages.len() => {
                    self.list_page = index - 1;
                    Ok(())
                }
                Some(_) => Err(AppError::browser(format!("no element for {locator}"))),
                None if selector.contains("btn_shbox") => Ok(()),
                None => Err(AppError::browser(format!("no element for {locator}"))),
            },
            _ => Err(AppError::browser(format!("no element for {locator}"))),
        }
    }

    async fn hover(&mut self, locator: &Locator, _timeout: Duration) -> Result<()> {
        match (self.view, locator) {
            (View::Home, Locator::CssWithText { selector, .. }) if selector == "a.depth1" => {
                self.menu_open = true;
                Ok(())
            }
            _ => Err(AppError::browser(format!("no element for {locator}"))),
        }
    }

    async fn evaluate(&mut self, script: &PageScript) -> Result<Value> {
        match script {
            PageScript::ListRows {
                selector, limit, ..
            } => {
                if self.view != View::List || selector != LIST_SELECTOR {
                    return Ok(json!([]));
                }
                let rows: Vec<Value> = self
                    .rows()
                    .iter()
                    .take(*limit)
                    .enumerate()
                    .map(|(i, r)| json!({"text": r.text, "href": r.href, "index": i}))
                    .collect();
                Ok(Value::Array(rows))
            }
            PageScript::ClickRowLink { index, .. } => {
                if self.view != View::List || *index >= self.rows().len() {
                    return Ok(json!(false));
                }
                self.open_detail(*index);
                Ok(json!(true))
            }
        }
    }

    async fn go_back(&mut self, _timeout: Duration) -> Result<()> {
        if self.go_back_fails {
            return Err(AppError::browser("history.back() did not navigate"));
        }
        if let View::Detail { .. } = self.view {
            self.view = View::List;
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(match self.view {
            View::Detail { row, broken: false } => self.rows()[row].detail_html.clone(),
            View::Detail { broken: true, .. } => "<html><body>오류</body></html>".to_string(),
            View::List => format!("<html><body>list {}</body></html>", self.list_page + 1),
            View::Home | View::Blank => "<html><body></body></html>".to_string(),
        })
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        if self.screenshot_fails {
            return Err(AppError::browser("screenshot failed"));
        }
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(match self.view {
            View::Detail { row, .. } => self.rows()[row]
                .href
                .clone()
                .unwrap_or_else(|| format!("{}#detail-{row}", self.base_url)),
            View::List => format!("{}#list", self.base_url),
            View::Home => self.base_url.clone(),
            View::Blank => "about:blank".to_string(),
        })
    }

    async fn settle(&mut self, _delay: Duration) {}
}
