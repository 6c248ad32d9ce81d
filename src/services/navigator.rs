// src/services/navigator.rs

//! Landing page to bid list navigation.

use crate::browser::{Locator, PageDriver, Role};
use crate::error::{AppError, Result};
use crate::models::{CrawlConfig, MegaMenu};
use crate::services::probe::first_ready;
use crate::services::timing;
use crate::utils::retry::RetryPolicy;

/// Brings a page to the bid list and back to it after detours.
pub struct Navigator<'a> {
    config: &'a CrawlConfig,
    retry: RetryPolicy,
}

impl<'a> Navigator<'a> {
    pub fn new(config: &'a CrawlConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load the portal, walk the menu, run the search and wait for the grid.
    ///
    /// Returns the readiness selector that matched. A missing menu config
    /// fails at once; everything else is retried with backoff.
    pub async fn navigate(&self, driver: &mut dyn PageDriver) -> Result<String> {
        let menu = self.config.mega_menu()?;
        let mut attempt = 1;
        loop {
            match self.navigate_once(driver, menu).await {
                Ok(selector) => {
                    log::info!("Bid list ready (selector={})", selector);
                    return Ok(selector);
                }
                Err(e) => {
                    if !self.retry.backoff("Navigate to bid list", attempt, &e).await {
                        return Err(AppError::navigation(format!(
                            "bid list unreachable after {attempt} attempts: {e}"
                        )));
                    }
                }
            }
            attempt += 1;
        }
    }

    /// Short readiness probe; falls back to a full navigation.
    ///
    /// Returns `true` when the list was reloaded from the portal, which
    /// leaves the grid on its first page.
    pub async fn recover(&self, driver: &mut dyn PageDriver) -> Result<bool> {
        let ready = first_ready(
            driver,
            &self.config.navigation.bid_list_ready_selectors,
            timing::RECOVER_PROBE,
        )
        .await;
        if ready.is_some() {
            return Ok(false);
        }
        log::info!("Bid list not visible, navigating again");
        self.navigate(driver).await?;
        Ok(true)
    }

    async fn navigate_once(&self, driver: &mut dyn PageDriver, menu: &MegaMenu) -> Result<String> {
        driver.goto(&self.config.base_url, timing::GOTO).await?;
        driver.settle(timing::AFTER_GOTO).await;

        self.open_menu(driver, menu).await?;
        self.click_search(driver).await?;

        let candidates = &self.config.navigation.bid_list_ready_selectors;
        first_ready(driver, candidates, timing::LIST_READY)
            .await
            .ok_or_else(|| {
                AppError::navigation(format!("no bid list selector appeared: {candidates:?}"))
            })
    }

    /// Hover the top entry so the submenu renders, then click the sub entry.
    async fn open_menu(&self, driver: &mut dyn PageDriver, menu: &MegaMenu) -> Result<()> {
        let top = Locator::css_with_text(&menu.depth1_selector, &menu.hover_text);
        driver.hover(&top, timing::MENU_VISIBLE).await?;
        driver.settle(timing::AFTER_HOVER).await;

        let sub = Locator::css_with_text(&menu.depth3_selector, &menu.click_text);
        driver.click(&sub, timing::MENU_CLICK).await
    }

    async fn click_search(&self, driver: &mut dyn PageDriver) -> Result<()> {
        let nav = &self.config.navigation;
        let text = nav.search_button_text.as_deref().filter(|t| !t.is_empty());
        let selector = nav.search_button_selector.as_deref().filter(|s| !s.is_empty());
        if text.is_none() && selector.is_none() {
            return Ok(());
        }

        driver.settle(timing::BEFORE_SEARCH).await;
        match (selector, text) {
            (Some(selector), text) => {
                if let Err(e) = driver.click(&Locator::css(selector), timing::CLICK).await {
                    match text {
                        Some(text) => click_by_text(driver, text).await?,
                        None => log::warn!("Search button '{}' not clicked: {}", selector, e),
                    }
                }
            }
            (None, Some(text)) => {
                let boxed = Locator::css(format!(r#"div.btn_shbox input[value="{text}"]"#));
                if driver.click(&boxed, timing::CLICK).await.is_err() {
                    click_by_text(driver, text).await?;
                }
            }
            (None, None) => {}
        }
        driver.settle(timing::AFTER_SEARCH).await;
        Ok(())
    }
}

/// Click a link or button by accessible name, then any element by text.
pub async fn click_by_text(driver: &mut dyn PageDriver, text: &str) -> Result<()> {
    let strategies = [
        Locator::role(Role::Link, text),
        Locator::role(Role::Button, text),
        Locator::text(text, false),
    ];
    let mut last_error = None;
    for locator in &strategies {
        match driver.click(locator, timing::CLICK).await {
            Ok(()) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }
    Err(AppError::navigation(format!(
        "failed clicking by text '{text}': {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
