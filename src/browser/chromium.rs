// src/browser/chromium.rs

//! Chromium backend over the DevTools protocol.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{Locator, PageDriver, PageScript};
use crate::error::{AppError, Result};

/// Poll interval for selector and locator waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Attribute used to hand a script-resolved element back to the protocol.
const TARGET_ATTR: &str = "data-nuri-target";

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Launch settings.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Pause before every page action; ignored when headless
    pub slow_mo: Duration,
    pub viewport: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            slow_mo: Duration::ZERO,
            viewport: (1400, 900),
        }
    }
}

/// A single Chromium page driven over CDP.
pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    slow_mo: Duration,
}

impl ChromiumPage {
    /// Launch a browser and open one blank page.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        log::info!("Launching browser (headless={})", options.headless);

        let (width, height) = options.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = find_chrome() {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(AppError::browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::browser(format!("launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(AppError::browser)?;

        let slow_mo = if options.headless {
            Duration::ZERO
        } else {
            options.slow_mo
        };

        Ok(Self {
            browser,
            page,
            handler,
            slow_mo,
        })
    }

    /// Close the browser and stop the event handler.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.map_err(AppError::browser)?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn eval_js(&self, source: String) -> Result<Value> {
        let result = self
            .page
            .evaluate(source)
            .await
            .map_err(AppError::browser)?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    async fn count_matches(&self, locator: &Locator) -> Result<usize> {
        let value = self
            .eval_js(format!("({}).length", locator.finder_js()))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    /// Mark the first match of `locator` so it can be fetched by CSS,
    /// waiting up to `timeout` for it to exist.
    async fn mark_target(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let script = format!(
            "(() => {{ \
             document.querySelectorAll('[{attr}]').forEach(e => e.removeAttribute('{attr}')); \
             const el = ({finder})[0]; \
             if (!el) return false; \
             el.setAttribute('{attr}', '1'); \
             el.scrollIntoView({{block: 'center'}}); \
             return true; }})()",
            attr = TARGET_ATTR,
            finder = locator.finder_js()
        );
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.eval_js(script.clone()).await?.as_bool() == Some(true) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::browser(format!(
                    "timed out after {timeout:?} waiting for {locator}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn target(&self) -> Result<chromiumoxide::Element> {
        self.page
            .find_element(format!("[{TARGET_ATTR}='1']"))
            .await
            .map_err(AppError::browser)
    }
}

fn find_chrome() -> Option<PathBuf> {
    CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.pace().await;
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::browser(format!("goto {url}: {e}"))),
            Err(_) => Err(AppError::browser(format!(
                "goto {url}: timed out after {timeout:?}"
            ))),
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let locator = Locator::css(selector);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count_matches(&locator).await? > 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::browser(format!(
                    "timed out after {timeout:?} waiting for '{selector}'"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn count(&mut self, locator: &Locator) -> Result<usize> {
        self.count_matches(locator).await
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.pace().await;
        self.mark_target(locator, timeout).await?;
        self.target()
            .await?
            .click()
            .await
            .map_err(|e| AppError::browser(format!("click {locator}: {e}")))?;
        Ok(())
    }

    async fn hover(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.pace().await;
        self.mark_target(locator, timeout).await?;
        self.target()
            .await?
            .hover()
            .await
            .map_err(|e| AppError::browser(format!("hover {locator}: {e}")))?;
        Ok(())
    }

    async fn evaluate(&mut self, script: &PageScript) -> Result<Value> {
        self.pace().await;
        self.eval_js(script.source()).await
    }

    async fn go_back(&mut self, timeout: Duration) -> Result<()> {
        self.pace().await;
        self.eval_js("history.back(); true".to_string()).await?;
        // Grid views swap content without a navigation event.
        if tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            log::debug!("No navigation event after history.back()");
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page.content().await.map_err(AppError::browser)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .screenshot(params)
            .await
            .map_err(AppError::browser)
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.page.url().await.map_err(AppError::browser)?;
        Ok(url.map(|u| u.to_string()).unwrap_or_default())
    }

    async fn settle(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
