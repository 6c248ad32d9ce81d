// src/services/pagination.rs

//! Moving the bid list to its next page.

use crate::browser::{Locator, PageDriver, Role};
use crate::error::{AppError, Result};
use crate::models::CrawlConfig;
use crate::services::navigator::Navigator;
use crate::services::timing;

/// Outcome of a page turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTurn {
    /// The list moved; `via` names the control that was clicked
    Advanced { via: String },
    /// No control led anywhere; the list is exhausted
    EndOfList,
}

/// Link to list page `page` in the grid's numbered pager.
pub fn page_link_selector(page: u32) -> String {
    format!("a[id*='pagelist_page_'][index='{page}']")
}

pub struct Paginator<'a> {
    config: &'a CrawlConfig,
    navigator: &'a Navigator<'a>,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a CrawlConfig, navigator: &'a Navigator<'a>) -> Self {
        Self { config, navigator }
    }

    /// Controls tried in order: the numbered link for the next page, the
    /// configured CSS selectors, then each configured name as a button, a
    /// link and exact text.
    fn strategies(&self, next_page: u32) -> Vec<Locator> {
        let list = &self.config.list;
        let mut strategies = vec![Locator::css(page_link_selector(next_page))];
        strategies.extend(list.next_button_selector_candidates.iter().map(Locator::css));
        for name in &list.next_button_name_candidates {
            strategies.push(Locator::role(Role::Button, name));
            strategies.push(Locator::role(Role::Link, name));
            strategies.push(Locator::text(name, true));
        }
        strategies
    }

    /// Turn from `current_page` to the next one.
    pub async fn advance(
        &self,
        driver: &mut dyn PageDriver,
        current_page: u32,
    ) -> Result<PageTurn> {
        driver.settle(timing::BEFORE_PAGINATE).await;

        let next_page = current_page + 1;
        for locator in self.strategies(next_page) {
            let Some(reloaded) = self.try_click(driver, &locator).await? else {
                continue;
            };
            if reloaded {
                self.restore(driver, next_page).await?;
            }
            log::info!("Moved to page {} via {}", next_page, locator);
            return Ok(PageTurn::Advanced {
                via: locator.to_string(),
            });
        }
        log::info!("No next page after page {}", current_page);
        Ok(PageTurn::EndOfList)
    }

    /// Jump straight to `page` through the numbered pager, if it is shown.
    pub async fn seek(&self, driver: &mut dyn PageDriver, page: u32) -> Result<bool> {
        let locator = Locator::css(page_link_selector(page));
        Ok(self.try_click(driver, &locator).await? == Some(false))
    }

    /// Bring a grid that was reloaded onto page 1 back to `page`.
    pub async fn restore(&self, driver: &mut dyn PageDriver, page: u32) -> Result<()> {
        if page > 1 && !self.seek(driver, page).await? {
            log::warn!(
                "List reloaded and page {} is not linked; rows now come from page 1",
                page
            );
        }
        Ok(())
    }

    /// Click `locator` if present and wait for the list to come back.
    ///
    /// `None` when the control is missing or unclickable, otherwise whether
    /// the list had to be reloaded from the portal afterwards.
    async fn try_click(
        &self,
        driver: &mut dyn PageDriver,
        locator: &Locator,
    ) -> Result<Option<bool>> {
        match driver.count(locator).await {
            Ok(n) if n > 0 => {}
            Ok(_) => return Ok(None),
            Err(e) => {
                log::debug!("Count failed for {}: {}", locator, e);
                return Ok(None);
            }
        }
        if let Err(e) = driver.click(locator, timing::CLICK).await {
            log::debug!("Click failed for {}: {}", locator, e);
            return Ok(None);
        }
        let reloaded = self
            .navigator
            .recover(driver)
            .await
            .map_err(|e| AppError::recovery(format!("list lost after paging: {e}")))?;
        Ok(Some(reloaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{LIST_SELECTOR, MockPage, MockRow};
    use crate::models::MegaMenu;

    const BASE: &str = "https://nuri.example/";

    fn config() -> CrawlConfig {
        let mut config = CrawlConfig::default();
        config.base_url = BASE.to_string();
        config.navigation.bid_list_ready_selectors = vec![LIST_SELECTOR.to_string()];
        config.navigation.mega_menu = Some(MegaMenu {
            depth1_selector: "a.depth1".to_string(),
            depth3_selector: "a.depth3".to_string(),
            hover_text: "입찰공고".to_string(),
            click_text: "입찰공고목록".to_string(),
        });
        config.list.next_button_selector_candidates = vec![".w2pageList_control_next".to_string()];
        config
    }

    fn two_pages() -> MockPage {
        MockPage::new(
            BASE,
            vec![
                vec![MockRow::new("공고1\t기관1", None)],
                vec![MockRow::new("공고2\t기관2", None)],
            ],
        )
    }

    #[test]
    fn test_strategy_order() {
        let config = config();
        let navigator = Navigator::new(&config);
        let strategies = Paginator::new(&config, &navigator).strategies(3);

        assert_eq!(strategies[0], Locator::css("a[id*='pagelist_page_'][index='3']"));
        assert_eq!(strategies[1], Locator::css(".w2pageList_control_next"));
        assert_eq!(strategies[2], Locator::role(Role::Button, "다음"));
        assert_eq!(strategies[3], Locator::role(Role::Link, "다음"));
        assert_eq!(strategies[4], Locator::text("다음", true));
        assert_eq!(strategies.len(), 2 + 3 * 2);
    }

    #[tokio::test]
    async fn test_advance_then_end_of_list() {
        let config = config();
        let navigator = Navigator::new(&config);
        let paginator = Paginator::new(&config, &navigator);
        let mut page = two_pages();
        navigator.navigate(&mut page).await.unwrap();

        let turn = paginator.advance(&mut page, 1).await.unwrap();
        assert!(matches!(turn, PageTurn::Advanced { .. }));
        assert_eq!(paginator.advance(&mut page, 2).await.unwrap(), PageTurn::EndOfList);
        assert_eq!(page.home_visits, 1);
    }

    #[tokio::test]
    async fn test_seek_to_page() {
        let config = config();
        let navigator = Navigator::new(&config);
        let paginator = Paginator::new(&config, &navigator);
        let mut page = two_pages();
        navigator.navigate(&mut page).await.unwrap();

        assert!(paginator.seek(&mut page, 2).await.unwrap());
        assert!(!paginator.seek(&mut page, 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_advance_through_fallback_controls() {
        let config = config();
        let navigator = Navigator::new(&config);
        let paginator = Paginator::new(&config, &navigator);
        let controls = [
            Locator::css(".w2pageList_control_next"),
            Locator::role(Role::Button, "다음"),
            Locator::role(Role::Link, ">"),
            Locator::text("다음", true),
        ];

        for control in controls {
            let mut page = two_pages();
            page.page_links = false;
            page.next_control = Some(control.clone());
            navigator.navigate(&mut page).await.unwrap();

            let turn = paginator.advance(&mut page, 1).await.unwrap();
            assert_eq!(
                turn,
                PageTurn::Advanced {
                    via: control.to_string()
                }
            );
            assert_eq!(paginator.advance(&mut page, 2).await.unwrap(), PageTurn::EndOfList);
            assert_eq!(page.home_visits, 1);
        }
    }

    #[tokio::test]
    async fn test_seek_without_pager_reports_miss() {
        let config = config();
        let navigator = Navigator::new(&config);
        let paginator = Paginator::new(&config, &navigator);
        let mut page = two_pages();
        page.page_links = false;
        navigator.navigate(&mut page).await.unwrap();

        assert!(!paginator.seek(&mut page, 2).await.unwrap());
        paginator.restore(&mut page, 2).await.unwrap();
        assert_eq!(page.home_visits, 1);
    }
}
