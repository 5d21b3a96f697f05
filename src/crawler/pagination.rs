//! Pagination resolution
//!
//! Given a processed page and a snapshot of the crawl state, decides which
//! page (if any) comes next. The resolver performs no I/O and mutates nothing;
//! the controller is responsible for enqueuing what it returns.

use crate::config::ExtractionConfig;
use crate::extract::parse_selector;
use crate::listing::{PageRequest, RawPage};
use crate::state::CrawlSnapshot;
use crate::url::{query_param, resolve_link, set_query_param};
use crate::ConfigError;
use scraper::{Html, Selector};
use url::Url;

/// Resolves the request that follows a page
#[derive(Debug, Clone)]
pub struct Paginator {
    next_link: Selector,
    page_param: String,
}

impl Paginator {
    pub fn new(next_page_selector: &str, page_param: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            next_link: parse_selector(next_page_selector)?,
            page_param: page_param.into(),
        })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Self::new(&config.next_page_selector, config.page_param.clone())
    }

    /// Proposes the next request, or None if the crawl should not continue
    ///
    /// In order:
    /// 1. Nothing once the results budget is met or the page cap is reached
    /// 2. The page's explicit "next" link, if present
    /// 3. The current URL with the page parameter incremented
    ///
    /// An unparseable current URL or a non-numeric page parameter ends the chain.
    pub fn next_request(
        &self,
        page: &RawPage,
        current: &PageRequest,
        snapshot: &CrawlSnapshot,
    ) -> Option<PageRequest> {
        if snapshot.budget_met() {
            tracing::debug!(
                "Results budget met ({}/{}), not paginating",
                snapshot.saved_count,
                snapshot.goal.results_wanted
            );
            return None;
        }
        if snapshot.page_cap_reached() {
            tracing::debug!(
                "Page cap reached ({}/{}), not paginating",
                snapshot.pages_visited,
                snapshot.goal.max_pages
            );
            return None;
        }

        if let Some(url) = self.explicit_next(page, current) {
            tracing::debug!("Following next link to {}", url);
            return Some(current.next(url));
        }

        self.incremented(current).map(|url| current.next(url))
    }

    /// Absolute target of the page's "next" link, if it leads somewhere new
    fn explicit_next(&self, page: &RawPage, current: &PageRequest) -> Option<String> {
        let base = Url::parse(&page.source_url)
            .or_else(|_| Url::parse(&current.url))
            .ok()?;

        let document = Html::parse_document(&page.content);
        let href = document
            .select(&self.next_link)
            .find_map(|a| a.value().attr("href"))?;

        resolve_link(href, &base).filter(|url| *url != current.url)
    }

    /// The current URL with the page parameter set to the following page
    fn incremented(&self, current: &PageRequest) -> Option<String> {
        let mut url = match Url::parse(&current.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot paginate from unparseable URL {}: {}", current.url, e);
                return None;
            }
        };

        let page_number = match query_param(&url, &self.page_param) {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(
                        "Page parameter '{}' on {} is not numeric ({:?})",
                        self.page_param,
                        current.url,
                        value
                    );
                    return None;
                }
            },
            None => current.page_number,
        };

        let Some(next) = page_number.checked_add(1) else {
            tracing::warn!("Page parameter on {} is already at its maximum", current.url);
            return None;
        };
        set_query_param(&mut url, &self.page_param, &next.to_string());
        Some(url.to_string())
    }
}
