//! Traits and interfaces for site-agnostic review extraction

use async_trait::async_trait;

use crate::browser::{BrowserSession, NextControl};
use crate::error::{BrowserError, ExtractError};
use crate::models::Source;

/// Configuration for a retail site scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Which source this site is
    pub source: Source,
    /// Search URL pattern with {query} placeholder
    pub search_url_pattern: String,
    /// CSS selectors for each navigation step
    pub selectors: SiteSelectors,
}

/// Ordered selector fallbacks for the navigation steps of one site.
///
/// Every list is tried front to back; the first match wins.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Product links on the search results page, waited for
    pub product_links: Vec<String>,
    /// Product links tried once when none of `product_links` showed up
    pub product_links_fallback: Vec<String>,
    /// Overlay dismissed right after search, if the site shows one
    pub modal_close: Option<String>,
    /// Link text of the "see all reviews" affordance
    pub all_reviews_text: Option<String>,
    /// Elements holding a single review's text
    pub review_text: Vec<String>,
    /// Pagination control of the review list
    pub next_page: NextControl,
}

/// Step-wise capability a retail site exposes to the extraction state machine.
///
/// Each site implements the steps standalone; the order they run in and the
/// handling of their failures live in [`crate::scrapers::BrowserScraper`].
#[async_trait]
pub trait WebsiteScraper: Send + Sync {
    /// Get the configuration for this scraper
    fn config(&self) -> &ScraperConfig;

    /// Open the site's search results for a product.
    async fn search(
        &self,
        session: &mut dyn BrowserSession,
        product_name: &str,
    ) -> Result<(), ExtractError>;

    /// Click the first matching product result.
    async fn select_product(&self, session: &mut dyn BrowserSession) -> Result<(), ExtractError>;

    /// Try to reach the full review list. `Ok(false)` means reviews are read
    /// from the product page itself.
    async fn open_reviews(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError>;

    /// Review texts visible on the current page, in document order.
    async fn collect_page(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<Vec<String>, BrowserError>;

    /// Advance to the next page of reviews. `Ok(false)` ends pagination.
    async fn next_page(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError>;

    /// Process a product name to create the search URL
    ///
    /// Whitespace-separated words are encoded and joined with `+`.
    fn build_search_url(&self, product_name: &str) -> String {
        let query = product_name
            .split_whitespace()
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+");
        self.config().search_url_pattern.replace("{query}", &query)
    }
}

/// Anything that can produce raw review texts for a product.
///
/// Implementations never fail: on any internal problem they return whatever
/// they collected so far, possibly nothing. The result never exceeds `limit`.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    fn source(&self) -> Source;

    async fn extract(&self, product_name: &str, limit: usize) -> Vec<String>;
}
