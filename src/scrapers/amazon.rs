//! Amazon.in specific scraper implementation

use std::time::Duration;

use async_trait::async_trait;

use super::review_texts;
use crate::browser::{BrowserSession, NextControl};
use crate::error::{BrowserError, ExtractError};
use crate::models::Source;
use crate::traits::{ScraperConfig, SiteSelectors, WebsiteScraper};

const PRODUCT_WAIT: Duration = Duration::from_secs(10);
const REVIEWS_LINK_WAIT: Duration = Duration::from_secs(6);

/// Scraper implementation for Amazon.in
#[derive(Debug, Clone)]
pub struct AmazonScraper {
    config: ScraperConfig,
}

impl AmazonScraper {
    /// Create a new Amazon scraper with default configuration
    pub fn new() -> Self {
        let config = ScraperConfig {
            source: Source::Amazon,
            search_url_pattern: "https://www.amazon.in/s?k={query}".to_string(),
            selectors: SiteSelectors {
                product_links: vec![
                    "a.a-link-normal.s-no-outline".to_string(),
                    "a.a-link-normal.s-link-style".to_string(),
                ],
                product_links_fallback: vec!["h2 a.a-link-normal".to_string()],
                modal_close: None,
                all_reviews_text: Some("See all reviews".to_string()),
                review_text: vec![
                    "span[data-hook='review-body']".to_string(),
                    "div.review-text-content span".to_string(),
                ],
                next_page: NextControl {
                    selector: "li.a-last a".to_string(),
                    required_text: None,
                    require_visible: true,
                },
            },
        };

        Self { config }
    }
}

impl Default for AmazonScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebsiteScraper for AmazonScraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    async fn search(
        &self,
        session: &mut dyn BrowserSession,
        product_name: &str,
    ) -> Result<(), ExtractError> {
        let url = self.build_search_url(product_name);
        session
            .goto(&url)
            .await
            .map_err(|e| ExtractError::Search {
                site: Source::Amazon,
                reason: e.to_string(),
            })
    }

    async fn select_product(&self, session: &mut dyn BrowserSession) -> Result<(), ExtractError> {
        let selectors = &self.config.selectors;

        if session
            .click_first(&selectors.product_links, PRODUCT_WAIT)
            .await?
        {
            return Ok(());
        }

        // Older result layouts only carry the link inside the title heading
        if session
            .click_first(&selectors.product_links_fallback, Duration::ZERO)
            .await?
        {
            return Ok(());
        }

        Err(ExtractError::NoProduct {
            site: Source::Amazon,
        })
    }

    async fn open_reviews(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError> {
        match &self.config.selectors.all_reviews_text {
            Some(text) => session.click_link_text(text, REVIEWS_LINK_WAIT).await,
            None => Ok(false),
        }
    }

    async fn collect_page(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<Vec<String>, BrowserError> {
        let html = session.html().await?;
        Ok(review_texts(&html, &self.config.selectors.review_text))
    }

    async fn next_page(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError> {
        session.click_next(&self.config.selectors.next_page).await
    }
}
