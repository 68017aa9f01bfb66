//! Flipkart specific scraper implementation

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::review_texts;
use crate::browser::{BrowserSession, NextControl};
use crate::error::{BrowserError, ExtractError};
use crate::models::Source;
use crate::traits::{ScraperConfig, SiteSelectors, WebsiteScraper};

const PRODUCT_WAIT: Duration = Duration::from_secs(10);

/// Scraper implementation for Flipkart
#[derive(Debug, Clone)]
pub struct FlipkartScraper {
    config: ScraperConfig,
}

impl FlipkartScraper {
    /// Create a new Flipkart scraper with default configuration
    pub fn new() -> Self {
        let config = ScraperConfig {
            source: Source::Flipkart,
            search_url_pattern: "https://www.flipkart.com/search?q={query}".to_string(),
            selectors: SiteSelectors {
                product_links: vec![
                    "a._1fQZEK".to_string(),
                    "a.s1Q9rs".to_string(),
                    "a.IRpwTa".to_string(),
                ],
                product_links_fallback: vec!["a._2rpwqI".to_string()],
                modal_close: Some("button._2KpZ6l._2doB4z".to_string()),
                // Reviews render inline on the product page
                all_reviews_text: None,
                review_text: vec![
                    "div.t-ZTKy".to_string(),
                    "div._6K-7Co".to_string(),
                    "div._16HD7q".to_string(),
                ],
                next_page: NextControl {
                    selector: "a._1LKTO3".to_string(),
                    required_text: Some("Next".to_string()),
                    require_visible: false,
                },
            },
        };

        Self { config }
    }
}

impl Default for FlipkartScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebsiteScraper for FlipkartScraper {
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
                site: Source::Flipkart,
                reason: e.to_string(),
            })?;

        // The login modal shows up on some visits and covers the results
        if let Some(close) = &self.config.selectors.modal_close {
            match session.click_first(std::slice::from_ref(close), Duration::ZERO).await {
                Ok(true) => debug!("dismissed flipkart login modal"),
                Ok(false) => {}
                Err(e) => debug!("login modal check failed: {}", e),
            }
        }

        Ok(())
    }

    async fn select_product(&self, session: &mut dyn BrowserSession) -> Result<(), ExtractError> {
        let selectors = &self.config.selectors;

        if session
            .click_first(&selectors.product_links, PRODUCT_WAIT)
            .await?
        {
            return Ok(());
        }

        if session
            .click_first(&selectors.product_links_fallback, Duration::ZERO)
            .await?
        {
            return Ok(());
        }

        Err(ExtractError::NoProduct {
            site: Source::Flipkart,
        })
    }

    async fn open_reviews(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError> {
        match &self.config.selectors.all_reviews_text {
            Some(text) => session.click_link_text(text, Duration::ZERO).await,
            None => Ok(false),
        }
    }

    async fn collect_page(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<Vec<String>, BrowserError> {
        // Reviews are lazy-loaded once the middle of the page is in view
        session.scroll_to(0.5).await?;
        let html = session.html().await?;
        Ok(review_texts(&html, &self.config.selectors.review_text))
    }

    async fn next_page(&self, session: &mut dyn BrowserSession) -> Result<bool, BrowserError> {
        session.click_next(&self.config.selectors.next_page).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::browser::fake::{FakeLauncher, FakeSite};
    use crate::scrapers::{BrowserScraper, ExtractTiming};
    use crate::traits::ReviewSource;

    #[test]
    fn search_url_uses_q_parameter() {
        assert_eq!(
            FlipkartScraper::new().build_search_url("redmi note 12"),
            "https://www.flipkart.com/search?q=redmi+note+12"
        );
    }

    #[test]
    fn extracts_review_blocks() {
        let html = r#"
            <div class="col"><div class="t-ZTKy"><div><div>Value for money</div></div></div></div>
            <div class="_6K-7Co">Heats up while gaming</div>
        "#;
        let texts = review_texts(html, &FlipkartScraper::new().config.selectors.review_text);
        assert_eq!(texts, vec!["Value for money", "Heats up while gaming"]);
    }

    #[tokio::test]
    async fn scrolls_before_each_scan_and_reads_inline_reviews() {
        let pages = [
            r#"<div class="t-ZTKy">Good display</div>"#,
            r#"<div class="t-ZTKy">Poor speaker</div>"#,
        ];
        let site = FakeSite {
            product_selectors: vec!["a.s1Q9rs".to_string()],
            opens_new_context: false,
            ..FakeSite::with_pages(&pages)
        };
        let launcher = Arc::new(FakeLauncher::new(site));
        let scraper = BrowserScraper::new(
            FlipkartScraper::new(),
            launcher.clone(),
            ExtractTiming {
                overall: Duration::from_secs(5),
                page_settle: Duration::ZERO,
            },
        );

        let reviews = scraper.extract("phone", 10).await;

        assert_eq!(reviews, vec!["Good display", "Poor speaker"]);
        let calls = launcher.recorder.calls();
        assert_eq!(calls.iter().filter(|c| *c == "scroll").count(), 2);
        assert!(!calls.iter().any(|c| c.starts_with("link")));
        assert_eq!(launcher.recorder.closed(), 1);
    }
}
