//! Browser-driven review extraction.
//!
//! [`BrowserScraper`] runs the navigation state machine shared by every site:
//! search, select product, switch context, open reviews, then collect and
//! paginate until the limit is reached. Terminal step failures end the run
//! early; everything collected up to that point is still returned.

pub mod amazon;
pub mod flipkart;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, SessionLauncher};
use crate::config::Config;
use crate::error::ExtractError;
use crate::models::Source;
use crate::traits::{ReviewSource, WebsiteScraper};

pub use amazon::AmazonScraper;
pub use flipkart::FlipkartScraper;

/// Safety limit to prevent endless pagination
const MAX_PAGES: usize = 50;

const NEW_CONTEXT_WAIT: Duration = Duration::from_secs(8);

/// Time bounds for one extraction run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractTiming {
    /// Bound on the whole browser session, navigation included.
    pub overall: Duration,
    /// Pause before each page scan.
    pub page_settle: Duration,
}

impl ExtractTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            overall: config.extract_timeout,
            page_settle: config.page_settle,
        }
    }
}

/// A [`ReviewSource`] backed by a site scraper and a fresh browser per call.
pub struct BrowserScraper<S> {
    site: S,
    launcher: Arc<dyn SessionLauncher>,
    timing: ExtractTiming,
}

impl<S: WebsiteScraper> BrowserScraper<S> {
    pub fn new(site: S, launcher: Arc<dyn SessionLauncher>, timing: ExtractTiming) -> Self {
        Self {
            site,
            launcher,
            timing,
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        product_name: &str,
        limit: usize,
        collected: &mut Vec<String>,
    ) -> Result<(), ExtractError> {
        let source = self.site.config().source;

        self.site.search(session, product_name).await?;
        self.site.select_product(session).await?;

        match session.focus_newest_context(NEW_CONTEXT_WAIT).await {
            Ok(true) => debug!(%source, "product opened in a new tab"),
            Ok(false) => debug!(%source, "product opened in place"),
            Err(e) => debug!(%source, "could not inspect open tabs: {}", e),
        }

        match self.site.open_reviews(session).await {
            Ok(true) => debug!(%source, "opened full review list"),
            Ok(false) => debug!(%source, "reading reviews from the product page"),
            Err(e) => debug!(%source, "review link unusable, staying on page: {}", e),
        }

        let mut page = 1;
        while collected.len() < limit {
            tokio::time::sleep(self.timing.page_settle).await;

            let texts = self.site.collect_page(session).await?;
            let added = merge_unique(collected, texts, limit);
            debug!(%source, page, added, total = collected.len(), "scanned review page");

            if collected.len() >= limit {
                break;
            }
            if page >= MAX_PAGES {
                info!(%source, "reached page limit ({}), stopping", MAX_PAGES);
                break;
            }

            // A control that is present but not clickable ends pagination.
            match self.site.next_page(session).await {
                Ok(true) => page += 1,
                Ok(false) => break,
                Err(e) => {
                    debug!(%source, "next page unavailable: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<S: WebsiteScraper> ReviewSource for BrowserScraper<S> {
    fn source(&self) -> Source {
        self.site.config().source
    }

    async fn extract(&self, product_name: &str, limit: usize) -> Vec<String> {
        let source = self.source();
        info!(%source, product = product_name, limit, "extracting reviews");

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!(%source, product = product_name, "browser unavailable: {}", e);
                return Vec::new();
            }
        };

        let mut collected = Vec::new();
        let outcome = tokio::time::timeout(
            self.timing.overall,
            self.drive(session.as_mut(), product_name, limit, &mut collected),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%source, product = product_name, "extraction stopped: {}", e),
            Err(_) => {
                let e = ExtractError::Timeout {
                    site: source,
                    seconds: self.timing.overall.as_secs(),
                };
                warn!(%source, product = product_name, "{}", e);
            }
        }

        if let Err(e) = session.close().await {
            warn!(%source, "failed to close browser session: {}", e);
        }

        collected.truncate(limit);
        info!(%source, product = product_name, "collected {} reviews", collected.len());
        collected
    }
}

/// Appends texts not seen before, stopping at `limit`. Returns how many were added.
fn merge_unique(collected: &mut Vec<String>, texts: Vec<String>, limit: usize) -> usize {
    let mut added = 0;
    for text in texts {
        if collected.len() >= limit {
            break;
        }
        let text = text.trim();
        if !text.is_empty() && !collected.iter().any(|seen| seen == text) {
            collected.push(text.to_string());
            added += 1;
        }
    }
    added
}

/// Extracts review texts from a page, trying selectors in order.
///
/// Text nodes inside one review are joined and runs of whitespace collapsed,
/// so the same review renders to the same string on every visit.
pub fn review_texts(html: &str, selectors: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut texts = Vec::new();

    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("invalid review selector {}: {:?}", raw, e);
                continue;
            }
        };

        for element in document.select(&selector) {
            let text = element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                texts.push(text);
            }
        }
    }

    texts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeLauncher, FakeSite};

    fn page(reviews: &[&str]) -> String {
        let body: String = reviews
            .iter()
            .map(|r| format!(r#"<div class="review"><span data-hook="review-body"><span>{r}</span></span></div>"#))
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    fn amazon_site(pages: &[String]) -> FakeSite {
        let pages: Vec<&str> = pages.iter().map(String::as_str).collect();
        FakeSite {
            product_selectors: vec!["a.a-link-normal.s-no-outline".to_string()],
            ..FakeSite::with_pages(&pages)
        }
    }

    fn scraper(launcher: Arc<FakeLauncher>) -> BrowserScraper<AmazonScraper> {
        BrowserScraper::new(
            AmazonScraper::new(),
            launcher,
            ExtractTiming {
                overall: Duration::from_secs(5),
                page_settle: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn collects_across_pages_without_duplicates() {
        let site = amazon_site(&[page(&["great", "bad"]), page(&["bad", "okay"])]);
        let launcher = Arc::new(FakeLauncher::new(site));
        let scraper = scraper(launcher.clone());

        let reviews = scraper.extract("poco x3", 10).await;

        assert_eq!(reviews, vec!["great", "bad", "okay"]);
        assert_eq!(launcher.recorder.launched(), 1);
        assert_eq!(launcher.recorder.closed(), 1);
        assert!(launcher.recorder.calls().contains(&"goto https://www.amazon.in/s?k=poco+x3".to_string()));
    }

    #[tokio::test]
    async fn never_returns_more_than_limit() {
        let site = amazon_site(&[page(&["a", "b", "c", "d"]), page(&["e"])]);
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 3).await;

        assert_eq!(reviews, vec!["a", "b", "c"]);
        assert!(!launcher.recorder.calls().iter().any(|c| c.starts_with("next")));
    }

    #[tokio::test]
    async fn unreachable_search_yields_nothing_and_releases_browser() {
        let site = FakeSite {
            search_reachable: false,
            ..amazon_site(&[page(&["great"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert!(reviews.is_empty());
        assert_eq!(launcher.recorder.closed(), 1);
    }

    #[tokio::test]
    async fn missing_product_yields_nothing() {
        let site = FakeSite {
            product_selectors: vec!["a.unrelated".to_string()],
            ..amazon_site(&[page(&["great"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert!(reviews.is_empty());
        assert_eq!(launcher.recorder.closed(), 1);
    }

    #[tokio::test]
    async fn fallback_product_selector_is_tried() {
        let site = FakeSite {
            product_selectors: vec!["h2 a.a-link-normal".to_string()],
            ..amazon_site(&[page(&["great"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert_eq!(reviews, vec!["great"]);
        assert!(launcher.recorder.calls().contains(&"click h2 a.a-link-normal".to_string()));
    }

    #[tokio::test]
    async fn reads_product_page_when_review_link_and_new_tab_are_absent() {
        let site = FakeSite {
            has_reviews_link: false,
            opens_new_context: false,
            ..amazon_site(&[page(&["solid build"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher).extract("phone", 5).await;

        assert_eq!(reviews, vec!["solid build"]);
    }

    #[tokio::test]
    async fn follows_the_product_tab_past_an_unrelated_one() {
        let site = FakeSite {
            stray_context: true,
            ..amazon_site(&[page(&["from the product tab"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert_eq!(reviews, vec!["from the product tab"]);
        assert!(launcher.recorder.calls().contains(&"focus new context".to_string()));
    }

    #[tokio::test]
    async fn stays_on_the_page_when_the_product_opens_in_place() {
        let site = FakeSite {
            stray_context: true,
            opens_new_context: false,
            ..amazon_site(&[page(&["same tab"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert_eq!(reviews, vec!["same tab"]);
        assert!(!launcher.recorder.calls().contains(&"focus new context".to_string()));
    }

    #[tokio::test]
    async fn blocked_next_control_ends_pagination_quietly() {
        let site = FakeSite {
            next_blocked: true,
            ..amazon_site(&[page(&["first"]), page(&["second"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));

        let reviews = scraper(launcher.clone()).extract("phone", 5).await;

        assert_eq!(reviews, vec!["first"]);
        assert_eq!(launcher.recorder.closed(), 1);
    }

    #[tokio::test]
    async fn stuck_session_is_bounded_and_released() {
        let site = FakeSite {
            hang_on_read: true,
            ..amazon_site(&[page(&["never read"])])
        };
        let launcher = Arc::new(FakeLauncher::new(site));
        let scraper = BrowserScraper::new(
            AmazonScraper::new(),
            launcher.clone(),
            ExtractTiming {
                overall: Duration::from_millis(50),
                page_settle: Duration::ZERO,
            },
        );

        let reviews = scraper.extract("phone", 5).await;

        assert!(reviews.is_empty());
        assert_eq!(launcher.recorder.closed(), 1);
    }

    #[tokio::test]
    async fn launch_failure_yields_nothing() {
        let mut launcher = FakeLauncher::new(amazon_site(&[page(&["great"])]));
        launcher.fail_launch = true;

        let reviews = scraper(Arc::new(launcher)).extract("phone", 5).await;

        assert!(reviews.is_empty());
    }

    #[test]
    fn review_texts_collapses_whitespace_and_skips_empty() {
        let html = r#"<div class="r">  Great
            <b>battery</b><br>life </div><div class="r">   </div>"#;
        let texts = review_texts(html, &["div.r".to_string()]);
        assert_eq!(texts, vec!["Great battery life"]);
    }

    #[test]
    fn invalid_selector_is_skipped() {
        let html = r#"<p class="ok">fine</p>"#;
        let texts = review_texts(html, &["p[".to_string(), "p.ok".to_string()]);
        assert_eq!(texts, vec!["fine"]);
    }
}
