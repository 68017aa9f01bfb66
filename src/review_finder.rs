use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::browser::{ChromiumLauncher, SessionLauncher};
use crate::config::Config;
use crate::database::CacheStore;
use crate::models::{ProductKey, ReviewReport, ScoredReview, Source, SourceSelector};
use crate::scrapers::{AmazonScraper, BrowserScraper, ExtractTiming, FlipkartScraper};
use crate::sentiment::{LexiconClassifier, SentimentClassifier};
use crate::summary::summarize;
use crate::traits::ReviewSource;

/// Decides per source whether cached reviews are fresh enough or a new
/// extraction is needed, then merges the per-source lists.
#[derive(Clone)]
pub struct ReviewFinder {
    sources: Vec<Arc<dyn ReviewSource>>,
    cache: Arc<dyn CacheStore>,
    classifier: Arc<dyn SentimentClassifier>,
    ttl: Duration,
    limit: usize,
}

impl ReviewFinder {
    /// A finder with no sources, the built-in classifier, a 12 hour TTL and
    /// a limit of 25 reviews per source.
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        let defaults = Config::default();
        Self {
            sources: Vec::new(),
            cache,
            classifier: Arc::new(LexiconClassifier::new()),
            ttl: defaults.cache_ttl,
            limit: defaults.review_limit,
        }
    }

    /// The production wiring: Amazon and Flipkart scrapers on Chromium.
    pub fn from_config(config: &Config, cache: Arc<dyn CacheStore>) -> Self {
        let launcher: Arc<dyn SessionLauncher> = Arc::new(ChromiumLauncher::new(config.headless));
        let timing = ExtractTiming::from_config(config);

        Self::new(cache)
            .with_source(Arc::new(BrowserScraper::new(
                AmazonScraper::new(),
                launcher.clone(),
                timing,
            )))
            .with_source(Arc::new(BrowserScraper::new(
                FlipkartScraper::new(),
                launcher,
                timing,
            )))
            .with_ttl(config.cache_ttl)
            .with_limit(config.review_limit)
    }

    /// Register a source. A later source for the same site replaces an earlier one.
    pub fn with_source(mut self, source: Arc<dyn ReviewSource>) -> Self {
        self.sources.retain(|s| s.source() != source.source());
        self.sources.push(source);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Deduplicated review texts for a product, merged in declared source order.
    pub async fn fetch_reviews(&self, product: &str, selector: SourceSelector) -> Vec<String> {
        let product = product.trim();
        let key = ProductKey::new(product);
        if key.is_empty() {
            return Vec::new();
        }

        let per_source = join_all(
            selector
                .sources()
                .into_iter()
                .map(|source| self.reviews_from(&key, product, source)),
        )
        .await;

        let mut seen = HashSet::new();
        let reviews: Vec<String> = per_source
            .into_iter()
            .flatten()
            .filter(|text| !text.is_empty() && seen.insert(text.clone()))
            .collect();

        info!(product = %key, "Found {} unique reviews", reviews.len());
        reviews
    }

    /// Fetch, classify and summarize.
    pub async fn analyze(&self, product: &str, selector: SourceSelector) -> ReviewReport {
        let reviews: Vec<ScoredReview> = self
            .fetch_reviews(product, selector)
            .await
            .into_iter()
            .map(|review| {
                let sentiment = self.classifier.classify(&review);
                ScoredReview { review, sentiment }
            })
            .collect();

        ReviewReport {
            summary: summarize(&reviews),
            reviews,
        }
    }

    async fn reviews_from(&self, key: &ProductKey, product: &str, source: Source) -> Vec<String> {
        match self.cache.get(key, source).await {
            Ok(entry) if entry.exists() && self.is_fresh(entry.last_scraped) => {
                debug!(product = %key, %source, "Using cached reviews");
                return entry.reviews;
            }
            Ok(_) => {}
            Err(e) => warn!(product = %key, %source, "Cache read failed, extracting: {}", e),
        }

        let Some(adapter) = self.sources.iter().find(|s| s.source() == source) else {
            warn!(%source, "No scraper registered for source");
            return Vec::new();
        };

        let reviews = adapter.extract(product, self.limit).await;

        // Stored even when empty so a failing site is not retried until the TTL passes
        if let Err(e) = self.cache.set(key, source, &reviews).await {
            error!(product = %key, %source, "Failed to write cache: {}", e);
        }

        reviews
    }

    fn is_fresh(&self, last_scraped: i64) -> bool {
        let age = Utc::now().timestamp() - last_scraped;
        age < i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }
}
