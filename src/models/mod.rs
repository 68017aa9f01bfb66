//! Data models shared by the scrapers, the cache and the HTTP surface

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Normalized product name identifying one logical product across sites.
///
/// Normalization trims surrounding whitespace and lower-cases the name, so
/// `ProductKey::new(key.as_str()) == key` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey(String);

impl ProductKey {
    pub fn new(product_name: &str) -> Self {
        Self(product_name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A retail site reviews can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amazon,
    Flipkart,
}

impl Source {
    /// Every known source, in declared order. Results are always merged in
    /// this order regardless of which source finishes first.
    pub const ALL: [Source; 2] = [Source::Amazon, Source::Flipkart];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Amazon => "amazon",
            Source::Flipkart => "flipkart",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amazon" => Ok(Source::Amazon),
            "flipkart" => Ok(Source::Flipkart),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source: {0}")]
pub struct UnknownSource(pub String);

/// Which sources a request wants reviews from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSelector {
    One(Source),
    #[default]
    Both,
}

impl SourceSelector {
    /// Expands the selector into concrete sources, in declared order.
    pub fn sources(self) -> Vec<Source> {
        match self {
            SourceSelector::One(source) => vec![source],
            SourceSelector::Both => Source::ALL.to_vec(),
        }
    }
}

impl FromStr for SourceSelector {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(SourceSelector::Both),
            other => other.parse().map(SourceSelector::One),
        }
    }
}

/// Sentiment label attached to a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// A review text together with its classified sentiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredReview {
    pub review: String,
    pub sentiment: Sentiment,
}

/// What the cache holds for one `(product, source)` pair.
///
/// `last_scraped` is a unix timestamp in seconds; `0` means "never fetched".
/// Missing fields in stored entries take these same defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub reviews: Vec<String>,
    #[serde(default)]
    pub last_scraped: i64,
}

impl CacheEntry {
    pub fn exists(&self) -> bool {
        self.last_scraped > 0
    }
}

/// Overall verdict derived from the sentiment distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Neutral,
    Negative,
}

impl Verdict {
    pub fn message(self) -> &'static str {
        match self {
            Verdict::Positive => "majority of reviews are positive, recommended.",
            Verdict::Negative => "significant negative feedback, not recommended.",
            Verdict::Neutral => "reviews are mixed, consider carefully.",
        }
    }
}

/// Aggregate sentiment counts and the recommendation derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total: usize,
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
    pub label: Verdict,
    pub recommendation_text: String,
}

/// Response body of a review lookup: the verdict plus every classified review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub summary: RecommendationSummary,
    pub reviews: Vec<ScoredReview>,
}
