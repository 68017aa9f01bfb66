//! Review sentiment classification.
//!
//! The orchestrator and the HTTP layer only depend on [`SentimentClassifier`];
//! [`LexiconClassifier`] is the built-in implementation.

mod lexicon;

use crate::models::Sentiment;

pub use lexicon::LexiconClassifier;

/// Labels a single review text.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Sentiment;
}
