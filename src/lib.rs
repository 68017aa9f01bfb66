//! Product review collection, sentiment summary and purchase recommendation.
//!
//! Reviews are extracted from retail sites with a headless browser, cached per
//! `(product, source)` for a configurable TTL, deduplicated across sources and
//! summarized into a verdict.

pub mod api;
pub mod browser;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod review_finder;
pub mod scrapers;
pub mod sentiment;
pub mod summary;
pub mod traits;

pub use review_finder::ReviewFinder;
