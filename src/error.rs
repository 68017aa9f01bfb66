//! Typed errors for the library layers.
//!
//! Scraper and cache failures never reach a caller of the orchestrator; they
//! are logged and degraded to "fewer reviews". These types exist so that the
//! logs say precisely which step failed.

use thiserror::Error;

use crate::models::Source;

/// Failures while driving the headless browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("no page is open")]
    NoPage,

    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// Terminal failures of one extraction run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{site} search page unreachable: {reason}")]
    Search { site: Source, reason: String },

    #[error("no matching product on {site}")]
    NoProduct { site: Source },

    #[error("{site} extraction timed out after {seconds}s")]
    Timeout { site: Source, seconds: u64 },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Failures of a cache backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unsupported cache database url: {0}")]
    UnsupportedUrl(String),

    #[error("cache migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Request validation failures surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("product param required")]
    MissingProduct,

    #[error("source must be amazon|flipkart|both")]
    InvalidSource,

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
