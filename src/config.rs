use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long an extracted review list stays fresh.
    pub cache_ttl: Duration,
    /// Preferred external cache store (`sqlite:` URL). `None` means file cache.
    pub cache_database_url: Option<String>,
    /// Path of the JSON file used when no external store is reachable.
    pub cache_file: PathBuf,
    /// Maximum reviews extracted per source per call.
    pub review_limit: usize,
    /// Upper bound for one whole browser session.
    pub extract_timeout: Duration,
    /// Pause before scanning a page so lazy-loaded reviews can render.
    pub page_settle: Duration,
    pub headless: bool,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60 * 60 * 12),
            cache_database_url: None,
            cache_file: PathBuf::from("cache.json"),
            review_limit: 25,
            extract_timeout: Duration::from_secs(90),
            page_settle: Duration::from_millis(1200),
            headless: true,
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment. `.env` is loaded by
    /// the binary before this runs.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults; set but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_ttl = match var("CACHE_TTL_SECONDS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .context("CACHE_TTL_SECONDS must be a number of seconds")?,
            ),
            None => defaults.cache_ttl,
        };

        let review_limit = match var("REVIEW_LIMIT") {
            Some(v) => v
                .trim()
                .parse()
                .context("REVIEW_LIMIT must be a positive integer")?,
            None => defaults.review_limit,
        };

        let extract_timeout = match var("EXTRACT_TIMEOUT_SECONDS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .context("EXTRACT_TIMEOUT_SECONDS must be a number of seconds")?,
            ),
            None => defaults.extract_timeout,
        };

        let page_settle = match var("PAGE_SETTLE_MS") {
            Some(v) => Duration::from_millis(
                v.trim()
                    .parse()
                    .context("PAGE_SETTLE_MS must be a number of milliseconds")?,
            ),
            None => defaults.page_settle,
        };

        let headless = match var("BROWSER_HEADLESS") {
            Some(v) => parse_flag(&v).context("BROWSER_HEADLESS must be true or false")?,
            None => defaults.headless,
        };

        Ok(Self {
            cache_ttl,
            cache_database_url: var("CACHE_DATABASE_URL"),
            cache_file: var("CACHE_FILE").map_or(defaults.cache_file, PathBuf::from),
            review_limit,
            extract_timeout,
            page_settle,
            headless,
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value: {other}"),
    }
}
