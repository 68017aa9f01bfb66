//! Headless browser sessions used by the site scrapers.
//!
//! A session is exclusively owned by one extraction run and must be closed on
//! every exit path. The trait keeps the scrapers independent of the concrete
//! automation engine so the navigation state machine can be exercised without
//! a real browser.

pub mod chrome;
#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

pub use chrome::ChromiumLauncher;

/// How to find the "next page" control of a paginated review list.
#[derive(Debug, Clone)]
pub struct NextControl {
    pub selector: String,
    /// Only click when the control's text contains this.
    pub required_text: Option<String>,
    /// Only click when the control is rendered and visible.
    pub require_visible: bool,
}

/// A single browser session driving one active page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the active page and wait for it to load.
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Current DOM of the active page, serialized.
    async fn html(&mut self) -> Result<String, BrowserError>;

    /// Click the first visible element matching any selector, trying the
    /// selectors in order. Keeps polling until `wait` has elapsed; a zero
    /// wait makes a single attempt. Returns whether anything was clicked.
    async fn click_first(&mut self, selectors: &[String], wait: Duration)
    -> Result<bool, BrowserError>;

    /// Click the first link whose visible text contains `text`.
    async fn click_link_text(&mut self, text: &str, wait: Duration) -> Result<bool, BrowserError>;

    /// Click the pagination control if it is present and passes its checks.
    async fn click_next(&mut self, control: &NextControl) -> Result<bool, BrowserError>;

    /// Scroll to `fraction` of the document height to trigger lazy loading.
    async fn scroll_to(&mut self, fraction: f64) -> Result<(), BrowserError>;

    /// Switch to a browsing context opened since the last switch, if one
    /// appears within `wait`. Returns whether focus moved.
    async fn focus_newest_context(&mut self, wait: Duration) -> Result<bool, BrowserError>;

    /// Release the browser. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Starts fresh browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
