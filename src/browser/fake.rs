//! Scripted in-memory browser for exercising the scraping state machine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserSession, NextControl, SessionLauncher};
use crate::error::BrowserError;

/// What the fake site looks like.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub search_reachable: bool,
    /// Selectors that match something on the search results page.
    pub product_selectors: Vec<String>,
    /// Product results open in a new context instead of in place.
    pub opens_new_context: bool,
    /// A context not opened by the session exists from the start, like
    /// the browser's own startup tab.
    pub stray_context: bool,
    pub has_reviews_link: bool,
    /// Review pages as HTML, in pagination order.
    pub review_pages: Vec<String>,
    /// Next control exists but cannot be clicked.
    pub next_blocked: bool,
    /// `html()` never returns, to exercise the overall timeout.
    pub hang_on_read: bool,
}

impl FakeSite {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            search_reachable: true,
            product_selectors: vec!["a.product".to_string()],
            opens_new_context: true,
            has_reviews_link: true,
            review_pages: pages.iter().map(|p| (*p).to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Counters shared between a test and the sessions it launched.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub launched: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }
}

pub struct FakeLauncher {
    pub site: FakeSite,
    pub recorder: Recorder,
    pub fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            recorder: Recorder::default(),
            fail_launch: false,
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.fail_launch {
            return Err(BrowserError::Launch("no browser binary".to_string()));
        }
        self.recorder.launched.fetch_add(1, Ordering::SeqCst);
        let mut contexts = Vec::new();
        if self.site.stray_context {
            contexts.push(FakeContext {
                tab: Tab::Stray,
                opened_by: None,
            });
        }
        contexts.push(FakeContext {
            tab: Tab::Results,
            opened_by: None,
        });
        let seen = contexts.iter().map(|c| c.tab).collect();

        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            recorder: self.recorder.clone(),
            contexts,
            seen,
            focused: Tab::Results,
            page_index: 0,
            closed: false,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Stray,
    Results,
    Product,
}

struct FakeContext {
    tab: Tab,
    opened_by: Option<Tab>,
}

/// Reviews are only visible while the product context has focus.
pub struct FakeSession {
    site: FakeSite,
    recorder: Recorder,
    contexts: Vec<FakeContext>,
    seen: Vec<Tab>,
    focused: Tab,
    page_index: usize,
    closed: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.recorder.record(format!("goto {url}"));
        if self.site.search_reachable {
            Ok(())
        } else {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "blocked".to_string(),
            })
        }
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        if self.site.hang_on_read {
            std::future::pending::<()>().await;
        }
        if self.focused != Tab::Product {
            return Ok("<html><body></body></html>".to_string());
        }
        Ok(self
            .site
            .review_pages
            .get(self.page_index)
            .cloned()
            .unwrap_or_default())
    }

    async fn click_first(
        &mut self,
        selectors: &[String],
        _wait: Duration,
    ) -> Result<bool, BrowserError> {
        let hit = selectors
            .iter()
            .find(|s| self.site.product_selectors.contains(s));
        let Some(selector) = hit else {
            return Ok(false);
        };
        self.recorder.record(format!("click {selector}"));

        if self.site.opens_new_context {
            // Target lists carry no creation order.
            self.contexts.insert(
                0,
                FakeContext {
                    tab: Tab::Product,
                    opened_by: Some(self.focused),
                },
            );
        } else {
            self.focused = Tab::Product;
        }
        Ok(true)
    }

    async fn click_link_text(&mut self, text: &str, _wait: Duration) -> Result<bool, BrowserError> {
        if self.focused != Tab::Product || !self.site.has_reviews_link {
            return Ok(false);
        }
        self.recorder.record(format!("link {text}"));
        Ok(true)
    }

    async fn click_next(&mut self, _control: &NextControl) -> Result<bool, BrowserError> {
        if self.focused != Tab::Product
            || self.site.next_blocked
            || self.page_index + 1 >= self.site.review_pages.len()
        {
            return Ok(false);
        }
        self.page_index += 1;
        self.recorder.record(format!("next {}", self.page_index));
        Ok(true)
    }

    async fn scroll_to(&mut self, _fraction: f64) -> Result<(), BrowserError> {
        self.recorder.record("scroll");
        Ok(())
    }

    async fn focus_newest_context(&mut self, _wait: Duration) -> Result<bool, BrowserError> {
        let opened = self
            .contexts
            .iter()
            .find(|c| !self.seen.contains(&c.tab) && c.opened_by == Some(self.focused))
            .map(|c| c.tab);

        match opened {
            Some(tab) => {
                self.seen.push(tab);
                self.focused = tab;
                self.recorder.record("focus new context");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.recorder.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
