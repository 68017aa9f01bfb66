use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserSession, NextControl, SessionLauncher};
use crate::error::BrowserError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Attribute used to hand an element found by script over to a native click.
const TARGET_ATTR: &str = "data-review-verdict-target";

/// Extra Chromium switches on top of the launcher defaults.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Launches a dedicated Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
}

impl ChromiumLauncher {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }

    fn session_dir() -> PathBuf {
        let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "review-verdict-session-{}-{}",
            std::process::id(),
            n
        ))
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let user_data_dir = Self::session_dir();

        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .user_data_dir(&user_data_dir)
            .args(LAUNCH_ARGS.iter().copied())
            .arg(format!("--user-agent={USER_AGENT}"));

        if !self.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            known_targets: HashSet::new(),
            handler_task: Some(handler_task),
            user_data_dir: Some(user_data_dir),
        };

        let page = match session.browser_mut()?.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = session.close().await;
                return Err(e.into());
            }
        };
        session.adopt(page);

        // Chrome's own startup tab is attached too; it must never count as
        // a context opened by the product click.
        if let Err(e) = session.remember_open_targets().await {
            debug!("could not list startup tabs: {}", e);
        }

        debug!("chromium session launched");
        Ok(Box::new(session))
    }
}

/// One Chromium process with the page currently in focus.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    known_targets: HashSet<String>,
    handler_task: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
}

impl ChromiumSession {
    fn browser(&self) -> Result<&Browser, BrowserError> {
        self.browser.as_ref().ok_or(BrowserError::NoPage)
    }

    fn browser_mut(&mut self) -> Result<&mut Browser, BrowserError> {
        self.browser.as_mut().ok_or(BrowserError::NoPage)
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::NoPage)
    }

    fn adopt(&mut self, page: Page) {
        self.known_targets.insert(target_key(page.target_id()));
        self.page = Some(page);
    }

    async fn remember_open_targets(&mut self) -> Result<(), BrowserError> {
        let pages = self.browser()?.pages().await?;
        self.known_targets
            .extend(pages.iter().map(|page| target_key(page.target_id())));
        Ok(())
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, BrowserError> {
        let value: serde_json::Value = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Marks the element chosen by `finder` (a JS expression yielding an
    /// element or null) and clicks it with a real mouse event, which lets
    /// `target=_blank` links open new tabs the way a user click would.
    async fn click_marked(&self, finder: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(() => {{
                document.querySelectorAll('[{TARGET_ATTR}]').forEach(e => e.removeAttribute('{TARGET_ATTR}'));
                const isVisible = (el) => {{
                    const r = el.getBoundingClientRect();
                    const s = getComputedStyle(el);
                    return r.width > 0 && r.height > 0 && s.display !== 'none' && s.visibility !== 'hidden';
                }};
                const el = ({finder})(isVisible);
                if (!el) return false;
                el.setAttribute('{TARGET_ATTR}', '1');
                return true;
            }})()"#
        );

        if !self.eval_bool(&script).await? {
            return Ok(false);
        }

        let page = self.page()?;
        let element = match page.find_element(format!("[{TARGET_ATTR}]")).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };

        match element.click().await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("native click failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn poll_click(&self, finder: &str, wait: Duration) -> Result<bool, BrowserError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if self.click_marked(finder).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn target_key(id: &TargetId) -> String {
    let id: &str = id.as_ref();
    id.to_string()
}

/// Index of a page opened from `current` that has not been seen yet.
///
/// `pages` holds `(target, opener)` pairs in no particular order. Pages
/// without an opener (startup tabs, devtools) never match.
fn opened_from(
    current: &str,
    known: &HashSet<String>,
    pages: &[(String, Option<String>)],
) -> Option<usize> {
    pages.iter().position(|(target, opener)| {
        !known.contains(target) && opener.as_deref() == Some(current)
    })
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!("navigating to {}", url);
        let page = self.page()?;
        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}s", NAVIGATION_TIMEOUT.as_secs()),
            }),
        }
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        Ok(self.page()?.content().await?)
    }

    async fn click_first(
        &mut self,
        selectors: &[String],
        wait: Duration,
    ) -> Result<bool, BrowserError> {
        let list = serde_json::to_string(selectors).map_err(|e| BrowserError::Script(e.to_string()))?;
        let finder = format!(
            r#"(isVisible) => {{
                for (const sel of {list}) {{
                    const el = Array.from(document.querySelectorAll(sel)).find(isVisible);
                    if (el) return el;
                }}
                return null;
            }}"#
        );
        self.poll_click(&finder, wait).await
    }

    async fn click_link_text(&mut self, text: &str, wait: Duration) -> Result<bool, BrowserError> {
        let needle = js_string(text);
        let finder = format!(
            r#"(isVisible) => Array.from(document.querySelectorAll('a'))
                .find(a => isVisible(a) && (a.innerText || '').includes({needle})) || null"#
        );
        self.poll_click(&finder, wait).await
    }

    async fn click_next(&mut self, control: &NextControl) -> Result<bool, BrowserError> {
        let selector = js_string(&control.selector);
        let required = control
            .required_text
            .as_deref()
            .map_or_else(|| "null".to_string(), js_string);
        let require_visible = control.require_visible;
        let finder = format!(
            r#"(isVisible) => {{
                const required = {required};
                return Array.from(document.querySelectorAll({selector})).find(el =>
                    (!{require_visible} || isVisible(el)) &&
                    !el.hasAttribute('disabled') &&
                    (required === null || (el.innerText || '').includes(required))
                ) || null;
            }}"#
        );
        self.click_marked(&finder).await
    }

    async fn scroll_to(&mut self, fraction: f64) -> Result<(), BrowserError> {
        let script = format!("window.scrollTo(0, document.body.scrollHeight * {fraction}); true");
        self.eval_bool(&script).await.map(|_| ())
    }

    async fn focus_newest_context(&mut self, wait: Duration) -> Result<bool, BrowserError> {
        let current = target_key(self.page()?.target_id());
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let mut pages = self.browser()?.pages().await?;
            let targets: Vec<(String, Option<String>)> = pages
                .iter()
                .map(|page| {
                    (
                        target_key(page.target_id()),
                        page.opener_id().as_ref().map(target_key),
                    )
                })
                .collect();

            if let Some(index) = opened_from(&current, &self.known_targets, &targets) {
                self.adopt(pages.swap_remove(index));
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.page = None;

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                result = Err(BrowserError::from(e));
            }
            if let Err(e) = browser.wait().await {
                warn!("failed to reap browser process: {}", e);
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        if let Some(dir) = self.user_data_dir.take()
            && let Err(e) = tokio::fs::remove_dir_all(&dir).await
        {
            debug!("failed to remove session dir {}: {}", dir.display(), e);
        }

        result
    }
}

impl Drop for ChromiumSession {
    // Reached when a session future is cancelled before `close` ran.
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        // Dropping the browser kills its child process.
        self.browser.take();
        if let Some(dir) = self.user_data_dir.take() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
