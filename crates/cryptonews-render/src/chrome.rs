//! Chrome-backed renderer.
//!
//! `headless_chrome` is a blocking API, so every browser call runs on the
//! blocking pool and each render is additionally bounded by an async deadline.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cryptonews_core::{ArticleExtraction, RenderSettings};
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::RenderError;
use crate::extract::Extractor;

/// Slack on top of the inner waits before the async deadline fires.
const DEADLINE_SLACK_SECS: u64 = 5;

/// Bound on each post-navigation browser call (script evaluation, document read).
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// The network counts as idle once no resource has finished loading for this long.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);

/// Resources fetched so far, or -1 while the document is still loading.
const RESOURCE_COUNT_JS: &str = "(() => document.readyState === 'complete' \
     ? performance.getEntriesByType('resource').length : -1)()";

/// HTTP status of the current document, or 0 when the browser does not expose it.
const RESPONSE_STATUS_JS: &str =
    "(() => { const e = performance.getEntriesByType('navigation')[0]; \
     return e && typeof e.responseStatus === 'number' ? e.responseStatus : 0; })()";

/// Launches browser sessions configured from [`RenderSettings`].
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    settings: RenderSettings,
    user_agent: String,
    extractor: Arc<Extractor>,
}

impl ChromeRenderer {
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSelector`] if the configured selectors do
    /// not parse.
    pub fn new(settings: RenderSettings, user_agent: &str) -> Result<Self, RenderError> {
        let extractor = Extractor::from_settings(&settings)?;
        Ok(Self {
            settings,
            user_agent: user_agent.to_string(),
            extractor: Arc::new(extractor),
        })
    }

    /// Launches Chrome and opens the single tab reused for every render.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Launch`] if Chrome cannot be started or the tab
    /// cannot be opened.
    pub async fn open_session(&self) -> Result<ChromeSession, RenderError> {
        let settings = self.settings.clone();
        let user_agent = self.user_agent.clone();
        let (browser, tab) =
            tokio::task::spawn_blocking(move || launch(&settings, &user_agent)).await??;

        tracing::debug!("render: browser session opened");
        let budget = RenderBudget::from_settings(&self.settings);
        Ok(ChromeSession {
            browser: Some(browser),
            tab,
            extractor: Arc::clone(&self.extractor),
            budget,
            deadline: budget.deadline(),
            stale_tab: false,
        })
    }

    /// Renders one URL in a throwaway session.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`] from launching or rendering.
    pub async fn render_once(&self, url: &str) -> Result<ArticleExtraction, RenderError> {
        let mut session = self.open_session().await?;
        let result = session.render(url).await;
        session.close().await;
        result
    }
}

fn launch(settings: &RenderSettings, user_agent: &str) -> Result<(Browser, Arc<Tab>), RenderError> {
    let user_agent_arg = format!("--user-agent={user_agent}");
    let options = LaunchOptions {
        headless: true,
        sandbox: false,
        path: settings.chrome_path.clone(),
        idle_browser_timeout: Duration::from_secs(
            settings.navigation_timeout_secs + settings.marker_timeout_secs + 60,
        ),
        args: vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&user_agent_arg),
        ],
        ..Default::default()
    };

    let browser = Browser::new(options).map_err(|e| RenderError::Launch {
        reason: format!("{e:#}"),
    })?;
    let tab = browser.new_tab().map_err(|e| RenderError::Launch {
        reason: format!("failed to open tab: {e:#}"),
    })?;

    Ok((browser, tab))
}

/// Time allowed for each phase of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RenderBudget {
    /// Navigation plus the wait for network idle.
    pub navigation: Duration,
    pub marker: Duration,
}

impl RenderBudget {
    fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            navigation: Duration::from_secs(settings.navigation_timeout_secs),
            marker: Duration::from_secs(settings.marker_timeout_secs),
        }
    }

    /// Outer bound on one render: every inner wait plus slack. The idle poll
    /// can overshoot the navigation budget by one read, and the status check
    /// and document read take one read each.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.navigation + self.marker + READ_TIMEOUT * 3 + Duration::from_secs(DEADLINE_SLACK_SECS)
    }
}

/// One open browser with a single reusable tab.
///
/// The browser process is shut down by [`ChromeSession::close`] or, failing
/// that, when the session is dropped. A render that overruns its deadline
/// leaves its blocking task running against the tab, so the tab is replaced
/// before the next render.
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    extractor: Arc<Extractor>,
    budget: RenderBudget,
    deadline: Duration,
    stale_tab: bool,
}

impl std::fmt::Debug for ChromeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSession")
            .field("open", &self.browser.is_some())
            .field("budget", &self.budget)
            .field("deadline", &self.deadline)
            .field("stale_tab", &self.stale_tab)
            .finish_non_exhaustive()
    }
}

impl ChromeSession {
    /// Loads `url`, waits for the content marker and extracts the article.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Timeout`] if the marker does not appear or the render
    ///   overruns its deadline.
    /// - [`RenderError::Navigation`] / [`RenderError::HttpStatus`] if the page
    ///   fails to load.
    pub async fn render(&mut self, url: &str) -> Result<ArticleExtraction, RenderError> {
        if self.stale_tab {
            self.replace_tab(url).await?;
        }

        let tab = Arc::clone(&self.tab);
        let extractor = Arc::clone(&self.extractor);
        let budget = self.budget;
        let target = url.to_string();

        let task =
            tokio::task::spawn_blocking(move || render_blocking(&tab, &target, &extractor, budget));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!(url, "render: deadline overrun, tab will be replaced");
                self.stale_tab = true;
                Err(RenderError::Timeout {
                    url: url.to_string(),
                    waited_secs: self.deadline.as_secs(),
                })
            }
        }
    }

    /// Closes the tab an abandoned render may still be driving and opens a
    /// fresh one. Closing makes the abandoned task's pending calls fail.
    async fn replace_tab(&mut self, url: &str) -> Result<(), RenderError> {
        let Some(browser) = self.browser.clone() else {
            return Err(RenderError::Browser {
                url: url.to_string(),
                reason: "session already closed".to_string(),
            });
        };
        let stale = Arc::clone(&self.tab);

        let fresh = tokio::task::spawn_blocking(move || {
            if let Err(e) = stale.close(false) {
                tracing::debug!(error = %e, "render: stale tab close failed");
            }
            browser.new_tab()
        })
        .await?
        .map_err(|e| RenderError::Browser {
            url: url.to_string(),
            reason: format!("failed to open replacement tab: {e:#}"),
        })?;

        self.tab = fresh;
        self.stale_tab = false;
        tracing::debug!("render: replaced stale tab");
        Ok(())
    }

    /// Shuts the browser down and waits for the process to exit. Later calls
    /// are no-ops.
    pub async fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || drop(browser)).await {
                tracing::warn!(error = %e, "render: browser shutdown task failed");
            }
            tracing::debug!("render: browser session closed");
        }
    }
}

/// Dropping `Browser` kills and reaps the Chrome child, which blocks. Inside a
/// runtime that work moves to the blocking pool; otherwise it runs in place.
impl Drop for ChromeSession {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        tracing::debug!("render: browser session dropped without close");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(browser));
            }
            Err(_) => drop(browser),
        }
    }
}

fn render_blocking(
    tab: &Tab,
    url: &str,
    extractor: &Extractor,
    budget: RenderBudget,
) -> Result<ArticleExtraction, RenderError> {
    let started = Instant::now();
    tab.set_default_timeout(budget.navigation);
    tab.navigate_to(url)
        .and_then(Tab::wait_until_navigated)
        .map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            reason: format!("{e:#}"),
        })?;

    tab.set_default_timeout(READ_TIMEOUT);
    if !wait_for_network_idle(tab, started + budget.navigation) {
        return Err(RenderError::Navigation {
            url: url.to_string(),
            reason: format!(
                "network not idle within {}s",
                budget.navigation.as_secs()
            ),
        });
    }

    let status = tab
        .evaluate(RESPONSE_STATUS_JS, false)
        .ok()
        .and_then(|obj| obj.value)
        .and_then(|v| v.as_u64())
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(0);
    if status >= 400 {
        return Err(RenderError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    tab.wait_for_element_with_custom_timeout(extractor.content_selector(), budget.marker)
        .map_err(|_| RenderError::Timeout {
            url: url.to_string(),
            waited_secs: budget.marker.as_secs(),
        })?;

    let html = tab.get_content().map_err(|e| RenderError::Browser {
        url: url.to_string(),
        reason: format!("{e:#}"),
    })?;
    let page_url = tab.get_url();

    Ok(extractor.extract(&html, &page_url))
}

/// Polls until the document has loaded and no resource has finished loading
/// for [`NETWORK_IDLE_WINDOW`]. Returns false if `until` passes first.
fn wait_for_network_idle(tab: &Tab, until: Instant) -> bool {
    let mut idle = IdleTracker::new(Instant::now());

    loop {
        let count = tab
            .evaluate(RESOURCE_COUNT_JS, false)
            .ok()
            .and_then(|obj| obj.value)
            .and_then(|v| v.as_i64())
            .filter(|count| *count >= 0);

        let now = Instant::now();
        if idle.observe(count, now) {
            return true;
        }
        if now >= until {
            return false;
        }
        std::thread::sleep(NETWORK_IDLE_POLL);
    }
}

/// Tracks how long the loaded-resource count has held steady. `None` means
/// the document is still loading or the count could not be read.
#[derive(Debug)]
struct IdleTracker {
    last_count: Option<i64>,
    quiet_since: Instant,
}

impl IdleTracker {
    fn new(now: Instant) -> Self {
        Self {
            last_count: None,
            quiet_since: now,
        }
    }

    fn observe(&mut self, count: Option<i64>, now: Instant) -> bool {
        match count {
            Some(count) if self.last_count == Some(count) => {
                now.duration_since(self.quiet_since) >= NETWORK_IDLE_WINDOW
            }
            _ => {
                self.last_count = count;
                self.quiet_since = now;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RenderSettings {
        RenderSettings {
            navigation_timeout_secs: 30,
            marker_timeout_secs: 5,
            content_selector: ".description-body".to_string(),
            source_link_selector: ".post-title a".to_string(),
            chrome_path: None,
        }
    }

    #[test]
    fn renderer_rejects_invalid_selectors() {
        let mut bad = settings();
        bad.source_link_selector = "a[href".to_string();
        let err = ChromeRenderer::new(bad, "ua").unwrap_err();
        assert!(matches!(err, RenderError::InvalidSelector { .. }));
    }

    #[test]
    fn renderer_builds_from_default_selectors() {
        let renderer = ChromeRenderer::new(settings(), "ua").expect("renderer");
        assert_eq!(renderer.extractor.content_selector(), ".description-body");
    }

    #[test]
    fn deadline_covers_every_inner_wait() {
        let budget = RenderBudget::from_settings(&settings());
        let inner = budget.navigation + READ_TIMEOUT + READ_TIMEOUT + budget.marker + READ_TIMEOUT;
        assert!(budget.deadline() > inner);
        assert_eq!(budget.deadline(), Duration::from_secs(30 + 5 + 15 + 5));
    }

    #[test]
    fn network_idle_needs_a_steady_count_for_the_whole_window() {
        let start = Instant::now();
        let mut idle = IdleTracker::new(start);

        assert!(!idle.observe(None, start));
        assert!(!idle.observe(Some(3), start + Duration::from_millis(100)));
        assert!(!idle.observe(Some(3), start + Duration::from_millis(400)));
        // A new resource restarts the window.
        assert!(!idle.observe(Some(4), start + Duration::from_millis(500)));
        assert!(!idle.observe(Some(4), start + Duration::from_millis(900)));
        assert!(idle.observe(Some(4), start + Duration::from_millis(1_000)));
    }

    #[test]
    fn network_idle_never_settles_while_loading() {
        let start = Instant::now();
        let mut idle = IdleTracker::new(start);
        for ms in (0..5_000).step_by(100) {
            assert!(!idle.observe(None, start + Duration::from_millis(ms)));
        }
    }

    #[tokio::test]
    #[ignore = "requires a local Chrome binary"]
    async fn dropping_an_open_session_does_not_block_the_runtime() {
        let renderer = ChromeRenderer::new(settings(), "ua").expect("renderer");
        let session = renderer.open_session().await.expect("session");

        let started = Instant::now();
        drop(session);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    #[ignore = "requires a local Chrome binary"]
    async fn overrun_render_gets_a_fresh_tab() {
        let page = "data:text/html,<div class=description-body>hello</div>";
        let renderer = ChromeRenderer::new(settings(), "ua").expect("renderer");
        let mut session = renderer.open_session().await.expect("session");
        let first_tab = Arc::clone(&session.tab);

        let full_deadline = session.deadline;
        session.deadline = Duration::from_millis(1);
        let err = session.render(page).await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(session.stale_tab);

        session.deadline = full_deadline;
        let extraction = session.render(page).await.expect("render on fresh tab");
        assert_eq!(extraction.content.as_deref(), Some("hello"));
        assert!(!session.stale_tab);
        assert!(!Arc::ptr_eq(&first_tab, &session.tab));

        session.close().await;
    }
}
