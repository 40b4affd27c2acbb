//! Delays, attempt budgets and page loading with retries.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::DEFAULT_NAV_TIMEOUT_SECS;
use crate::profile::SiteProfile;
use crate::render::{PageRenderer, RenderError};

/// Every delay and attempt budget the crawler uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTiming {
    pub nav_timeout: Duration,

    /// Courtesy delay before list page `p` is `base + p * per_page`.
    pub courtesy_base: Duration,
    pub courtesy_per_page: Duration,

    pub list_attempts: u32,
    pub list_settle: Duration,
    /// Backoff after a blocked list page is `base + attempt * step` (0-based attempt).
    pub blocked_backoff_base: Duration,
    pub blocked_backoff_step: Duration,
    pub list_error_backoff: Duration,
    /// Extra wait for client-side rendering once the list page loaded.
    pub list_render_wait: Duration,
    pub link_selector_timeout: Duration,

    pub detail_attempts: u32,
    pub detail_settle: Duration,
    pub detail_retry_delay: Duration,
}

impl Default for CrawlTiming {
    fn default() -> Self {
        Self {
            nav_timeout: Duration::from_secs(DEFAULT_NAV_TIMEOUT_SECS),
            courtesy_base: Duration::from_millis(2000),
            courtesy_per_page: Duration::from_millis(1000),
            list_attempts: 3,
            list_settle: Duration::from_millis(3000),
            blocked_backoff_base: Duration::from_millis(10_000),
            blocked_backoff_step: Duration::from_millis(5000),
            list_error_backoff: Duration::from_millis(5000),
            list_render_wait: Duration::from_millis(3000),
            link_selector_timeout: Duration::from_secs(10),
            detail_attempts: 2,
            detail_settle: Duration::from_millis(500),
            detail_retry_delay: Duration::from_millis(1000),
        }
    }
}

impl CrawlTiming {
    /// Same attempt budgets, no waiting. For tests and scripted renderers.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            nav_timeout: Duration::from_secs(5),
            courtesy_base: Duration::ZERO,
            courtesy_per_page: Duration::ZERO,
            list_settle: Duration::ZERO,
            blocked_backoff_base: Duration::ZERO,
            blocked_backoff_step: Duration::ZERO,
            list_error_backoff: Duration::ZERO,
            list_render_wait: Duration::ZERO,
            link_selector_timeout: Duration::ZERO,
            detail_settle: Duration::ZERO,
            detail_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    #[must_use]
    pub fn courtesy_delay(&self, page: u32) -> Duration {
        self.courtesy_base + self.courtesy_per_page * page
    }

    #[must_use]
    pub fn blocked_backoff(&self, attempt: u32) -> Duration {
        self.blocked_backoff_base + self.blocked_backoff_step * attempt
    }
}

/// Load a list page, retrying blocked responses and navigation errors.
///
/// Returns `false` once every attempt failed. On success the page has been
/// given time to render and, best-effort, to show its thread links.
pub async fn load_list_page<R>(
    renderer: &mut R,
    url: &str,
    page: u32,
    timing: &CrawlTiming,
    profile: &SiteProfile,
) -> bool
where
    R: PageRenderer + ?Sized,
{
    let mut loaded = false;

    for attempt in 0..timing.list_attempts {
        let last = attempt + 1 == timing.list_attempts;

        match renderer.navigate(url, timing.nav_timeout).await {
            Ok(()) => {
                renderer.wait(timing.list_settle).await;
                let title = renderer.title().await.unwrap_or_default();
                if profile.is_blocked_title(&title) {
                    warn!(page, attempt = attempt + 1, title = %title, "List page blocked");
                    if !last {
                        renderer.wait(timing.blocked_backoff(attempt)).await;
                    }
                    continue;
                }
                loaded = true;
                break;
            }
            Err(e) => {
                warn!(page, attempt = attempt + 1, "List page navigation failed: {e}");
                if !last {
                    renderer.wait(timing.list_error_backoff).await;
                }
            }
        }
    }

    if !loaded {
        return false;
    }

    renderer.wait(timing.list_render_wait).await;
    if let Some(primary) = profile.thread_link_selectors.first() {
        let appeared = renderer
            .wait_for_selector(primary, timing.link_selector_timeout)
            .await;
        debug!(page, appeared, "Waited for thread links");
    }
    info!(page, url, "List page loaded");
    true
}

/// Load a detail page with a short retry. Returns the last error when every
/// attempt failed.
pub async fn load_detail_page<R>(
    renderer: &mut R,
    url: &str,
    timing: &CrawlTiming,
) -> Result<(), RenderError>
where
    R: PageRenderer + ?Sized,
{
    let mut last_error = RenderError::Navigation {
        url: url.to_string(),
        message: "no attempts made".to_string(),
    };

    for attempt in 0..timing.detail_attempts {
        match renderer.navigate(url, timing.nav_timeout).await {
            Ok(()) => {
                renderer.wait(timing.detail_settle).await;
                return Ok(());
            }
            Err(e) => {
                warn!(url, attempt = attempt + 1, "Detail page navigation failed: {e}");
                last_error = e;
                if attempt + 1 < timing.detail_attempts {
                    renderer.wait(timing.detail_retry_delay).await;
                }
            }
        }
    }

    Err(last_error)
}
