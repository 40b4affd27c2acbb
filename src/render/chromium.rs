//! Headless Chrome/Chromium renderer.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PageRenderer, RenderError};
use crate::constants::BROWSER_USER_AGENT;

/// Default window width in pixels.
pub const DEFAULT_WINDOW_WIDTH: u32 = 1920;

/// Default window height in pixels.
pub const DEFAULT_WINDOW_HEIGHT: u32 = 1080;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser launch configuration.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for a single CDP request.
    pub request_timeout: Duration,
    /// Path to Chrome/Chromium executable (None for auto-detection).
    pub chrome_path: Option<String>,
    /// Show the browser window instead of running headless.
    pub visible: bool,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            request_timeout: Duration::from_secs(60),
            chrome_path: None,
            visible: false,
        }
    }
}

/// A launched browser with one page that the crawler navigates.
pub struct ChromiumRenderer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch the browser and open a blank page.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be started or the page cannot be created.
    pub async fn launch(config: &ChromiumConfig) -> Result<Self> {
        info!(visible = config.visible, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.request_timeout)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio");

        if config.visible {
            builder = builder.with_head();
        }

        if let Some(ref chrome_path) = config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to create page")?;

        page.execute(SetUserAgentOverrideParams::new(BROWSER_USER_AGENT.to_string()))
            .await
            .context("Failed to set user agent")?;

        info!("Browser ready");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn title(&mut self) -> Result<String, RenderError> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, RenderError> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| RenderError::Protocol(e.to_string()))
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> bool {
        let page = &self.page;
        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        if tokio::time::timeout(timeout, poll).await.is_ok() {
            true
        } else {
            debug!(selector, "Timed out waiting for selector");
            false
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Protocol(e.to_string()));

        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {e}");
        }
        self.handler.abort();

        if result.is_ok() {
            info!("Browser shutdown complete");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChromiumConfig::default();
        assert_eq!(config.window_width, DEFAULT_WINDOW_WIDTH);
        assert_eq!(config.window_height, DEFAULT_WINDOW_HEIGHT);
        assert!(!config.visible);
        assert!(config.chrome_path.is_none());
    }
}
