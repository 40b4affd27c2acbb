//! The page rendering capability the crawler drives.
//!
//! A renderer owns exactly one browser page. Navigation mutates it, so every
//! method takes `&mut self`; DOM queries are done on the HTML returned by
//! [`PageRenderer::content`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod chromium;

pub use chromium::{ChromiumConfig, ChromiumRenderer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// Drives a single rendered page.
#[async_trait]
pub trait PageRenderer: Send {
    /// Load `url`, failing if it does not finish within `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Document title of the current page.
    async fn title(&mut self) -> Result<String, RenderError>;

    /// Serialized DOM of the current page after client-side rendering.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// URL of the current page, after redirects.
    async fn current_url(&mut self) -> Result<String, RenderError>;

    /// Wait until `selector` matches something. Returns whether it did.
    async fn wait_for_selector(&mut self, _selector: &str, _timeout: Duration) -> bool {
        false
    }

    /// Let the page settle.
    async fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Release the page and the browser behind it.
    async fn close(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}
