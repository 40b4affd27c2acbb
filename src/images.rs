//! Downloading images embedded in questions and answers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::constants::{IMAGE_FETCH_TIMEOUT_SECS, IMAGE_FETCH_USER_AGENT};
use crate::extract::PendingImage;
use crate::models::ImageRef;
use crate::naming::image_filename;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot resolve image source {src:?} against {base}")]
    InvalidUrl { src: String, base: String },
    #[error("image request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to write image to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve an `<img src>` to an absolute URL.
///
/// Protocol-relative sources get `https:`; everything else that is not already
/// absolute is joined onto `base_url`.
#[must_use]
pub fn resolve_src(src: &str, base_url: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }
    Url::parse(base_url)
        .and_then(|base| base.join(src))
        .ok()
        .map(|u| u.to_string())
}

/// Downloads images one at a time into a directory.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    /// Create a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(IMAGE_FETCH_TIMEOUT_SECS))
            .user_agent(IMAGE_FETCH_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Download every image of one container in order. Failed images are
    /// logged and left out.
    pub async fn fetch_all(
        &self,
        images: &[PendingImage],
        container: &str,
        base_url: &str,
        output_dir: &Path,
    ) -> Vec<ImageRef> {
        let mut fetched = Vec::with_capacity(images.len());
        for image in images {
            if let Some(image_ref) = self.fetch(image, container, base_url, output_dir).await {
                fetched.push(image_ref);
            }
        }
        fetched
    }

    /// Download one image, returning `None` when it could not be saved.
    pub async fn fetch(
        &self,
        image: &PendingImage,
        container: &str,
        base_url: &str,
        output_dir: &Path,
    ) -> Option<ImageRef> {
        match self.try_fetch(image, container, base_url, output_dir).await {
            Ok(image_ref) => {
                debug!(url = %image_ref.original_url, path = %image_ref.local_path, "Image saved");
                Some(image_ref)
            }
            Err(e) => {
                warn!(index = image.index, src = %image.src, "Failed to download image: {e}");
                None
            }
        }
    }

    async fn try_fetch(
        &self,
        image: &PendingImage,
        container: &str,
        base_url: &str,
        output_dir: &Path,
    ) -> Result<ImageRef, ImageError> {
        let url = resolve_src(&image.src, base_url).ok_or_else(|| ImageError::InvalidUrl {
            src: image.src.clone(),
            base: base_url.to_string(),
        })?;

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| ImageError::Io {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let filename = image_filename(container, &image.alt, image.index, &url);
        let path = output_dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ImageError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(ImageRef {
            original_url: url,
            local_path: path.display().to_string(),
            alt_text: image.alt.clone(),
            filename,
        })
    }
}
