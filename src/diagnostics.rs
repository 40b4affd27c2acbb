//! Raw page snapshots captured in debug mode.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::naming::snapshot_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Detail page could not be loaded.
    NavigationError,
    /// Detail page parsed but no answer was accepted.
    NoAccepted,
    /// Processing the detail page failed unexpectedly.
    ExtractionError,
}

impl SnapshotKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::NavigationError => "nav_error",
            Self::NoAccepted => "no_accepted",
            Self::ExtractionError => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    enabled: bool,
    dir: PathBuf,
}

impl Diagnostics {
    #[must_use]
    pub fn new(enabled: bool, dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            dir: dir.into(),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, PathBuf::new())
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn path_for(&self, kind: SnapshotKind, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.html", kind.prefix(), snapshot_name(url)))
    }

    /// Write `html` for `url` when enabled. Failures are logged, never returned.
    pub async fn snapshot(&self, kind: SnapshotKind, url: &str, html: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match self.write(kind, url, html).await {
            Ok(path) => {
                debug!(path = %path.display(), kind = kind.prefix(), "Saved diagnostic snapshot");
                Some(path)
            }
            Err(e) => {
                warn!(url, "Failed to save diagnostic snapshot: {e:#}");
                None
            }
        }
    }

    async fn write(&self, kind: SnapshotKind, url: &str, html: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(kind, url);
        tokio::fs::write(&path, html)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
