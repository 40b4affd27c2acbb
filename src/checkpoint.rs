//! Per-target progress persistence.
//!
//! A checkpoint records the last list page whose threads were all handled and
//! the most recent URL touched. Resuming starts at the page after it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fs_utils::{remove_if_exists, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_completed_page: u32,
    pub last_url: String,
    pub timestamp: DateTime<Utc>,
}

/// Checkpoint and result files of every target live in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, base: &str) -> PathBuf {
        self.dir.join(format!("{base}_checkpoint.json"))
    }

    /// Persist progress for `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, base: &str, last_completed_page: u32, last_url: &str) -> Result<()> {
        let checkpoint = Checkpoint {
            last_completed_page,
            last_url: last_url.to_string(),
            timestamp: Utc::now(),
        };
        let path = self.path_for(base);
        let json = serde_json::to_vec_pretty(&checkpoint).context("Failed to encode checkpoint")?;
        write_atomic(&path, &json).await?;
        debug!(page = last_completed_page, url = %last_url, "Checkpoint saved");
        Ok(())
    }

    /// Load progress for `base`.
    ///
    /// A missing or unreadable checkpoint means no progress: `(0, "")`.
    pub async fn load(&self, base: &str) -> (u32, String) {
        let path = self.path_for(base);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (0, String::new()),
            Err(e) => {
                warn!(path = %path.display(), "Failed to read checkpoint: {e}");
                return (0, String::new());
            }
        };

        match serde_json::from_slice::<Checkpoint>(&bytes) {
            Ok(checkpoint) => {
                info!(
                    page = checkpoint.last_completed_page,
                    url = %checkpoint.last_url,
                    saved_at = %checkpoint.timestamp,
                    "Loaded checkpoint"
                );
                (checkpoint.last_completed_page, checkpoint.last_url)
            }
            Err(e) => {
                warn!(path = %path.display(), "Ignoring corrupt checkpoint: {e}");
                (0, String::new())
            }
        }
    }

    /// Delete the checkpoint and result files of `base`. Returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub async fn reset(&self, base: &str) -> Result<usize> {
        let paths = [
            self.path_for(base),
            self.dir.join(format!("{base}_accepted.json")),
            self.dir.join(format!("{base}_no_accepted.json")),
            self.dir.join(format!("{base}.csv")),
        ];

        let mut removed = 0;
        for path in &paths {
            if remove_if_exists(path).await? {
                debug!(path = %path.display(), "Removed");
                removed += 1;
            }
        }
        info!(base, removed, "Progress reset");
        Ok(removed)
    }
}
