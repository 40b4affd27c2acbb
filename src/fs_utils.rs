use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

/// Replace `path` with `contents` without ever leaving a half-written file.
///
/// Writes and syncs a sibling temp file, then renames it over the target, so
/// readers see either the old or the new contents and the new contents are on
/// disk once this returns.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("Failed to create temp file: {}", tmp_path.display()))?;
    file.write_all(contents)
        .await
        .with_context(|| format!("Failed to write temp file: {}", tmp_path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync temp file: {}", tmp_path.display()))?;
    drop(file);

    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move temp file into place: {}", path.display()))?;

    Ok(())
}

/// Remove a file, returning whether it existed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(anyhow::Error::new(e)).context(format!("Failed to remove {}", path.display()))
        }
    }
}
