//! Small filesystem helpers.

use std::path::Path;

use crate::error::MediaResult;

/// Create a directory and its parents if missing.
pub async fn ensure_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

/// File size in bytes, or 0 when the file is missing.
pub async fn file_size(path: impl AsRef<Path>) -> u64 {
    tokio::fs::metadata(path.as_ref())
        .await
        .map(|m| m.len())
        .unwrap_or(0)
}
