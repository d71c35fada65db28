//! On-disk storage layout.
//!
//! ```text
//! storage/
//!   uploads/<media_id>/     original inputs
//!   processed/<job_id>/     rendered outputs (edited_<AR>.mp4)
//!   temp/<media_id>/        download caches and working files
//! ```

use std::path::{Path, PathBuf};

use recut_models::AspectRatio;

/// Resolves the storage tree rooted at `STORAGE_DIR`.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn from_env() -> Self {
        let root = std::env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Original inputs for one media item.
    pub fn uploads_dir(&self, media_id: &str) -> PathBuf {
        self.root.join("uploads").join(media_id)
    }

    /// Rendered outputs for one job (or media).
    pub fn processed_dir(&self, owner_id: &str) -> PathBuf {
        self.root.join("processed").join(owner_id)
    }

    /// Download caches and working files for one media item.
    pub fn temp_dir(&self, media_id: &str) -> PathBuf {
        self.root.join("temp").join(media_id)
    }

    /// Root of the temp tree (handed to the blob fetcher).
    pub fn temp_root(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Canonical render output path for one aspect ratio.
    pub fn render_output(&self, owner_id: &str, aspect: AspectRatio) -> PathBuf {
        self.processed_dir(owner_id)
            .join(format!("edited_{}.mp4", aspect.as_label()))
    }

    /// Convert a path under the root into a `/storage/`-rooted URL.
    pub fn public_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(format!("/storage/{}", relative.to_string_lossy()))
    }
}
