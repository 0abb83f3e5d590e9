//! Local file access
//!
//! Patch files are read through [`LocalFiles`] so the upgrader can run against a
//! checkout on disk ([`FsLocalFiles`]) or an in-memory tree in tests.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::FileError;

/// Read-only view of repository files
#[async_trait]
pub trait LocalFiles: Send + Sync {
    /// Read `path` relative to the repository root; `None` if it cannot be read
    async fn read(&self, path: &str) -> Option<Vec<u8>>;
}

/// [`LocalFiles`] rooted at a directory
#[derive(Debug, Clone)]
pub struct FsLocalFiles {
    root: PathBuf,
}

impl FsLocalFiles {
    /// Create file access rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root
    ///
    /// # Errors
    /// Returns [`FileError::OutsideRoot`] for absolute paths and paths with `..`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, FileError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(FileError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Write `contents` to `path`, creating parent directories
    ///
    /// # Errors
    /// Returns [`FileError`] if the path is rejected or the write fails.
    pub async fn write(&self, path: &str, contents: &[u8]) -> Result<(), FileError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::io(parent, e))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| FileError::io(&target, e))
    }
}

#[async_trait]
impl LocalFiles for FsLocalFiles {
    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        let target = match self.resolve(path) {
            Ok(target) => target,
            Err(err) => {
                tracing::debug!(path, error = %err, "refusing to read");
                return None;
            }
        };
        match tokio::fs::read(&target).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::debug!(path = %target.display(), error = %err, "local file not readable");
                None
            }
        }
    }
}
