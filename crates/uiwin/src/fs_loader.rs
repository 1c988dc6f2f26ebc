//! [`AssetLoader`] that reads bundle files from a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, trace};
use uiwin_core::{Asset, AssetLoader, LoadError};

/// Raw contents of a loaded bundle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    /// Path relative to the bundle directory.
    pub path: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Loads bundle paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    /// Bundle directory.
    root: PathBuf,
}

impl FsLoader {
    /// Loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bundle directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a bundle path.
    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl AssetLoader for FsLoader {
    async fn load_bytes(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let full = self.resolve(path);
        trace!(path = %full.display(), "reading");
        Ok(fs::read(&full).await?)
    }

    async fn load_asset(&self, path: &str) -> Result<Asset, LoadError> {
        let bytes = self.load_bytes(path).await?;
        Ok(Asset::new(BundleFile {
            path: path.to_string(),
            bytes,
        }))
    }

    fn release(&self, path: &str) {
        debug!(path, "released");
    }
}
