//! Loader-facing types: the [`AssetLoader`] collaborator and the handles it produces.

use std::{any::Any, fmt, sync::Arc};

use async_trait::async_trait;

use crate::LoadError;

/// An opaque loaded resource.
///
/// Cloning is cheap and shares the underlying object; [`Asset::same`] tells
/// whether two handles point at the same load.
#[derive(Clone)]
pub struct Asset(
    /// The loaded object.
    Arc<dyn Any + Send + Sync>,
);

impl Asset {
    /// Wrap a loaded object.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the object as `T`, if that is what was loaded.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// True when both handles share one loaded object.
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Asset").finish_non_exhaustive()
    }
}

/// A fetched resource together with the loader path it came from, so it can
/// be released through the same loader later.
#[derive(Clone, Debug)]
pub struct ResourceHandle {
    /// Loader path.
    path: String,
    /// What the loader returned.
    asset: Asset,
}

impl ResourceHandle {
    /// Pair a loader path with its asset.
    pub fn new(path: impl Into<String>, asset: Asset) -> Self {
        Self {
            path: path.into(),
            asset,
        }
    }

    /// Loader path of this resource.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The loaded asset.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }
}

/// Byte and asset fetching, supplied by the host.
///
/// Each call is a suspend point of a window load. The manager never retries
/// and never times out a fetch unless `load_timeout_ms` is configured.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Fetch raw bytes (used for dependency manifests).
    async fn load_bytes(&self, path: &str) -> Result<Vec<u8>, LoadError>;

    /// Fetch a loadable asset (dependencies and window resources).
    async fn load_asset(&self, path: &str) -> Result<Asset, LoadError>;

    /// Drop whatever the loader keeps alive for `path`.
    fn release(&self, _path: &str) {}
}
