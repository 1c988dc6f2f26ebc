//! Configuration for the uiwin window lifecycle manager.
//!
//! The on-disk format is RON:
//!
//! ```ron
//! (
//!     bridge: Some("ugui"),
//!     bundle_root: "BundleResources/NGUI",
//!     asset_ext: ".bytes",
//!     load_timeout_ms: Some(5000),
//! )
//! ```
//!
//! Every field is optional; omitted fields take the defaults of [`UiConfig`].

use std::{
    env,
    path::{Path, PathBuf},
};

mod error;
mod loader;
mod ui;

pub use error::Error;
pub use loader::{from_ron, load_from_path};
pub use ui::{NameConvention, UiConfig};

/// Determine the preferred user config path (`~/.uiwin/config.ron`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".uiwin");
    p.push("config.ron");
    p
}

/// Resolve the effective config path.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else use `~/.uiwin/config.ron` when it exists.
/// 3) Else `None`: callers run with [`UiConfig::default`].
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let preferred = default_config_path();
    preferred.exists().then_some(preferred)
}

/// Load the effective configuration, falling back to defaults when no file is found.
pub fn load_effective(explicit: Option<&Path>) -> Result<UiConfig, Error> {
    match resolve_config_path(explicit) {
        Some(path) => load_from_path(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(UiConfig::default())
        }
    }
}
