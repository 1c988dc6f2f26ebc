//! Parse and load configuration files.

use std::{ffi::OsStr, fs, path::Path};

use crate::{Error, UiConfig};

/// Parse a configuration from RON text.
pub fn from_ron(text: &str) -> Result<UiConfig, Error> {
    let cfg: UiConfig = ron::from_str(text).map_err(|e| Error::Parse {
        path: None,
        message: e.to_string(),
    })?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load a validated `UiConfig` from a RON file at `path`.
pub fn load_from_path(path: &Path) -> Result<UiConfig, Error> {
    if path.extension() != Some(OsStr::new("ron")) {
        return Err(Error::Read {
            path: Some(path.to_path_buf()),
            message: "Unsupported config format (expected a .ron file)".to_string(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    let cfg = from_ron(&text).map_err(|e| e.with_path(path))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}
