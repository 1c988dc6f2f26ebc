//! The `UiConfig` type and its path helpers.

use serde::{Deserialize, Serialize};

use crate::Error;

/// How a controller type's short name maps to a window registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameConvention {
    /// Drop this many leading characters (`KUILogin` -> `Login` with 3).
    StripPrefix(usize),
    /// Use the type name unchanged.
    Exact,
}

impl Default for NameConvention {
    fn default() -> Self {
        Self::StripPrefix(3)
    }
}

impl NameConvention {
    /// Apply the convention to a short type name.
    ///
    /// Names shorter than the prefix are returned unchanged rather than emptied.
    pub fn apply(self, type_name: &str) -> String {
        match self {
            Self::Exact => type_name.to_string(),
            Self::StripPrefix(n) => match type_name.char_indices().nth(n) {
                Some((idx, _)) => type_name[idx..].to_string(),
                None => type_name.to_string(),
            },
        }
    }
}

/// Window manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    /// Name of the UI bridge to install; `None` selects the passthrough bridge.
    pub bridge: Option<String>,
    /// Directory (loader-relative) holding window bundles and their manifests.
    pub bundle_root: String,
    /// Extension appended to every bundle path, dependencies included.
    pub asset_ext: String,
    /// Type-name to window-name convention used by typed registrations.
    pub name_convention: NameConvention,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
    /// Abort a window load whose fetches take longer than this. `None` waits forever.
    pub load_timeout_ms: Option<u64>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bridge: None,
            bundle_root: "BundleResources/NGUI".to_string(),
            asset_ext: ".bytes".to_string(),
            name_convention: NameConvention::default(),
            event_capacity: 256,
            load_timeout_ms: None,
        }
    }
}

impl UiConfig {
    /// Path of the dependency manifest for window template `name`.
    pub fn manifest_path(&self, name: &str) -> String {
        format!(
            "{}/{}.prefab.manifest{}",
            self.bundle_root, name, self.asset_ext
        )
    }

    /// Path of the main resource for window template `name`.
    pub fn resource_path(&self, name: &str) -> String {
        format!("{}/{}.prefab{}", self.bundle_root, name, self.asset_ext)
    }

    /// Path of a dependency listed in a manifest.
    pub fn dependency_path(&self, dep: &str) -> String {
        format!("{}{}", dep, self.asset_ext)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), Error> {
        if self.event_capacity == 0 {
            return Err(Error::Validation {
                path: None,
                message: "event_capacity must be at least 1".to_string(),
            });
        }
        if self.load_timeout_ms == Some(0) {
            return Err(Error::Validation {
                path: None,
                message: "load_timeout_ms must be positive; omit it to disable the timeout"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_convention() {
        assert_eq!(NameConvention::StripPrefix(3).apply("KUILogin"), "Login");
        assert_eq!(NameConvention::StripPrefix(3).apply("UI"), "UI");
        assert_eq!(NameConvention::Exact.apply("KUILogin"), "KUILogin");
    }

    #[test]
    fn default_paths() {
        let cfg = UiConfig::default();
        assert_eq!(
            cfg.manifest_path("Login"),
            "BundleResources/NGUI/Login.prefab.manifest.bytes"
        );
        assert_eq!(
            cfg.resource_path("Login"),
            "BundleResources/NGUI/Login.prefab.bytes"
        );
        assert_eq!(cfg.dependency_path("atlas/common"), "atlas/common.bytes");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let cfg = UiConfig {
            event_capacity: 0,
            ..UiConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Validation { .. })));
    }
}
