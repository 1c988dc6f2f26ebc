//! Dependency manifests: newline-separated loader paths, UTF-8.

use std::str::{self, Utf8Error};

/// Parsed dependency list for one window bundle, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Dependency names in load order.
    deps: Vec<String>,
}

impl Manifest {
    /// Parse manifest bytes.
    ///
    /// Empty lines are skipped, a trailing `\r` on each line and a leading
    /// byte-order mark are stripped.
    pub fn parse(bytes: &[u8]) -> Result<Self, Utf8Error> {
        let text = str::from_utf8(bytes)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let deps = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { deps })
    }

    /// Dependencies in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(String::as_str)
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    /// True when the bundle has no dependencies.
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}
