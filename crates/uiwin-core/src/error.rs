//! Error types for the lifecycle manager and its loaders.

use std::{io, result::Result as StdResult, str::Utf8Error};

use thiserror::Error;
use tracing::{error, warn};

/// Convenient result type for the lifecycle crate.
pub type Result<T> = StdResult<T, Error>;

/// Failure reported by an [`AssetLoader`](crate::AssetLoader) fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The loader has nothing at the requested path.
    #[error("not found")]
    NotFound,
    /// I/O failure while reading the resource.
    #[error("I/O error: {0}")]
    Io(String),
    /// Any other loader-specific failure.
    #[error("{0}")]
    Other(String),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Broad classes of failure. They decide the log level; none of them is
/// ever returned past the manager boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse: duplicate registration, unknown type, bad instance
    /// name, a hook re-entering its own window.
    Programming,
    /// A fetch or timeout that is fatal to one window load.
    Resource,
    /// Harmless no-op on a window in the wrong state.
    State,
}

/// Unified error type for the lifecycle manager.
#[derive(Debug, Error)]
pub enum Error {
    /// A load was requested for a name that already has a state.
    #[error("window `{0}` is already registered")]
    Duplicate(String),

    /// No controller factory is registered under this template name.
    #[error("no controller type registered for window `{0}`")]
    UnknownWindowType(String),

    /// The dynamic path was asked about a name it has never seen.
    #[error("no window state for `{0}`")]
    UnknownWindow(String),

    /// A dynamic instance must not reuse its template's name.
    #[error("dynamic instance name `{0}` must differ from its template")]
    InvalidInstance(String),

    /// The loader failed to fetch `path`.
    #[error("failed to load `{path}`: {source}")]
    Load {
        /// Loader path that failed.
        path: String,
        /// Loader failure.
        #[source]
        source: LoadError,
    },

    /// A manifest was not valid UTF-8.
    #[error("invalid manifest `{path}`: {source}")]
    Manifest {
        /// Manifest path.
        path: String,
        /// Decoding failure.
        #[source]
        source: Utf8Error,
    },

    /// A controller hook called back into its own window.
    #[error("a hook of window `{0}` called back into the same window")]
    Reentrant(String),

    /// The configured load timeout elapsed.
    #[error("loading `{name}` timed out after {ms}ms")]
    Timeout {
        /// Window template name.
        name: String,
        /// Timeout that elapsed, in milliseconds.
        ms: u64,
    },

    /// The window has no state in the registry.
    #[error("window `{0}` is not loaded")]
    NotRegistered(String),

    /// The window was already torn down.
    #[error("window `{0}` has been destroyed")]
    AlreadyDestroyed(String),

    /// The operation needs a loaded window.
    #[error("window `{0}` is still loading")]
    StillLoading(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Duplicate(_)
            | Self::UnknownWindowType(_)
            | Self::UnknownWindow(_)
            | Self::InvalidInstance(_)
            | Self::Reentrant(_) => ErrorKind::Programming,
            Self::Load { .. } | Self::Manifest { .. } | Self::Timeout { .. } => {
                ErrorKind::Resource
            }
            Self::NotRegistered(_) | Self::AlreadyDestroyed(_) | Self::StillLoading(_) => {
                ErrorKind::State
            }
        }
    }

    /// Log at the level matching [`Error::kind`], tagged with the operation.
    pub(crate) fn log(&self, op: &'static str) {
        match self.kind() {
            ErrorKind::Programming => error!(op, error = %self, "programming error"),
            ErrorKind::Resource => error!(op, error = %self, "window load failed"),
            ErrorKind::State => warn!(op, error = %self, "ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Error::Duplicate("A".into()).kind(), ErrorKind::Programming);
        assert_eq!(
            Error::Load {
                path: "p".into(),
                source: LoadError::NotFound
            }
            .kind(),
            ErrorKind::Resource
        );
        assert_eq!(Error::NotRegistered("A".into()).kind(), ErrorKind::State);
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(LoadError::from(err), LoadError::NotFound);
    }
}
