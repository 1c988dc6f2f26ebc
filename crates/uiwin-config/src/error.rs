//! Error types for configuration loading and validation.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading, parsing, or validating a configuration.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// RON syntax or shape error.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// Human-readable error message, including the parser's location.
        message: String,
    },
    #[error("{message}")]
    /// A value parsed but is not usable.
    Validation {
        /// Optional path associated with the validation error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly error message including the file path when known.
    pub fn pretty(&self) -> String {
        let (kind, path, message) = match self {
            Self::Read { path, message } => ("Read", path, message),
            Self::Parse { path, message } => ("Parse", path, message),
            Self::Validation { path, message } => ("Validation", path, message),
        };
        match path {
            Some(p) => format!("{kind} error at {}: {message}", p.display()),
            None => format!("{kind} error: {message}"),
        }
    }

    /// Attach a path to errors that were produced without one.
    pub(crate) fn with_path(self, p: &Path) -> Self {
        let fill = |path: Option<PathBuf>| path.or_else(|| Some(p.to_path_buf()));
        match self {
            Self::Read { path, message } => Self::Read {
                path: fill(path),
                message,
            },
            Self::Parse { path, message } => Self::Parse {
                path: fill(path),
                message,
            },
            Self::Validation { path, message } => Self::Validation {
                path: fill(path),
                message,
            },
        }
    }
}
