//! Error handling for the uiwin binary.

use std::{io, result};

use thiserror::Error;
use uiwin_core::LoadError;

/// Convenient result type for uiwin operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running a script.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Configuration parsing or resolution errors.
    #[error("Configuration error: {}", .0.pretty())]
    Config(#[from] uiwin_config::Error),
    /// A script step could not be parsed.
    #[error("Invalid step `{step}`: {message}")]
    Step {
        /// The step as written.
        step: String,
        /// What is wrong with it.
        message: String,
    },
    /// No steps were supplied to `run`.
    #[error("No steps supplied; pass e.g. `open:Login wait:100ms close:Login`")]
    NoSteps,
    /// Fetching a bundle file failed.
    #[error("Failed to load `{path}`: {source}")]
    Load {
        /// Loader path.
        path: String,
        /// Loader failure.
        #[source]
        source: LoadError,
    },
    /// A manifest was not valid UTF-8.
    #[error("Invalid manifest `{0}`")]
    Manifest(String),
    /// One or more windows failed to load during the run.
    #[error("{} window(s) failed to load: {}", .0.len(), .0.join(", "))]
    LoadFailed(Vec<String>),
}

impl Error {
    /// Build a step error.
    pub fn step(step: &str, message: impl Into<String>) -> Self {
        Self::Step {
            step: step.to_string(),
            message: message.into(),
        }
    }
}
