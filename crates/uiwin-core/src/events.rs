//! Lifecycle notifications fanned out to any number of listeners.

use crate::WindowHandle;

/// Lifecycle event payloads.
#[derive(Clone, Debug)]
pub enum WindowEvent {
    /// `on_init` has run for a freshly instantiated window.
    Initialized(WindowHandle),
    /// The window was activated and `on_open` has run.
    Opened(WindowHandle),
    /// The window was deactivated and `on_close` has run.
    Closed(WindowHandle),
    /// Loading the named window failed; it will not appear.
    LoadFailed {
        /// Registry name of the window.
        name: String,
        /// Rendered error.
        reason: String,
    },
}

impl WindowEvent {
    /// Registry name of the window the event is about.
    pub fn name(&self) -> &str {
        match self {
            Self::Initialized(w) | Self::Opened(w) | Self::Closed(w) => w.instance_name(),
            Self::LoadFailed { name, .. } => name,
        }
    }

    /// The window, for events that carry one.
    pub fn window(&self) -> Option<&WindowHandle> {
        match self {
            Self::Initialized(w) | Self::Opened(w) | Self::Closed(w) => Some(w),
            Self::LoadFailed { .. } => None,
        }
    }

    /// Short tag, handy for logs and assertions.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "init",
            Self::Opened(_) => "open",
            Self::Closed(_) => "close",
            Self::LoadFailed { .. } => "failed",
        }
    }
}
