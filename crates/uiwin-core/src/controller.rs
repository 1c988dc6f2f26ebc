//! The per-window behavior contract implemented by the host.

use std::any::Any;

use serde_json::Value;
use tokio::sync::oneshot;

/// Positional, dynamically-typed arguments passed to open hooks and callbacks.
pub type Args = Vec<Value>;

/// Names a controller is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Template (resource) the window was built from.
    pub template: String,
    /// Registry name of this window; equals `template` for static windows.
    pub instance: String,
}

/// Upcast helper so typed callers can reach their concrete controller.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle hooks for one concrete window type.
///
/// Hooks run with the window's controller lock held. An open or close of the
/// same window issued synchronously from a hook is refused and logged as a
/// programming error; spawn it instead. During initialization such calls are
/// queued and applied once the hook returns.
pub trait WindowController: AsAny + Send {
    /// Runs once, right after the window is instantiated.
    fn on_init(&mut self, _info: &WindowInfo) {}

    /// Gate in front of every open. The window becomes active only once
    /// `gate` is confirmed, which may happen later (after a transition).
    /// Dropping the gate abandons the open.
    fn before_open(&mut self, _args: &Args, gate: OpenGate) {
        gate.confirm();
    }

    /// The window has just been activated.
    fn on_open(&mut self, _args: &Args) {}

    /// The window is closing (or being re-opened while open).
    fn on_close(&mut self) {}
}

/// Continuation handed to [`WindowController::before_open`].
#[derive(Debug)]
pub struct OpenGate {
    /// Signals the waiting manager.
    tx: oneshot::Sender<()>,
}

impl OpenGate {
    /// Create a gate and the receiver the manager waits on.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Let the open proceed.
    pub fn confirm(self) {
        // The manager may have stopped waiting.
        self.tx.send(()).ok();
    }
}
