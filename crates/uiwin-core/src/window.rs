//! Handle to a live window: its controller, visual and open bookkeeping.

use std::{
    any::Any,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, ThreadId},
};

use parking_lot::Mutex;

use crate::{Asset, Error, Visual, WindowController, WindowInfo};

/// Cheap, clonable handle to an instantiated window.
///
/// The registry entry owns the window; handles given to callbacks and event
/// listeners stay valid after destruction but report [`is_destroyed`].
///
/// [`is_destroyed`]: WindowHandle::is_destroyed
#[derive(Clone)]
pub struct WindowHandle {
    /// Shared window data.
    inner: Arc<WindowInner>,
}

/// Data shared by every handle to one window.
struct WindowInner {
    /// Template and instance names.
    info: WindowInfo,
    /// Host controller.
    controller: Mutex<Box<dyn WindowController>>,
    /// Thread currently running a hook, if any.
    hook_thread: Mutex<Option<ThreadId>>,
    /// Toolkit object; owns the active flag.
    visual: Mutex<Visual>,
    /// Bumped by every open and close; an open gate only activates the
    /// window if no later transition happened.
    open_epoch: AtomicU64,
    /// Set once by destroy.
    destroyed: AtomicBool,
}

impl WindowHandle {
    /// Wrap a freshly built controller and visual.
    pub(crate) fn new(
        template: &str,
        instance: &str,
        controller: Box<dyn WindowController>,
        visual: Visual,
    ) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                info: WindowInfo {
                    template: template.to_string(),
                    instance: instance.to_string(),
                },
                controller: Mutex::new(controller),
                hook_thread: Mutex::new(None),
                visual: Mutex::new(visual),
                open_epoch: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Template and instance names.
    pub fn info(&self) -> &WindowInfo {
        &self.inner.info
    }

    /// Template this window was built from.
    pub fn template_name(&self) -> &str {
        &self.inner.info.template
    }

    /// Registry name of this window.
    pub fn instance_name(&self) -> &str {
        &self.inner.info.instance
    }

    /// Whether the window is shown.
    pub fn is_active(&self) -> bool {
        self.inner.visual.lock().is_active()
    }

    /// Whether the window has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Resource backing this window (shared by all clones of a template).
    pub fn asset(&self) -> Asset {
        self.inner.visual.lock().asset().clone()
    }

    /// Snapshot of the visual object.
    pub fn visual(&self) -> Visual {
        self.inner.visual.lock().clone()
    }

    /// Run `f` with the controller locked.
    ///
    /// Returns `None`, logging a programming error, when called from inside
    /// one of this window's own hooks.
    pub fn with_controller<R>(
        &self,
        f: impl FnOnce(&mut dyn WindowController) -> R,
    ) -> Option<R> {
        if self.in_hook() {
            Error::Reentrant(self.instance_name().to_string()).log("with_controller");
            return None;
        }
        let mut controller = self.inner.controller.lock();
        *self.inner.hook_thread.lock() = Some(thread::current().id());
        let _hook = HookGuard(&self.inner.hook_thread);
        Some(f(controller.as_mut()))
    }

    /// Run `f` with the controller downcast to `T`; `None` on a type mismatch
    /// or a reentrant call.
    pub fn with_controller_as<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.with_controller(|c| c.as_any_mut().downcast_mut::<T>().map(f))
            .flatten()
    }

    /// Whether the current thread is inside one of this window's hooks.
    pub(crate) fn in_hook(&self) -> bool {
        *self.inner.hook_thread.lock() == Some(thread::current().id())
    }

    /// True when both handles refer to the same window.
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Show or hide.
    pub(crate) fn set_active(&self, active: bool) {
        self.inner.visual.lock().set_active(active);
    }

    /// Start an open attempt and return its epoch.
    pub(crate) fn begin_open(&self) -> u64 {
        self.inner.open_epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Make any outstanding open attempt stale.
    pub(crate) fn invalidate_open(&self) {
        self.inner.open_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether `epoch` is still the latest open attempt.
    pub(crate) fn open_is_current(&self, epoch: u64) -> bool {
        self.inner.open_epoch.load(Ordering::Acquire) == epoch
    }

    /// Tear down: stale gates, hidden, flagged.
    pub(crate) fn mark_destroyed(&self) {
        self.inner.destroyed.store(true, Ordering::Release);
        self.invalidate_open();
        self.set_active(false);
    }
}

/// Clears the hook owner when the hook returns or unwinds.
struct HookGuard<'a>(
    /// Owner slot to clear.
    &'a Mutex<Option<ThreadId>>,
);

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle")
            .field("template", &self.inner.info.template)
            .field("instance", &self.inner.info.instance)
            .field("active", &self.is_active())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
