//! Per-window load state: the unit of deduplication.

use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::{Args, ResourceHandle, WindowHandle};

/// Callback run once a window is ready.
pub type Callback = Box<dyn FnOnce(&WindowHandle, &Args) + Send>;

/// Where a load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Registered, the load task has not run yet.
    Queued,
    /// Fetching the dependency manifest.
    Manifest,
    /// Fetching dependency `index` of `total`.
    Dependency {
        /// Zero-based position in the manifest.
        index: usize,
        /// Manifest length.
        total: usize,
    },
    /// Fetching the window's own resource.
    Resource,
    /// Building the controller and visual.
    Instantiating,
    /// The window exists; `on_init`, the deferred open and the queued work
    /// are running. Calls made meanwhile still queue.
    Initializing,
    /// Dynamic placeholder waiting for its template.
    AwaitingTemplate,
}

/// Lifecycle status of a window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not ready yet; the window exists only in the `Initializing` phase.
    Loading(LoadPhase),
    /// The window exists (open or not).
    Loaded,
    /// The load failed; the state has left the registry.
    Failed,
    /// The window was destroyed; the state has left the registry.
    Destroyed,
}

/// The open request a load applies when it completes. Later calls overwrite
/// earlier ones.
#[derive(Debug, Clone, Default)]
pub struct PendingOpen {
    /// Open once the window exists.
    pub(crate) open_when_finish: bool,
    /// Arguments for that open.
    pub(crate) args: Args,
    /// An open or close arrived since the record was last taken.
    pub(crate) changed: bool,
}

/// Work queued on a loading window.
pub enum Pending {
    /// User callback from `call_ui`.
    Call {
        /// The callback.
        callback: Callback,
        /// Arguments captured at submission.
        args: Args,
    },
    /// Clone this (template) window into the named dynamic instance.
    CloneTo {
        /// Registry name of the placeholder to fill.
        instance: String,
    },
}

/// Mutable half of a [`WindowState`].
pub struct LoadState {
    /// Template (resource) name.
    pub(crate) template: String,
    /// Registry name; equals `template` for static windows.
    pub(crate) instance: String,
    /// Static windows survive close.
    pub(crate) is_static: bool,
    /// Lifecycle status.
    pub(crate) status: LoadStatus,
    /// Open request applied when loading completes.
    pub(crate) pending_open: PendingOpen,
    /// Work waiting for the window, FIFO.
    pub(crate) pending: VecDeque<Pending>,
    /// The window, once instantiated.
    pub(crate) window: Option<WindowHandle>,
    /// Main resource; `None` for clones.
    pub(crate) resource: Option<ResourceHandle>,
    /// Dependencies fetched so far, in manifest order.
    pub(crate) dependencies: Vec<ResourceHandle>,
}

impl LoadState {
    /// True while no window exists yet.
    pub(crate) fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading(_))
    }
}

/// Shared handle to one registry entry.
///
/// This is what `open`, `open_dynamic` and `call_ui` hand back: while the
/// window is being fetched, [`WindowState::window`] is `None`.
#[derive(Clone)]
pub struct WindowState {
    /// The entry itself.
    inner: Arc<Mutex<LoadState>>,
}

impl WindowState {
    /// State for a static window, which is its own template.
    pub(crate) fn new_static(name: &str, open_when_finish: bool, args: Args) -> Self {
        Self::build(name, name, true, LoadPhase::Queued, open_when_finish, args)
    }

    /// Placeholder for a dynamic instance whose template may still be loading.
    pub(crate) fn new_dynamic(template: &str, instance: &str, args: Args) -> Self {
        Self::build(
            template,
            instance,
            false,
            LoadPhase::AwaitingTemplate,
            true,
            args,
        )
    }

    /// Common constructor.
    fn build(
        template: &str,
        instance: &str,
        is_static: bool,
        phase: LoadPhase,
        open_when_finish: bool,
        args: Args,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LoadState {
                template: template.to_string(),
                instance: instance.to_string(),
                is_static,
                status: LoadStatus::Loading(phase),
                pending_open: PendingOpen {
                    open_when_finish,
                    args,
                    changed: false,
                },
                pending: VecDeque::new(),
                window: None,
                resource: None,
                dependencies: Vec::new(),
            })),
        }
    }

    /// Lock the state. Never hold this across an await or a controller hook.
    pub(crate) fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.inner.lock()
    }

    /// Record load progress; ignored once the load has ended.
    pub(crate) fn set_phase(&self, phase: LoadPhase) {
        let mut st = self.lock();
        if st.is_loading() {
            st.status = LoadStatus::Loading(phase);
        }
    }

    /// True when both handles refer to the same registry entry.
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Template (resource) name.
    pub fn template_name(&self) -> String {
        self.lock().template.clone()
    }

    /// Registry name.
    pub fn instance_name(&self) -> String {
        self.lock().instance.clone()
    }

    /// Static windows are singletons; dynamic ones are clones destroyed on close.
    pub fn is_static(&self) -> bool {
        self.lock().is_static
    }

    /// Current status.
    pub fn status(&self) -> LoadStatus {
        self.lock().status
    }

    /// True while the window does not exist yet.
    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    /// The window, once loaded.
    pub fn window(&self) -> Option<WindowHandle> {
        self.lock().window.clone()
    }

    /// Whether load completion will open the window.
    pub fn open_when_finish(&self) -> bool {
        self.lock().pending_open.open_when_finish
    }

    /// Arguments the deferred open will use.
    pub fn open_args(&self) -> Args {
        self.lock().pending_open.args.clone()
    }

    /// Number of callbacks and clones waiting for the load.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// The window's resource handle (static windows only; clones share their template's).
    pub fn resource(&self) -> Option<ResourceHandle> {
        self.lock().resource.clone()
    }
}

impl fmt::Debug for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock();
        f.debug_struct("WindowState")
            .field("template", &st.template)
            .field("instance", &st.instance)
            .field("is_static", &st.is_static)
            .field("status", &st.status)
            .field("open_when_finish", &st.pending_open.open_when_finish)
            .field("pending", &st.pending.len())
            .finish_non_exhaustive()
    }
}
