//! The lifecycle manager: registry owner and open/close state machine.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    mem,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::{Mutex, MutexGuard};
use tokio::{
    runtime::Handle,
    sync::{broadcast, oneshot::error::TryRecvError},
};
use tracing::{debug, error, info, trace, warn};
use uiwin_config::{NameConvention, UiConfig};

use crate::{
    Args, AssetLoader, Error, LoadPhase, LoadStatus, OpenGate, PassthroughBridge, UiBridge,
    WindowController, WindowEvent, WindowHandle, WindowState, WindowTypes, dynamic, load_task,
    registry::Registry,
    state::{Pending, PendingOpen},
    types::short_type_name,
};

/// Deferred typed registration, resolved against the final naming convention.
type TypedRegistration = Box<dyn FnOnce(&mut WindowTypes, NameConvention) + Send>;

/// Builder for [`UiManager`].
pub struct UiManagerBuilder {
    /// Asset source.
    loader: Arc<dyn AssetLoader>,
    /// Configuration; defaults unless replaced.
    config: UiConfig,
    /// Candidate bridges by name.
    bridges: HashMap<String, Arc<dyn UiBridge>>,
    /// Explicitly named registrations.
    types: WindowTypes,
    /// Registrations named by type, applied in `build`.
    typed: Vec<TypedRegistration>,
}

impl UiManagerBuilder {
    /// Replace the default configuration.
    pub fn config(mut self, config: UiConfig) -> Self {
        self.config = config;
        self
    }

    /// Make a bridge available under `name`; `UiConfig::bridge` picks one.
    pub fn bridge(mut self, name: impl Into<String>, bridge: impl UiBridge + 'static) -> Self {
        self.bridges.insert(name.into(), Arc::new(bridge));
        self
    }

    /// Register controller type `T` under an explicit window name.
    pub fn window<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: WindowController,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.types.register(name, factory);
        self
    }

    /// Register controller type `T` under the name its type name maps to.
    pub fn window_type<T, F>(mut self, factory: F) -> Self
    where
        T: WindowController,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.typed.push(Box::new(move |types, convention| {
            types.register_type(convention, factory);
        }));
        self
    }

    /// Select the bridge, initialize it and build the manager.
    pub fn build(self) -> UiManager {
        let Self {
            loader,
            config,
            bridges,
            mut types,
            typed,
        } = self;
        for register in typed {
            register(&mut types, config.name_convention);
        }
        let bridge = select_bridge(config.bridge.as_deref(), bridges);
        bridge.init_bridge();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        debug!(windows = ?types.names(), "ui manager ready");
        UiManager {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                loader,
                bridge,
                types,
                config,
                events,
                loading: AtomicUsize::new(0),
            }),
        }
    }
}

/// Pick the configured bridge. With nothing configured, a single registered
/// bridge is used, otherwise the passthrough bridge.
fn select_bridge(
    name: Option<&str>,
    mut bridges: HashMap<String, Arc<dyn UiBridge>>,
) -> Arc<dyn UiBridge> {
    match name {
        Some(name) => match bridges.remove(name) {
            Some(bridge) => {
                debug!(bridge = name, "using UI bridge");
                bridge
            }
            None => {
                error!(bridge = name, "cannot find UI bridge; using passthrough");
                Arc::new(PassthroughBridge)
            }
        },
        None if bridges.len() == 1 => {
            let (name, bridge) = bridges.into_iter().next().unzip();
            debug!(bridge = name.as_deref(), "using the only registered UI bridge");
            bridge.unwrap_or_else(|| Arc::new(PassthroughBridge))
        }
        None => Arc::new(PassthroughBridge),
    }
}

/// Shared state behind every [`UiManager`] clone.
struct Inner {
    /// All known windows. Locked before any window state.
    registry: Mutex<Registry>,
    /// Asset source.
    loader: Arc<dyn AssetLoader>,
    /// Selected toolkit bridge.
    bridge: Arc<dyn UiBridge>,
    /// Controller factories.
    types: WindowTypes,
    /// Active configuration.
    config: UiConfig,
    /// Lifecycle event fan-out.
    events: broadcast::Sender<WindowEvent>,
    /// Load tasks currently running.
    loading: AtomicUsize,
}

/// Cheap, clonable handle to the window lifecycle manager.
///
/// Operations are synchronous: they update the registry and spawn load tasks
/// on the ambient tokio runtime. A current-thread runtime gives the
/// single-scheduler semantics the state machine is designed for. Failures are
/// logged, never returned.
#[derive(Clone)]
pub struct UiManager {
    /// Shared manager state.
    inner: Arc<Inner>,
}

impl UiManager {
    /// Start building a manager around `loader`.
    pub fn builder(loader: Arc<dyn AssetLoader>) -> UiManagerBuilder {
        UiManagerBuilder {
            loader,
            config: UiConfig::default(),
            bridges: HashMap::new(),
            types: WindowTypes::new(),
            typed: Vec::new(),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.inner.events.subscribe()
    }

    /// Active configuration.
    pub fn config(&self) -> &UiConfig {
        &self.inner.config
    }

    /// Registered window types.
    pub fn types(&self) -> &WindowTypes {
        &self.inner.types
    }

    // ----- queries -----

    /// Registry entry for `name`.
    pub fn state(&self, name: &str) -> Option<WindowState> {
        self.registry().get(name)
    }

    /// The window for `name`, once loaded.
    pub fn window(&self, name: &str) -> Option<WindowHandle> {
        self.state(name)?.window()
    }

    /// Whether `name` has a state (loading or loaded).
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry().contains(name)
    }

    /// Whether `name` is registered and its window exists.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.state(name)
            .is_some_and(|s| s.status() == LoadStatus::Loaded)
    }

    /// Whether `name` is registered, loaded and active.
    pub fn is_open(&self, name: &str) -> bool {
        self.window(name).is_some_and(|w| w.is_active())
    }

    /// Typed [`UiManager::is_open`].
    pub fn is_open_as<T: WindowController>(&self) -> bool {
        self.name_for::<T>("is_open_as")
            .is_some_and(|name| self.is_open(&name))
    }

    /// Where the load of `name` currently is; `None` unless loading.
    pub fn load_phase(&self, name: &str) -> Option<LoadPhase> {
        match self.state(name)?.status() {
            LoadStatus::Loading(phase) => Some(phase),
            _ => None,
        }
    }

    /// Number of load tasks in flight.
    pub fn loading_count(&self) -> usize {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// Registered names, sorted.
    pub fn window_names(&self) -> Vec<String> {
        self.registry().names()
    }

    /// Number of registered states, loading or loaded.
    pub fn window_count(&self) -> usize {
        self.registry().len()
    }

    // ----- open / close -----

    /// Register `name` and start loading it. A name that is already registered
    /// is a programming error: it is logged and `None` is returned.
    pub fn load_window(
        &self,
        name: &str,
        open_when_finish: bool,
        args: Args,
    ) -> Option<WindowState> {
        let state = WindowState::new_static(name, open_when_finish, args);
        let put = self.registry().put(name, state.clone());
        if let Err(err) = put {
            err.log("load_window");
            return None;
        }
        self.spawn_load(&state);
        Some(state)
    }

    /// Open `name`, loading it first if needed.
    ///
    /// Opening an open window cycles it (`on_close`, then the open sequence).
    pub fn open(&self, name: &str, args: Args) -> Option<WindowState> {
        let (state, created) =
            self.lookup_or_insert(name, || WindowState::new_static(name, true, args.clone()));
        if created {
            debug!(window = name, "window not loaded; loading to open");
            self.spawn_load(&state);
        } else {
            self.open_state(&state, args);
        }
        Some(state)
    }

    /// Typed [`UiManager::open`].
    pub fn open_as<T: WindowController>(&self, args: Args) -> Option<WindowState> {
        let name = self.name_for::<T>("open_as")?;
        self.open(&name, args)
    }

    /// Open a dynamic clone of `template` registered as `instance`.
    pub fn open_dynamic(&self, template: &str, instance: &str, args: Args) -> Option<WindowState> {
        dynamic::open_dynamic(self, template, instance, args)
    }

    /// Close `name`. A loading window keeps loading but will not open;
    /// dynamic windows are destroyed.
    pub fn close(&self, name: &str) {
        let Some(state) = self.state(name) else {
            Error::NotRegistered(name.to_string()).log("close");
            return;
        };
        let target = {
            let mut st = state.lock();
            match st.status {
                LoadStatus::Loading(_) => {
                    debug!(window = name, "close while loading; load continues hidden");
                    st.pending_open.open_when_finish = false;
                    st.pending_open.changed = true;
                    return;
                }
                LoadStatus::Loaded => st.window.clone().map(|w| (w, st.is_static)),
                LoadStatus::Failed | LoadStatus::Destroyed => None,
            }
        };
        match target {
            Some((window, is_static)) => self.close_window(&window, is_static),
            None => Error::AlreadyDestroyed(name.to_string()).log("close"),
        }
    }

    /// Typed [`UiManager::close`].
    pub fn close_as<T: WindowController>(&self) {
        if let Some(name) = self.name_for::<T>("close_as") {
            self.close(&name);
        }
    }

    /// Close `name` when open, open it otherwise.
    pub fn toggle(&self, name: &str, args: Args) {
        if self.is_open(name) {
            self.close(name);
        } else {
            self.open(name, args);
        }
    }

    /// Typed [`UiManager::toggle`].
    pub fn toggle_as<T: WindowController>(&self, args: Args) {
        if let Some(name) = self.name_for::<T>("toggle_as") {
            self.toggle(&name, args);
        }
    }

    /// Close every open window.
    pub fn close_all(&self) {
        let open: Vec<String> = self
            .window_names()
            .into_iter()
            .filter(|name| self.is_open(name))
            .collect();
        for name in open.iter().rev() {
            self.close(name);
        }
    }

    /// Tear `name` down: drop the window, release its resources, forget it.
    pub fn destroy(&self, name: &str) {
        let taken = {
            let mut reg = self.registry();
            let Some(state) = reg.get(name) else {
                Error::AlreadyDestroyed(name.to_string()).log("destroy");
                return;
            };
            let mut st = state.lock();
            if st.is_loading() {
                Error::StillLoading(name.to_string()).log("destroy");
                return;
            }
            reg.remove(name);
            st.status = LoadStatus::Destroyed;
            (
                st.window.take(),
                st.resource.take(),
                mem::take(&mut st.dependencies),
            )
        };
        let (window, resource, dependencies) = taken;
        if let Some(window) = &window {
            window.mark_destroyed();
        }
        for handle in resource.iter().chain(dependencies.iter()) {
            self.inner.loader.release(handle.path());
        }
        debug!(window = name, "window destroyed");
    }

    /// Destroy every loaded window, in no particular order. Loads in flight
    /// are left alone; this is meant for full teardown between scenes.
    pub fn destroy_all(&self) {
        let loaded: Vec<String> = {
            let reg = self.registry();
            reg.names()
                .into_iter()
                .filter(|name| {
                    reg.get(name)
                        .is_some_and(|s| s.status() == LoadStatus::Loaded)
                })
                .collect()
        };
        info!(count = loaded.len(), "destroying all windows");
        for name in loaded {
            self.destroy(&name);
        }
    }

    // ----- deferred calls -----

    /// Run `callback` with the window once it is loaded, loading it hidden if
    /// it is not registered. Callbacks queued during a load run in
    /// submission order.
    pub fn call_ui<F>(&self, name: &str, callback: F, args: Args) -> WindowState
    where
        F: FnOnce(&WindowHandle, &Args) + Send + 'static,
    {
        let state = self.ensure_registered(name);
        self.submit(
            &state,
            Pending::Call {
                callback: Box::new(callback),
                args,
            },
        );
        state
    }

    /// Typed [`UiManager::call_ui`]: the callback gets the concrete controller.
    pub fn call_ui_as<T, F>(&self, callback: F, args: Args) -> Option<WindowState>
    where
        T: WindowController,
        F: FnOnce(&mut T, &Args) + Send + 'static,
    {
        let name = self.name_for::<T>("call_ui_as")?;
        let state = self.call_ui(
            &name,
            move |window, args| {
                if window
                    .with_controller_as::<T, _>(|c| callback(c, args))
                    .is_none()
                {
                    error!(
                        window = window.instance_name(),
                        expected = short_type_name::<T>(),
                        "controller unavailable as the requested type"
                    );
                }
            },
            args,
        );
        Some(state)
    }

    /// Like [`UiManager::call_ui`] but never loads: dynamic instances must be
    /// opened with [`UiManager::open_dynamic`] first.
    pub fn call_dynamic_ui<F>(&self, name: &str, callback: F, args: Args) -> Option<WindowState>
    where
        F: FnOnce(&WindowHandle, &Args) + Send + 'static,
    {
        let Some(state) = self.state(name) else {
            Error::UnknownWindow(name.to_string()).log("call_dynamic_ui");
            return None;
        };
        self.submit(
            &state,
            Pending::Call {
                callback: Box::new(callback),
                args,
            },
        );
        Some(state)
    }

    // ----- crate internals -----

    /// Lock the registry.
    pub(crate) fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry.lock()
    }

    /// Asset source.
    pub(crate) fn loader(&self) -> &dyn AssetLoader {
        self.inner.loader.as_ref()
    }

    /// Selected bridge.
    pub(crate) fn bridge(&self) -> &dyn UiBridge {
        self.inner.bridge.as_ref()
    }

    /// Return the state for `name`, inserting `make()` when absent. The flag
    /// tells whether the state was created by this call.
    pub(crate) fn lookup_or_insert(
        &self,
        name: &str,
        make: impl FnOnce() -> WindowState,
    ) -> (WindowState, bool) {
        let mut reg = self.registry();
        if let Some(state) = reg.get(name) {
            return (state, false);
        }
        let state = make();
        if let Err(err) = reg.put(name, state.clone()) {
            err.log("lookup_or_insert");
        }
        (state, true)
    }

    /// Registered state for `name`, starting a hidden load when absent.
    pub(crate) fn ensure_registered(&self, name: &str) -> WindowState {
        let (state, created) =
            self.lookup_or_insert(name, || WindowState::new_static(name, false, Args::new()));
        if created {
            debug!(window = name, "loading hidden for deferred work");
            self.spawn_load(&state);
        }
        state
    }

    /// Start the load task for `state`.
    fn spawn_load(&self, state: &WindowState) {
        self.inner.loading.fetch_add(1, Ordering::SeqCst);
        if !self.spawn(load_task::run(self.clone(), state.clone())) {
            self.load_finished();
            self.fail_state(state, "no async runtime");
        }
    }

    /// Spawn onto the ambient runtime; false when there is none.
    fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(fut);
                true
            }
            Err(err) => {
                error!(error = %err, "no tokio runtime; task not started");
                false
            }
        }
    }

    /// Window name registered for `T`, logging when there is none.
    fn name_for<T: WindowController>(&self, op: &'static str) -> Option<String> {
        let name = self.inner.types.name_of::<T>().map(str::to_string);
        if name.is_none() {
            Error::UnknownWindowType(short_type_name::<T>().to_string()).log(op);
        }
        name
    }

    /// Broadcast `event`.
    pub(crate) fn emit(&self, event: WindowEvent) {
        trace!(event = event.tag(), window = event.name(), "emit");
        // No listeners is fine.
        self.inner.events.send(event).ok();
    }

    /// A load task ended.
    pub(crate) fn load_finished(&self) {
        let prev = self
            .inner
            .loading
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if prev.is_err() {
            error!("loading count underflow");
        }
    }

    /// Queue `pending` on a loading state, or run it now on a loaded one.
    pub(crate) fn submit(&self, state: &WindowState, pending: Pending) {
        let window = {
            let mut st = state.lock();
            match st.status {
                LoadStatus::Loading(_) => {
                    st.pending.push_back(pending);
                    return;
                }
                LoadStatus::Loaded => st.window.clone(),
                LoadStatus::Failed | LoadStatus::Destroyed => None,
            }
        };
        match window {
            Some(window) => self.run_pending(&window, pending),
            None => {
                let name = state.instance_name();
                self.abandon(&name, VecDeque::from([pending]), "window is gone");
            }
        }
    }

    /// Run one queued item against a ready window.
    fn run_pending(&self, window: &WindowHandle, pending: Pending) {
        match pending {
            Pending::Call { callback, args } => callback(window, &args),
            Pending::CloneTo { instance } => dynamic::clone_instance(self, window, &instance),
        }
    }

    /// Drop queued work for a window that will never be ready. Dynamic
    /// placeholders waiting on it fail as well.
    fn abandon(&self, name: &str, pending: VecDeque<Pending>, reason: &str) {
        for item in pending {
            match item {
                Pending::Call { .. } => warn!(window = name, reason, "dropping deferred call"),
                Pending::CloneTo { instance } => {
                    if let Some(state) = self.state(&instance)
                        && state.is_loading()
                    {
                        self.fail_state(&state, reason);
                    }
                }
            }
        }
    }

    /// Remove a state whose load cannot complete and tell listeners.
    pub(crate) fn fail_state(&self, state: &WindowState, reason: &str) {
        let name = state.instance_name();
        let pending = {
            let mut reg = self.registry();
            reg.remove_if_same(&name, state);
            let mut st = state.lock();
            st.status = LoadStatus::Failed;
            st.pending_open = PendingOpen::default();
            mem::take(&mut st.pending)
        };
        self.emit(WindowEvent::LoadFailed {
            name: name.clone(),
            reason: reason.to_string(),
        });
        self.abandon(&name, pending, reason);
    }

    /// Post-instantiation sequence shared by template loads and clones:
    /// `on_init`, then the deferred open (or discard/deactivate), then the
    /// queued work in FIFO order.
    ///
    /// The state stays `Loading(Initializing)` until the queue is empty, so
    /// calls made meanwhile (from hooks or other threads) queue behind the
    /// work already waiting. The switch to `Loaded` happens under the same
    /// lock as the final empty check.
    pub(crate) fn init_window(&self, state: &WindowState, window: &WindowHandle) {
        window.with_controller(|c| c.on_init(window.info()));
        info!(
            window = window.instance_name(),
            template = window.template_name(),
            "window initialized"
        );
        self.emit(WindowEvent::Initialized(window.clone()));

        let (request, is_static) = {
            let mut st = state.lock();
            (mem::take(&mut st.pending_open), st.is_static)
        };
        if !self.apply_request(state, window, request, is_static) {
            return;
        }

        loop {
            let (next, request) = {
                let mut st = state.lock();
                let next = st.pending.pop_front();
                let request = (next.is_none() && st.pending_open.changed)
                    .then(|| mem::take(&mut st.pending_open));
                if next.is_none() && request.is_none() {
                    st.status = LoadStatus::Loaded;
                }
                (next, request)
            };
            match (next, request) {
                (Some(pending), _) => self.run_pending(window, pending),
                (None, Some(request)) => {
                    if !self.apply_request(state, window, request, is_static) {
                        return;
                    }
                }
                (None, None) => break,
            }
        }
        trace!(window = window.instance_name(), "window ready");
    }

    /// Apply an open request to an initializing window. Returns false when
    /// the window was discarded.
    fn apply_request(
        &self,
        state: &WindowState,
        window: &WindowHandle,
        request: PendingOpen,
        is_static: bool,
    ) -> bool {
        if request.open_when_finish {
            self.open_window(window, request.args);
            return true;
        }
        if is_static {
            if window.is_active() {
                self.close_window(window, true);
            } else {
                window.invalidate_open();
                window.set_active(false);
            }
            return true;
        }
        let abandoned = {
            let mut st = state.lock();
            st.status = LoadStatus::Loaded;
            mem::take(&mut st.pending)
        };
        if window.is_active() {
            self.close_window(window, false);
        } else {
            debug!(
                window = window.instance_name(),
                "dynamic window loaded without an open request; discarding"
            );
            self.destroy(window.instance_name());
        }
        self.abandon(window.instance_name(), abandoned, "window discarded");
        false
    }

    /// Open an existing state, deferring while it loads.
    pub(crate) fn open_state(&self, state: &WindowState, args: Args) {
        let window = {
            let mut st = state.lock();
            match st.status {
                LoadStatus::Loading(_) => {
                    debug!(window = %st.instance, "open while loading; opens on completion");
                    st.pending_open = PendingOpen {
                        open_when_finish: true,
                        args,
                        changed: true,
                    };
                    return;
                }
                LoadStatus::Loaded => st.window.clone(),
                LoadStatus::Failed | LoadStatus::Destroyed => None,
            }
        };
        match window {
            Some(window) => self.open_window(&window, args),
            None => Error::AlreadyDestroyed(state.instance_name()).log("open"),
        }
    }

    /// Two-phase open: `before_open` decides when the window activates.
    fn open_window(&self, window: &WindowHandle, args: Args) {
        if window.in_hook() {
            Error::Reentrant(window.instance_name().to_string()).log("open");
            return;
        }
        let epoch = window.begin_open();
        let (gate, mut confirmed) = OpenGate::channel();
        let was_active = window.is_active();
        window.with_controller(|c| {
            if was_active {
                c.on_close();
            }
            c.before_open(&args, gate);
        });
        match confirmed.try_recv() {
            Ok(()) => self.activate(window, epoch, &args),
            Err(TryRecvError::Empty) => {
                trace!(window = window.instance_name(), "waiting for open gate");
                let manager = self.clone();
                let window = window.clone();
                self.spawn(async move {
                    match confirmed.await {
                        Ok(()) => manager.activate(&window, epoch, &args),
                        Err(_) => debug!(window = window.instance_name(), "open gate dropped"),
                    }
                });
            }
            Err(TryRecvError::Closed) => {
                debug!(window = window.instance_name(), "open gate dropped");
            }
        }
    }

    /// Finish an open whose gate was confirmed, unless it went stale.
    fn activate(&self, window: &WindowHandle, epoch: u64, args: &Args) {
        if window.is_destroyed() || !window.open_is_current(epoch) {
            debug!(window = window.instance_name(), "stale open ignored");
            return;
        }
        window.set_active(true);
        window.with_controller(|c| c.on_open(args));
        info!(window = window.instance_name(), "window opened");
        self.emit(WindowEvent::Opened(window.clone()));
    }

    /// Close a loaded window; non-static windows are destroyed.
    fn close_window(&self, window: &WindowHandle, is_static: bool) {
        if window.in_hook() {
            Error::Reentrant(window.instance_name().to_string()).log("close");
            return;
        }
        window.invalidate_open();
        if window.is_active() {
            window.set_active(false);
            window.with_controller(|c| c.on_close());
            info!(window = window.instance_name(), "window closed");
            self.emit(WindowEvent::Closed(window.clone()));
        } else {
            debug!(window = window.instance_name(), "close on an inactive window");
        }
        if !is_static {
            self.destroy(window.instance_name());
        }
    }
}
