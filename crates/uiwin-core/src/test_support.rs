//! Scriptable collaborators for exercising the manager in tests.
//!
//! [`MockLoader`] serves in-memory bundles, can hold individual fetches open
//! and inject failures. [`RecordingController`] and [`RecordingBridge`] write
//! every hook they see into a shared [`Journal`].

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{sync::watch, task, time};
use uiwin_config::UiConfig;

use crate::{
    Args, Asset, AssetLoader, LoadError, OpenGate, UiBridge, Visual, WindowController, WindowInfo,
};

/// In-memory [`AssetLoader`].
///
/// Every fetch yields to the scheduler once before answering, so loads are
/// genuinely asynchronous even when nothing is held.
#[derive(Default)]
pub struct MockLoader {
    /// Path layout used by the helpers.
    config: UiConfig,
    /// Byte payloads by path.
    bytes: Mutex<HashMap<String, Vec<u8>>>,
    /// Assets by path.
    assets: Mutex<HashMap<String, Asset>>,
    /// Paths that fail.
    failing: Mutex<HashSet<String>>,
    /// Per-path gates; `true` lets fetches through.
    holds: Mutex<HashMap<String, watch::Sender<bool>>>,
    /// Fetch log.
    calls: Mutex<Vec<String>>,
    /// Release log.
    released: Mutex<Vec<String>>,
}

impl MockLoader {
    /// Loader using the default path layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader using the path layout of `config`.
    pub fn with_config(config: UiConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Serve window `name` with a manifest listing `deps`. Every dependency
    /// and the window resource get their own asset.
    pub fn add_window(&self, name: &str, deps: &[&str]) -> &Self {
        self.add_bytes(&self.config.manifest_path(name), deps.join("\n").into_bytes());
        for dep in deps {
            let path = self.config.dependency_path(dep);
            self.add_asset(&path, Asset::new(path.clone()));
        }
        let path = self.config.resource_path(name);
        self.add_asset(&path, Asset::new(path.clone()));
        self
    }

    /// Serve raw bytes at `path`.
    pub fn add_bytes(&self, path: &str, bytes: Vec<u8>) -> &Self {
        self.bytes.lock().insert(path.to_string(), bytes);
        self
    }

    /// Serve `asset` at `path`.
    pub fn add_asset(&self, path: &str, asset: Asset) -> &Self {
        self.assets.lock().insert(path.to_string(), asset);
        self
    }

    /// Fetches of `path` block until [`MockLoader::release_hold`].
    pub fn hold(&self, path: &str) {
        self.holds
            .lock()
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(false).0);
    }

    /// Let held fetches of `path` (and all later ones) complete.
    pub fn release_hold(&self, path: &str) {
        if let Some(tx) = self.holds.lock().get(path) {
            tx.send_replace(true);
        }
    }

    /// Fetches of `path` fail with an I/O error.
    pub fn fail(&self, path: &str) {
        self.failing.lock().insert(path.to_string());
    }

    /// How many times `path` was fetched.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| *p == path).count()
    }

    /// Every fetched path, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Every released path, in call order.
    pub fn released(&self) -> Vec<String> {
        self.released.lock().clone()
    }

    /// Manifest path of window `name` under this loader's layout.
    pub fn manifest_path(&self, name: &str) -> String {
        self.config.manifest_path(name)
    }

    /// Resource path of window `name` under this loader's layout.
    pub fn resource_path(&self, name: &str) -> String {
        self.config.resource_path(name)
    }

    /// Common fetch prologue: log, yield, wait on a hold, inject failure.
    async fn enter(&self, path: &str) -> Result<(), LoadError> {
        self.calls.lock().push(path.to_string());
        task::yield_now().await;
        let hold = self.holds.lock().get(path).map(watch::Sender::subscribe);
        if let Some(mut rx) = hold {
            rx.wait_for(|open| *open)
                .await
                .map_err(|e| LoadError::Other(e.to_string()))?;
        }
        if self.failing.lock().contains(path) {
            return Err(LoadError::Io(format!("injected failure for {path}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AssetLoader for MockLoader {
    async fn load_bytes(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.enter(path).await?;
        self.bytes
            .lock()
            .get(path)
            .cloned()
            .ok_or(LoadError::NotFound)
    }

    async fn load_asset(&self, path: &str) -> Result<Asset, LoadError> {
        self.enter(path).await?;
        self.assets
            .lock()
            .get(path)
            .cloned()
            .ok_or(LoadError::NotFound)
    }

    fn release(&self, path: &str) {
        self.released.lock().push(path.to_string());
    }
}

/// Shared, ordered log of hook invocations.
#[derive(Clone, Default)]
pub struct Journal(
    /// Entries in order.
    Arc<Mutex<Vec<String>>>,
);

impl Journal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries that start with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Open gates parked by a deferred [`RecordingController`].
#[derive(Clone, Default)]
pub struct Gates(
    /// Parked gates, oldest first.
    Arc<Mutex<Vec<OpenGate>>>,
);

impl Gates {
    /// No parked gates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gates waiting.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Confirm every parked gate, oldest first.
    pub fn confirm_all(&self) {
        let gates: Vec<OpenGate> = self.0.lock().drain(..).collect();
        for gate in gates {
            gate.confirm();
        }
    }

    /// Drop every parked gate without confirming.
    pub fn drop_all(&self) {
        self.0.lock().clear();
    }
}

/// Controller that journals `"{instance}:{hook}"` for every hook.
///
/// `on_open` entries carry the arguments as JSON, e.g. `Login:open[1,"a"]`.
pub struct RecordingController {
    /// Instance name, known after `on_init`.
    name: String,
    /// Where hooks are written.
    journal: Journal,
    /// Where gates are parked; `None` confirms at once.
    gates: Option<Gates>,
    /// Free-form value for typed-access tests.
    pub value: i64,
}

impl RecordingController {
    /// Controller that confirms every open immediately.
    pub fn new(journal: Journal) -> Self {
        Self {
            name: String::new(),
            journal,
            gates: None,
            value: 0,
        }
    }

    /// Controller that parks its open gates in `gates`.
    pub fn deferred(journal: Journal, gates: Gates) -> Self {
        Self {
            gates: Some(gates),
            ..Self::new(journal)
        }
    }

    /// Journal one hook.
    fn note(&self, hook: &str) {
        self.journal.push(format!("{}:{hook}", self.name));
    }
}

impl WindowController for RecordingController {
    fn on_init(&mut self, info: &WindowInfo) {
        self.name = info.instance.clone();
        self.note("init");
    }

    fn before_open(&mut self, _args: &Args, gate: OpenGate) {
        self.note("before_open");
        match &self.gates {
            Some(gates) => gates.0.lock().push(gate),
            None => gate.confirm(),
        }
    }

    fn on_open(&mut self, args: &Args) {
        self.note(&format!("open{}", Value::Array(args.clone())));
    }

    fn on_close(&mut self) {
        self.note("close");
    }
}

/// Bridge that journals `"filter:{visual}"` and tags each visual with its name.
#[derive(Clone)]
pub struct RecordingBridge {
    /// Value bound under `bridge`.
    tag: String,
    /// Where filter calls are written.
    journal: Journal,
    /// `init_bridge` count, shared by clones.
    inits: Arc<AtomicUsize>,
}

impl RecordingBridge {
    /// Bridge whose visuals get `bridge = tag`.
    pub fn new(tag: impl Into<String>, journal: Journal) -> Self {
        Self {
            tag: tag.into(),
            journal,
            inits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `init_bridge` ran.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl UiBridge for RecordingBridge {
    fn init_bridge(&self) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn filter_object(&self, _source: &dyn WindowController, visual: &mut Visual) {
        self.journal.push(format!("filter:{}", visual.name()));
        visual.bind("bridge", Value::from(self.tag.clone()));
    }
}

/// Yield to the scheduler enough times for unblocked loads to finish.
pub async fn settle() {
    for _ in 0..64 {
        task::yield_now().await;
    }
}

/// Poll `pred` every millisecond until it holds or `timeout_ms` elapses.
pub async fn wait_for(mut pred: impl FnMut() -> bool, timeout_ms: u64) -> bool {
    let deadline = time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if pred() {
            return true;
        }
        if time::Instant::now() >= deadline {
            return false;
        }
        time::sleep(Duration::from_millis(1)).await;
    }
}
