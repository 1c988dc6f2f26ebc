use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use uiwin_core::{
    Args, LoadPhase, UiManager, WindowController, WindowEvent, WindowHandle, WindowInfo,
    WindowState,
    test_support::{Journal, MockLoader, RecordingController, settle, wait_for},
};

fn setup() -> (UiManager, Arc<MockLoader>, Journal) {
    let loader = Arc::new(MockLoader::new());
    loader.add_window("Login", &["common/atlas", "common/font"]);
    loader.add_window("Bag", &[]);
    loader.add_window("Shop", &["common/atlas"]);
    let journal = Journal::new();
    let mut builder = UiManager::builder(loader.clone());
    for name in ["Login", "Bag", "Shop"] {
        let j = journal.clone();
        builder = builder.window(name, move || RecordingController::new(j.clone()));
    }
    (builder.build(), loader, journal)
}

fn tags(rx: &mut broadcast::Receiver<WindowEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(format!("{}:{}", ev.name(), ev.tag()));
    }
    out
}

#[tokio::test]
async fn unknown_names_are_neither_open_nor_loaded() {
    let (ui, _, _) = setup();
    assert!(!ui.is_open("Nope"));
    assert!(!ui.is_loaded("Nope"));
    assert!(!ui.is_registered("Nope"));
    assert!(ui.window("Nope").is_none());
    assert_eq!(ui.load_phase("Nope"), None);
    // Harmless no-ops.
    ui.close("Nope");
    ui.destroy("Nope");
    assert_eq!(ui.window_count(), 0);
}

#[tokio::test]
async fn open_runs_init_then_open_with_args() {
    let (ui, loader, journal) = setup();
    let mut events = ui.subscribe();

    let state = ui.open("Login", vec![json!(1), json!("a")]).unwrap();
    assert!(state.is_loading());
    assert!(state.window().is_none());
    assert!(!ui.is_open("Login"));

    settle().await;
    assert!(ui.is_open("Login"));
    assert!(state.window().is_some());
    assert_eq!(
        journal.entries(),
        ["Login:init", "Login:before_open", r#"Login:open[1,"a"]"#]
    );
    assert_eq!(tags(&mut events), ["Login:init", "Login:open"]);
    assert_eq!(
        loader.calls(),
        [
            "BundleResources/NGUI/Login.prefab.manifest.bytes",
            "common/atlas.bytes",
            "common/font.bytes",
            "BundleResources/NGUI/Login.prefab.bytes",
        ]
    );
    // Manifest bytes are released as soon as they are parsed.
    assert_eq!(loader.released(), [loader.manifest_path("Login")]);
}

#[tokio::test]
async fn concurrent_opens_load_once() {
    let (ui, loader, journal) = setup();
    let first = ui.open("Login", vec![json!(1)]).unwrap();
    let second = ui.open("Login", vec![json!(2)]).unwrap();
    let third = ui.open("Login", vec![json!(3)]).unwrap();
    assert!(WindowState::same(&first, &second));
    assert!(WindowState::same(&first, &third));
    assert_eq!(ui.loading_count(), 1);

    settle().await;
    assert_eq!(loader.fetch_count(&loader.manifest_path("Login")), 1);
    assert_eq!(journal.matching("Login:init").len(), 1);
    // The last open request wins.
    assert_eq!(journal.matching("Login:open"), ["Login:open[3]"]);
    assert_eq!(ui.loading_count(), 0);
}

#[tokio::test]
async fn close_during_load_keeps_static_window_hidden() {
    let (ui, loader, journal) = setup();
    let mut events = ui.subscribe();
    loader.hold(&loader.resource_path("Login"));

    ui.open("Login", Args::new());
    settle().await;
    assert_eq!(ui.load_phase("Login"), Some(LoadPhase::Resource));
    ui.close("Login");
    assert!(!ui.state("Login").unwrap().open_when_finish());

    loader.release_hold(&loader.resource_path("Login"));
    settle().await;
    assert!(ui.is_loaded("Login"));
    assert!(!ui.is_open("Login"));
    assert_eq!(journal.entries(), ["Login:init"]);
    assert_eq!(tags(&mut events), ["Login:init"]);
}

#[tokio::test]
async fn toggle_twice_restores_state() {
    let (ui, _, journal) = setup();
    ui.open("Bag", Args::new());
    settle().await;
    assert!(ui.is_open("Bag"));

    ui.toggle("Bag", Args::new());
    assert!(!ui.is_open("Bag"));
    ui.toggle("Bag", vec![json!("again")]);
    assert!(ui.is_open("Bag"));
    assert_eq!(
        journal.entries(),
        [
            "Bag:init",
            "Bag:before_open",
            "Bag:open[]",
            "Bag:close",
            "Bag:before_open",
            r#"Bag:open["again"]"#,
        ]
    );
}

#[tokio::test]
async fn toggle_on_unregistered_window_opens_it() {
    let (ui, _, _) = setup();
    ui.toggle("Bag", Args::new());
    settle().await;
    assert!(ui.is_open("Bag"));
}

#[tokio::test]
async fn open_on_open_window_cycles_it() {
    let (ui, _, journal) = setup();
    let mut events = ui.subscribe();
    ui.open("Bag", Args::new());
    settle().await;
    journal.clear();
    tags(&mut events);

    ui.open("Bag", vec![json!(5)]);
    assert!(ui.is_open("Bag"));
    assert_eq!(
        journal.entries(),
        ["Bag:close", "Bag:before_open", "Bag:open[5]"]
    );
    // The implicit close is not a lifecycle transition.
    assert_eq!(tags(&mut events), ["Bag:open"]);
}

#[tokio::test]
async fn call_ui_queues_fifo_during_load() {
    let (ui, loader, _) = setup();
    loader.hold(&loader.manifest_path("Shop"));
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        ui.call_ui(
            "Shop",
            move |window: &WindowHandle, args: &Args| {
                order.lock().push((i, window.instance_name().to_string(), args.clone()));
            },
            vec![json!(i)],
        );
    }
    assert_eq!(ui.state("Shop").unwrap().pending_len(), 3);
    settle().await;
    assert!(order.lock().is_empty());

    loader.release_hold(&loader.manifest_path("Shop"));
    settle().await;
    let seen = order.lock().clone();
    assert_eq!(seen.len(), 3);
    for (i, (n, name, args)) in seen.iter().enumerate() {
        assert_eq!(*n, i);
        assert_eq!(name, "Shop");
        assert_eq!(args, &vec![json!(i)]);
    }
    // Deferred calls load the window hidden.
    assert!(ui.is_loaded("Shop"));
    assert!(!ui.is_open("Shop"));
    assert_eq!(ui.state("Shop").unwrap().pending_len(), 0);

    // Once loaded, calls run synchronously.
    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();
    ui.call_ui("Shop", move |_, _| *flag.lock() = true, Args::new());
    assert!(*ran.lock());
}

#[tokio::test]
async fn destroy_then_open_loads_fresh() {
    let (ui, loader, journal) = setup();
    ui.open("Login", Args::new());
    settle().await;
    let old = ui.window("Login").unwrap();

    ui.destroy("Login");
    assert!(!ui.is_registered("Login"));
    assert!(old.is_destroyed());
    assert!(!old.is_active());
    let released = loader.released();
    for path in [
        loader.resource_path("Login"),
        "common/atlas.bytes".to_string(),
        "common/font.bytes".to_string(),
    ] {
        assert!(released.contains(&path), "{path} not released");
    }

    ui.open("Login", Args::new());
    settle().await;
    assert!(ui.is_open("Login"));
    assert_eq!(loader.fetch_count(&loader.manifest_path("Login")), 2);
    assert_eq!(journal.matching("Login:init").len(), 2);
    assert!(!WindowHandle::same(&old, &ui.window("Login").unwrap()));
}

#[tokio::test]
async fn destroy_while_loading_is_ignored() {
    let (ui, loader, _) = setup();
    loader.hold(&loader.manifest_path("Bag"));
    ui.open("Bag", Args::new());
    ui.destroy("Bag");
    assert!(ui.is_registered("Bag"));
    loader.release_hold(&loader.manifest_path("Bag"));
    settle().await;
    assert!(ui.is_open("Bag"));
}

#[tokio::test]
async fn close_all_hides_everything_but_keeps_it_loaded() {
    let (ui, _, _) = setup();
    let mut events = ui.subscribe();
    ui.open("Login", Args::new());
    ui.open("Bag", Args::new());
    settle().await;
    tags(&mut events);

    ui.close_all();
    assert!(!ui.is_open("Login"));
    assert!(!ui.is_open("Bag"));
    assert!(ui.is_loaded("Login"));
    assert!(ui.is_loaded("Bag"));
    let mut closed = tags(&mut events);
    closed.sort();
    assert_eq!(closed, ["Bag:close", "Login:close"]);
}

#[tokio::test]
async fn destroy_all_leaves_loads_in_flight() {
    let (ui, loader, _) = setup();
    ui.open("Login", Args::new());
    ui.load_window("Bag", false, Args::new());
    settle().await;
    loader.hold(&loader.manifest_path("Shop"));
    ui.open("Shop", Args::new());

    ui.destroy_all();
    assert_eq!(ui.window_names(), ["Shop"]);

    loader.release_hold(&loader.manifest_path("Shop"));
    settle().await;
    assert!(ui.is_open("Shop"));
}

/// Controller whose `on_init` blocks for a while.
struct SlowInit {
    started: Arc<AtomicBool>,
}

impl WindowController for SlowInit {
    fn on_init(&mut self, _info: &WindowInfo) {
        self.started.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(200));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn callbacks_stay_fifo_while_init_runs_on_another_thread() {
    let loader = Arc::new(MockLoader::new());
    loader.add_window("Login", &[]);
    let started = Arc::new(AtomicBool::new(false));
    let flag = started.clone();
    let ui = UiManager::builder(loader)
        .window("Login", move || SlowInit {
            started: flag.clone(),
        })
        .build();

    let order = Arc::new(Mutex::new(Vec::new()));
    let o = order.clone();
    ui.call_ui("Login", move |_, _| o.lock().push("first"), Args::new());
    assert!(wait_for(|| started.load(Ordering::SeqCst), 2000).await);

    // on_init is still sleeping on a worker thread.
    assert!(!ui.is_loaded("Login"));
    assert_eq!(ui.load_phase("Login"), Some(LoadPhase::Initializing));
    let o = order.clone();
    ui.call_ui("Login", move |_, _| o.lock().push("second"), Args::new());

    assert!(wait_for(|| ui.is_loaded("Login"), 2000).await);
    assert_eq!(*order.lock(), ["first", "second"]);
}

/// Controller that tries to close itself from `on_open` on every open after
/// the first.
struct SelfClosing {
    ui: Arc<Mutex<Option<UiManager>>>,
    journal: Journal,
    name: String,
    opens: usize,
}

impl WindowController for SelfClosing {
    fn on_init(&mut self, info: &WindowInfo) {
        self.name = info.instance.clone();
    }

    fn on_open(&mut self, _args: &Args) {
        self.opens += 1;
        self.journal.push("open");
        let ui = self.ui.lock().clone();
        if let Some(ui) = ui
            && self.opens > 1
        {
            ui.close(&self.name);
        }
    }

    fn on_close(&mut self) {
        self.journal.push("close");
    }
}

#[tokio::test]
async fn hook_closing_its_own_window_is_refused() {
    let loader = Arc::new(MockLoader::new());
    loader.add_window("Login", &[]);
    let slot = Arc::new(Mutex::new(None));
    let journal = Journal::new();
    let (s, j) = (slot.clone(), journal.clone());
    let ui = UiManager::builder(loader)
        .window("Login", move || SelfClosing {
            ui: s.clone(),
            journal: j.clone(),
            name: String::new(),
            opens: 0,
        })
        .build();
    *slot.lock() = Some(ui.clone());

    ui.open("Login", Args::new());
    settle().await;
    ui.close("Login");
    ui.open("Login", Args::new());
    // The nested close was refused instead of deadlocking.
    assert!(ui.is_open("Login"));
    assert_eq!(journal.entries(), ["open", "close", "open"]);

    ui.close("Login");
    assert!(!ui.is_open("Login"));
    assert_eq!(journal.entries(), ["open", "close", "open", "close"]);
    slot.lock().take();
}
