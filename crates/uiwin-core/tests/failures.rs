use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use uiwin_core::{
    Args, UiConfig, UiManager, WindowEvent,
    test_support::{Gates, Journal, MockLoader, RecordingController, settle, wait_for},
};

struct Fixture {
    ui: UiManager,
    loader: Arc<MockLoader>,
    journal: Journal,
    gates: Gates,
}

fn fixture(config: UiConfig) -> Fixture {
    let loader = Arc::new(MockLoader::with_config(config.clone()));
    loader.add_window("Login", &["common/atlas", "common/font"]);
    loader.add_window("Shop", &[]);
    loader.add_window("Ghost", &[]);
    let journal = Journal::new();
    let gates = Gates::new();
    let j = journal.clone();
    let dj = journal.clone();
    let g = gates.clone();
    let ui = UiManager::builder(loader.clone())
        .config(config)
        .window("Login", move || RecordingController::new(j.clone()))
        .window("Shop", move || RecordingController::deferred(dj.clone(), g.clone()))
        .build();
    Fixture {
        ui,
        loader,
        journal,
        gates,
    }
}

fn failure(ev: &WindowEvent) -> Option<(String, String)> {
    match ev {
        WindowEvent::LoadFailed { name, reason } => Some((name.clone(), reason.clone())),
        _ => None,
    }
}

#[tokio::test]
async fn failed_load_is_reported_and_forgotten() {
    let f = fixture(UiConfig::default());
    let mut events = f.ui.subscribe();
    f.loader.fail(&f.loader.manifest_path("Login"));
    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();

    f.ui.open("Login", Args::new());
    f.ui.call_ui("Login", move |_, _| *flag.lock() = true, Args::new());
    settle().await;

    assert!(!f.ui.is_registered("Login"));
    assert!(!*ran.lock());
    let (name, reason) = failure(&events.try_recv().unwrap()).unwrap();
    assert_eq!(name, "Login");
    assert!(reason.contains("Login.prefab.manifest"), "{reason}");
    assert!(f.journal.entries().is_empty());
    assert_eq!(f.ui.loading_count(), 0);

    // No retry until asked; a later open starts a fresh load.
    assert_eq!(f.loader.fetch_count(&f.loader.manifest_path("Login")), 1);
    f.ui.open("Login", Args::new());
    settle().await;
    assert_eq!(f.loader.fetch_count(&f.loader.manifest_path("Login")), 2);
}

#[tokio::test]
async fn dependency_failure_releases_loaded_dependencies() {
    let f = fixture(UiConfig::default());
    f.loader.fail("common/font.bytes");
    f.ui.open("Login", Args::new());
    settle().await;

    assert!(!f.ui.is_registered("Login"));
    let released = f.loader.released();
    assert!(released.contains(&"common/atlas.bytes".to_string()));
    assert!(!released.contains(&"common/font.bytes".to_string()));
    assert_eq!(f.loader.fetch_count(&f.loader.resource_path("Login")), 0);
}

#[tokio::test]
async fn missing_controller_type_fails_before_fetching() {
    let f = fixture(UiConfig::default());
    let mut events = f.ui.subscribe();
    f.ui.open("Ghost", Args::new());
    settle().await;
    assert!(!f.ui.is_registered("Ghost"));
    assert_eq!(f.loader.fetch_count(&f.loader.manifest_path("Ghost")), 0);
    let (name, _) = failure(&events.try_recv().unwrap()).unwrap();
    assert_eq!(name, "Ghost");
}

#[tokio::test]
async fn invalid_manifest_fails_the_load() {
    let f = fixture(UiConfig::default());
    f.loader
        .add_bytes(&f.loader.manifest_path("Login"), vec![0xff, 0xfe, 0x00]);
    f.ui.open("Login", Args::new());
    settle().await;
    assert!(!f.ui.is_registered("Login"));
    assert_eq!(f.loader.fetch_count("common/atlas.bytes"), 0);
}

#[tokio::test]
async fn stalled_load_times_out() {
    let config = UiConfig {
        load_timeout_ms: Some(20),
        ..UiConfig::default()
    };
    let f = fixture(config);
    let mut events = f.ui.subscribe();
    f.loader.hold(&f.loader.resource_path("Login"));

    f.ui.open("Login", Args::new());
    assert!(wait_for(|| !f.ui.is_registered("Login"), 2_000).await);
    let (name, reason) = failure(&events.try_recv().unwrap()).unwrap();
    assert_eq!(name, "Login");
    assert!(reason.contains("timed out"), "{reason}");
    assert_eq!(f.ui.loading_count(), 0);
    // Dependencies fetched before the stall are handed back.
    let released = f.loader.released();
    assert!(released.contains(&"common/atlas.bytes".to_string()));
    assert!(released.contains(&"common/font.bytes".to_string()));
}

#[tokio::test]
async fn loading_count_tracks_loads_in_flight() {
    let f = fixture(UiConfig::default());
    f.loader.hold(&f.loader.manifest_path("Login"));
    f.loader.hold(&f.loader.manifest_path("Shop"));
    f.ui.open("Login", Args::new());
    f.ui.open("Shop", Args::new());
    settle().await;
    assert_eq!(f.ui.loading_count(), 2);

    f.loader.release_hold(&f.loader.manifest_path("Login"));
    settle().await;
    assert_eq!(f.ui.loading_count(), 1);
    f.loader.release_hold(&f.loader.manifest_path("Shop"));
    settle().await;
    assert_eq!(f.ui.loading_count(), 0);
}

#[tokio::test]
async fn deferred_gate_activates_on_confirm() {
    let f = fixture(UiConfig::default());
    let mut events = f.ui.subscribe();
    f.ui.open("Shop", vec![json!("x")]);
    settle().await;

    assert!(f.ui.is_loaded("Shop"));
    assert!(!f.ui.is_open("Shop"));
    assert_eq!(f.gates.len(), 1);
    assert_eq!(f.journal.entries(), ["Shop:init", "Shop:before_open"]);

    f.gates.confirm_all();
    settle().await;
    assert!(f.ui.is_open("Shop"));
    assert_eq!(f.journal.matching("Shop:open"), [r#"Shop:open["x"]"#]);
    let mut tags = Vec::new();
    while let Ok(ev) = events.try_recv() {
        tags.push(ev.tag());
    }
    assert_eq!(tags, ["init", "open"]);
}

#[tokio::test]
async fn close_invalidates_an_unconfirmed_gate() {
    let f = fixture(UiConfig::default());
    f.ui.open("Shop", Args::new());
    settle().await;
    assert_eq!(f.gates.len(), 1);

    f.ui.close("Shop");
    f.gates.confirm_all();
    settle().await;
    assert!(!f.ui.is_open("Shop"));
    assert!(f.journal.matching("Shop:open").is_empty());
    assert!(f.ui.is_loaded("Shop"));
}

#[tokio::test]
async fn only_the_latest_gate_opens() {
    let f = fixture(UiConfig::default());
    f.ui.open("Shop", vec![json!(1)]);
    settle().await;
    f.ui.open("Shop", vec![json!(2)]);
    assert_eq!(f.gates.len(), 2);

    f.gates.confirm_all();
    settle().await;
    assert!(f.ui.is_open("Shop"));
    assert_eq!(f.journal.matching("Shop:open"), ["Shop:open[2]"]);
}

#[tokio::test]
async fn dropped_gate_never_opens() {
    let f = fixture(UiConfig::default());
    f.ui.open("Shop", Args::new());
    settle().await;
    f.gates.drop_all();
    settle().await;
    assert!(!f.ui.is_open("Shop"));
    assert!(f.gates.is_empty());
}
